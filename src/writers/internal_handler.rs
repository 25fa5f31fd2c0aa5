use super::{
    blocking_writer::{write_full, FdWrite},
    FatalHandler, LogHandler,
};
use crate::{
    frame, FailureLogError, Failures, FatalStatus, LogFd, Record, RecursionGuard,
    DEFAULT_LINE_CAPA,
};
use std::{cell::Cell, os::fd::AsFd};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}
static GUARD: RecursionGuard = RecursionGuard::new(&DEPTH);

/// Writes reports as [`frame`]s to a supervising parent process.
///
/// The channel is the process's stderr unless the handler was created with
/// [`InternalHandler::with_channel`]. No prefix and no timestamp is added;
/// presentation is up to the reading side.
#[derive(Debug, Default)]
pub struct InternalHandler {
    channel: LogFd,
}

impl InternalHandler {
    /// A handler that writes to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that writes to the given descriptor, e.g. one end of a socket pair.
    #[must_use]
    pub fn with_channel(channel: LogFd) -> Self {
        Self { channel }
    }

    /// The recursion guard of this handler family, shared by all instances.
    #[must_use]
    pub fn recursion_guard(&self) -> &'static RecursionGuard {
        &GUARD
    }

    /// Sends an option frame (`key=value`) on the channel.
    ///
    /// # Errors
    ///
    /// If writing to the channel fails.
    pub fn send_option(
        &self,
        failures: &Failures,
        key: &str,
        value: &str,
    ) -> Result<(), FailureLogError> {
        let mut buffer = Vec::with_capacity(64);
        frame::encode_option(&mut buffer, key, value);
        self.write(failures, &buffer)
    }

    fn send(&self, failures: &Failures, record: &Record) -> Result<(), FailureLogError> {
        let Some(_ticket) = GUARD.enter() else {
            return Err(FailureLogError::RecursionLimit);
        };

        let mut buffer = Vec::with_capacity(DEFAULT_LINE_CAPA);
        frame::encode_record(&mut buffer, record);

        match self.write(failures, &buffer) {
            Err(_) if failures.destination().ignore_write_errors => Ok(()),
            result => result,
        }
    }

    fn write(&self, failures: &Failures, buffer: &[u8]) -> Result<(), FailureLogError> {
        write_full(
            &mut FdWrite::new(self.channel.as_fd(), failures.readiness()),
            buffer,
        )
        .map_err(FailureLogError::from)
    }
}

impl LogHandler for InternalHandler {
    fn try_log(&self, failures: &Failures, record: &Record) -> Result<(), FailureLogError> {
        self.send(failures, record)
    }

    fn as_internal(&self) -> Option<&InternalHandler> {
        Some(self)
    }
}

impl FatalHandler for InternalHandler {
    fn fatal(&self, failures: &Failures, record: &Record, status: FatalStatus) -> ! {
        let status = match self.send(failures, record) {
            Ok(()) => status,
            Err(_) => status.escalate(FatalStatus::LOG_ERROR),
        };
        failures.fatal_finish(record.level(), status)
    }
}
