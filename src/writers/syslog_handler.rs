use super::{FatalHandler, LogHandler};
use crate::{
    formats::format_syslog_body, FailureLogError, Failures, FatalStatus, Level, Record,
    RecursionGuard, DEFAULT_LINE_CAPA,
};
use nix::syslog::{syslog, Facility, LogFlags, Severity};
use std::{
    cell::Cell,
    ffi::{CStr, CString, OsStr},
    os::unix::ffi::OsStrExt,
    sync::Mutex,
};

// `openlog` keeps the pointer to the ident, so idents must live forever;
// each distinct ident is leaked once and then reused.
static IDENTS: Mutex<Vec<&'static CStr>> = Mutex::new(Vec::new());

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}
static GUARD: RecursionGuard = RecursionGuard::new(&DEPTH);

/// Maps the levels to syslog severities.
#[must_use]
pub fn severity(level: Level) -> Severity {
    match level {
        Level::Info => Severity::LOG_INFO,
        Level::Warning => Severity::LOG_WARNING,
        Level::Error => Severity::LOG_ERR,
        Level::Fatal | Level::Panic => Severity::LOG_CRIT,
    }
}

/// Hands reports to the local syslog service via `syslog(3)`.
///
/// The message text is `[prefix][Fatal: |Panic: ]<message>`; the severity is derived
/// from the level with [`severity`].
#[derive(Debug, Default)]
pub struct SyslogHandler {
    _private: (),
}

impl SyslogHandler {
    /// Calls `openlog(3)` with the given ident, options and facility,
    /// and returns the handler.
    ///
    /// # Errors
    ///
    /// [`FailureLogError::Syslog`] if the ident contains a NUL byte or `openlog` fails.
    pub fn open(
        ident: &str,
        options: LogFlags,
        facility: Facility,
    ) -> Result<Self, FailureLogError> {
        let ident = static_ident(ident)?;

        // nix openlog bindings have a Linux-specific signature
        #[cfg(target_os = "linux")]
        nix::syslog::openlog(Some(ident), options, facility)?;
        #[cfg(not(target_os = "linux"))]
        nix::syslog::openlog(Some(OsStr::from_bytes(ident.to_bytes())), options, facility)?;

        Ok(Self::default())
    }

    /// The recursion guard of this handler family, shared by all instances.
    #[must_use]
    pub fn recursion_guard(&self) -> &'static RecursionGuard {
        &GUARD
    }

    fn send(&self, failures: &Failures, record: &Record) -> Result<(), FailureLogError> {
        let Some(_ticket) = GUARD.enter() else {
            return Err(FailureLogError::RecursionLimit);
        };

        let destination = failures.destination();
        // the complete text is rendered before syslog is called, which may log again
        let mut buffer = Vec::with_capacity(DEFAULT_LINE_CAPA);
        format_syslog_body(&mut buffer, &destination, record);

        match syslog(severity(record.level()), OsStr::from_bytes(&buffer)) {
            Err(_) if destination.ignore_write_errors => Ok(()),
            result => result.map_err(FailureLogError::from),
        }
    }
}

fn static_ident(ident: &str) -> Result<&'static CStr, FailureLogError> {
    let mut idents = IDENTS
        .lock()
        .map_err(|_| FailureLogError::Poisoned)?;
    if let Some(known) = idents.iter().find(|s| s.to_bytes() == ident.as_bytes()) {
        return Ok(known);
    }
    let leaked: &'static CStr = Box::leak(
        CString::new(ident)
            .map_err(|_| FailureLogError::Syslog(nix::Error::EINVAL))?
            .into_boxed_c_str(),
    );
    idents.push(leaked);
    Ok(leaked)
}

impl LogHandler for SyslogHandler {
    fn try_log(&self, failures: &Failures, record: &Record) -> Result<(), FailureLogError> {
        self.send(failures, record)
    }
}

impl FatalHandler for SyslogHandler {
    fn fatal(&self, failures: &Failures, record: &Record, status: FatalStatus) -> ! {
        let status = match self.send(failures, record) {
            Ok(()) => status,
            Err(_) => status.escalate(FatalStatus::LOG_ERROR),
        };
        failures.fatal_finish(record.level(), status)
    }
}
