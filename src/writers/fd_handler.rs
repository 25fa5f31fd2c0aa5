use super::{
    blocking_writer::{write_full, FdWrite},
    FatalHandler, LogHandler,
};
use crate::{
    destination::Destination, formats::format_fd_line, DeferredNow, FailureLogError, Failures,
    FatalStatus, Level, LogFd, Record, RecursionGuard, DEFAULT_LINE_CAPA,
};
use std::{cell::Cell, os::fd::AsFd};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}
static GUARD: RecursionGuard = RecursionGuard::new(&DEPTH);

/// Writes plain text lines to the log file descriptor, or, for `Info`, to the info file
/// descriptor.
///
/// This is the default handler in all three roles. The descriptors, the line prefix,
/// the timestamp format and the error policy are taken from the
/// [`Failures`] object the report goes through.
///
/// Line layout: `[timestamp][prefix]<Level>: <message>\n`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FdHandler;

impl FdHandler {
    /// Constructor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The recursion guard of this handler family, shared by all instances.
    #[must_use]
    pub fn recursion_guard(&self) -> &'static RecursionGuard {
        &GUARD
    }

    fn write_line(
        &self,
        failures: &Failures,
        fd: &LogFd,
        destination: &Destination,
        record: &Record,
    ) -> Result<(), FailureLogError> {
        let Some(_ticket) = GUARD.enter() else {
            return Err(FailureLogError::RecursionLimit);
        };

        let mut buffer = Vec::with_capacity(DEFAULT_LINE_CAPA);
        format_fd_line(&mut buffer, &mut DeferredNow::new(), destination, record);

        match write_full(&mut FdWrite::new(fd.as_fd(), failures.readiness()), &buffer) {
            Err(_) if destination.ignore_write_errors => Ok(()),
            result => result.map_err(FailureLogError::from),
        }
    }
}

fn target_fd(destination: &Destination, level: Level) -> &LogFd {
    if level == Level::Info {
        &destination.info
    } else {
        &destination.log
    }
}

impl LogHandler for FdHandler {
    fn try_log(&self, failures: &Failures, record: &Record) -> Result<(), FailureLogError> {
        let destination = failures.destination();
        self.write_line(
            failures,
            target_fd(&destination, record.level()),
            &destination,
            record,
        )
    }

    fn log(&self, failures: &Failures, record: &Record) {
        let destination = failures.destination();
        let fd = target_fd(&destination, record.level());
        if let Err(e) = self.write_line(failures, fd, &destination, record) {
            if fd.same_as(&destination.log) {
                failures.exit(FatalStatus::LOG_WRITE);
            }
            // the separate info log failed; the error log may still work
            failures.fatal(
                FatalStatus::LOG_WRITE,
                &Record::new(Level::Fatal, format_args!("write() failed to info log: %m"))
                    .with_os_error(e.raw_os_error()),
            );
        }
    }
}

impl FatalHandler for FdHandler {
    fn fatal(&self, failures: &Failures, record: &Record, status: FatalStatus) -> ! {
        let destination = failures.destination();
        let status = match self.write_line(failures, &destination.log, &destination, record) {
            Ok(()) => status,
            Err(_) => status.escalate(FatalStatus::LOG_WRITE),
        };
        failures.fatal_finish(record.level(), status)
    }
}

#[cfg(test)]
mod test {
    use super::FdHandler;
    use crate::{writers::LogHandler, FailureLogError, Failures, Level, Record};
    use std::sync::Arc;

    fn read(path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn test_info_and_error_go_to_their_files() {
        let dir = temp_dir::TempDir::new().unwrap();
        let log = dir.path().join("error.log");
        let info = dir.path().join("info.log");
        let failures = Failures::new();
        failures.open_log_file(&log, Some("test: ")).unwrap();
        failures.open_info_file(&info).unwrap();

        let handler = FdHandler::new();
        handler
            .try_log(&failures, &Record::new(Level::Info, format_args!("hello")))
            .unwrap();
        handler
            .try_log(&failures, &Record::new(Level::Error, format_args!("broken")))
            .unwrap();

        assert_eq!(read(&info), "test: Info: hello\n");
        assert_eq!(read(&log), "test: Error: broken\n");
    }

    #[test]
    fn test_recursion_limit_writes_nothing() {
        let dir = temp_dir::TempDir::new().unwrap();
        let log = dir.path().join("error.log");
        let failures = Failures::new();
        failures.open_log_file(&log, None).unwrap();

        // the depth is shared by all instances of the family
        let first = FdHandler::new();
        let _outer = first.recursion_guard().enter().unwrap();
        let _inner = FdHandler::new().recursion_guard().enter().unwrap();
        let result = failures
            .handlers()
            .error
            .try_log(&failures, &Record::new(Level::Error, format_args!("x")));
        assert!(matches!(result, Err(FailureLogError::RecursionLimit)));
        assert_eq!(read(&log), "");
    }

    #[test]
    fn test_concurrent_reports_are_not_nesting() {
        let dir = temp_dir::TempDir::new().unwrap();
        let log = dir.path().join("error.log");
        let failures = Arc::new(Failures::new());
        failures.open_log_file(&log, None).unwrap();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let failures = Arc::clone(&failures);
                scope.spawn(move || {
                    let handler = FdHandler::new();
                    for n in 0..500 {
                        handler
                            .try_log(
                                &failures,
                                &Record::new(Level::Info, format_args!("thread {t} line {n}")),
                            )
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(read(&log).lines().count(), 8 * 500);
    }

    #[test]
    fn test_single_nesting_is_delivered() {
        struct Nested<'a>(&'a Failures, &'a FdHandler);
        impl std::fmt::Display for Nested<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.1
                    .try_log(self.0, &Record::new(Level::Warning, format_args!("inner")))
                    .map_err(|_| std::fmt::Error)?;
                f.write_str("outer")
            }
        }

        let dir = temp_dir::TempDir::new().unwrap();
        let log = dir.path().join("error.log");
        let failures = Failures::new();
        failures.open_log_file(&log, None).unwrap();
        let handler = FdHandler::new();
        handler
            .try_log(
                &failures,
                &Record::new(Level::Error, format_args!("{}", Nested(&failures, &handler))),
            )
            .unwrap();
        assert_eq!(read(&log), "Warning: inner\nError: outer\n");
        assert_eq!(handler.recursion_guard().depth(), 0);
    }

    #[test]
    fn test_ignored_write_errors() {
        let failures = Failures::new();
        failures.open_log_file("/dev/full", None).unwrap();
        let handler = FdHandler::new();
        let record = Record::new(Level::Error, format_args!("lost"));

        let e = handler.try_log(&failures, &record).unwrap_err();
        assert_eq!(e.raw_os_error(), Some(nix::libc::ENOSPC));

        failures.set_ignore_write_errors(true);
        handler.try_log(&failures, &record).unwrap();
    }
}
