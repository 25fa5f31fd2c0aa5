use crate::FatalStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Describes errors in the configuration and the delivery of `failure_log`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FailureLogError {
    /// Writing to a log channel failed.
    #[error("writing the log line failed")]
    Io(#[from] std::io::Error),

    /// The log file could not be opened.
    #[error("can't open log file {}", .path.display())]
    LogOpen {
        /// The path that was tried.
        path: PathBuf,
        /// The reason.
        source: std::io::Error,
    },

    /// Opening the syslog or handing a message to it failed.
    #[error("syslog delivery failed")]
    Syslog(#[from] nix::Error),

    /// The timestamp format contains an item that strftime-style rendering does not support.
    #[error("invalid timestamp format {0:?}")]
    TimestampFormat(String),

    /// The handler family is already active twice on the current call path;
    /// nothing was written.
    #[error("log handler recursion limit reached")]
    RecursionLimit,

    /// A lock around the shared failure state was poisoned.
    #[error("failure state is poisoned")]
    Poisoned,

    /// Installing the bridge for the `log` crate failed.
    #[cfg(feature = "log_bridge")]
    #[cfg_attr(docsrs, doc(cfg(feature = "log_bridge")))]
    #[error("logger initialization failed")]
    Log(#[from] log::SetLoggerError),
}

impl FailureLogError {
    /// The exit status a process should use when it cannot continue because of this error.
    #[must_use]
    pub fn fatal_status(&self) -> FatalStatus {
        match self {
            Self::LogOpen { .. } => FatalStatus::LOG_OPEN,
            Self::Io(_) | Self::RecursionLimit => FatalStatus::LOG_WRITE,
            Self::Syslog(_) => FatalStatus::LOG_ERROR,
            Self::TimestampFormat(_) | Self::Poisoned => FatalStatus::DEFAULT,
            #[cfg(feature = "log_bridge")]
            Self::Log(_) => FatalStatus::DEFAULT,
        }
    }

    /// The raw OS error behind this error, if there is one.
    ///
    /// Used to expand `%m` when the error itself is reported.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io(e) | Self::LogOpen { source: e, .. } => e.raw_os_error(),
            Self::Syslog(errno) => Some(*errno as i32),
            _ => None,
        }
    }
}
