use super::{FdHandler, InternalHandler};
use crate::{FailureLogError, Failures, FatalStatus, Record};
use std::sync::Arc;

/// Delivers non-terminal reports (info, warning, error).
pub trait LogHandler: Send + Sync {
    /// Tries to deliver the report.
    ///
    /// # Errors
    ///
    /// If the report could not be delivered; in particular
    /// [`FailureLogError::RecursionLimit`] if nothing was attempted because the handler
    /// family is already active twice on the current call path.
    fn try_log(&self, failures: &Failures, record: &Record) -> Result<(), FailureLogError>;

    /// Delivers the report, and terminates the process if that fails.
    ///
    /// Losing error reports silently is considered worse than crashing.
    /// The provided implementation exits with [`FatalStatus::LOG_ERROR`].
    fn log(&self, failures: &Failures, record: &Record) {
        if self.try_log(failures, record).is_err() {
            failures.exit(FatalStatus::LOG_ERROR);
        }
    }

    /// Returns the handler if it writes the framed internal protocol.
    fn as_internal(&self) -> Option<&InternalHandler> {
        None
    }
}

/// Delivers fatal and panic reports, and terminates the process.
pub trait FatalHandler: Send + Sync {
    /// Delivers the report, then ends the process via
    /// [`Failures::fatal_finish`](crate::Failures::fatal_finish).
    fn fatal(&self, failures: &Failures, record: &Record, status: FatalStatus) -> !;
}

/// The handler triple that is currently installed.
#[derive(Clone)]
pub struct Handlers {
    /// Handles `Fatal` and `Panic`.
    pub fatal: Arc<dyn FatalHandler>,
    /// Handles `Warning` and `Error`.
    pub error: Arc<dyn LogHandler>,
    /// Handles `Info`.
    pub info: Arc<dyn LogHandler>,
}

impl Handlers {
    /// The same backend in all three roles.
    #[must_use]
    pub fn uniform<H>(handler: &Arc<H>) -> Self
    where
        H: FatalHandler + LogHandler + 'static,
    {
        Self {
            fatal: Arc::clone(handler) as Arc<dyn FatalHandler>,
            error: Arc::clone(handler) as Arc<dyn LogHandler>,
            info: Arc::clone(handler) as Arc<dyn LogHandler>,
        }
    }

    pub(crate) fn defaults(default: &Arc<FdHandler>) -> Self {
        Self::uniform(default)
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("Handlers")
            .field("fatal", &"<..>")
            .field("error", &"<..>")
            .field("info", &"<..>")
            .finish()
    }
}
