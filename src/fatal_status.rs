/// Exit status of a process that terminates through a fatal report.
///
/// The reserved values are distinct from each other and from `0` and `1`,
/// so that a supervising process can tell from the exit status alone why a child died.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FatalStatus(i32);

impl FatalStatus {
    /// No explicit status was requested; handlers may replace it with a more specific one.
    pub const DEFAULT: FatalStatus = FatalStatus(89);
    /// The log file could not be opened.
    pub const LOG_OPEN: FatalStatus = FatalStatus(80);
    /// Writing to the log file descriptor failed.
    pub const LOG_WRITE: FatalStatus = FatalStatus(81);
    /// Delivery to the syslog or to the internal channel failed.
    pub const LOG_ERROR: FatalStatus = FatalStatus(82);
    /// The process ran out of memory.
    pub const OUT_OF_MEMORY: FatalStatus = FatalStatus(83);

    /// Wraps an arbitrary exit code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// The numeric exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns `to` if `self` is [`FatalStatus::DEFAULT`], otherwise `self`.
    ///
    /// An explicitly requested status is never overridden.
    #[must_use]
    pub fn escalate(self, to: FatalStatus) -> FatalStatus {
        if self == Self::DEFAULT {
            to
        } else {
            self
        }
    }
}

impl Default for FatalStatus {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for FatalStatus {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl std::fmt::Display for FatalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
