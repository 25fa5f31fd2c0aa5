use crate::Level;
use nix::errno::Errno;

/// One failure report, as it is handed to the handlers.
///
/// Carries the OS error code that was current when the report was made, so that the
/// `%m` marker is expanded from that value and not from whatever `errno` holds by the time
/// the message is formatted.
#[derive(Copy, Clone, Debug)]
pub struct Record<'a> {
    level: Level,
    args: std::fmt::Arguments<'a>,
    os_error: Option<i32>,
}

impl<'a> Record<'a> {
    /// A report without an associated OS error.
    #[must_use]
    pub fn new(level: Level, args: std::fmt::Arguments<'a>) -> Self {
        Self {
            level,
            args,
            os_error: None,
        }
    }

    /// Attaches the OS error code that `%m` expands to.
    #[must_use]
    pub fn with_os_error(mut self, os_error: Option<i32>) -> Self {
        self.os_error = os_error;
        self
    }

    /// Returns a copy with a different level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// The level of the report.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message, with arguments not yet rendered.
    #[must_use]
    pub fn args(&self) -> &std::fmt::Arguments<'a> {
        &self.args
    }

    /// The captured OS error code, if any.
    #[must_use]
    pub fn os_error(&self) -> Option<i32> {
        self.os_error
    }
}

/// Saves `errno` on creation and restores it when dropped.
///
/// Used by the entry macros; the saved value is also what `%m` expands to.
#[derive(Debug)]
pub struct ErrnoGuard(i32);

impl ErrnoGuard {
    /// Captures the current `errno`.
    #[must_use]
    pub fn save() -> Self {
        Self(Errno::last_raw())
    }

    /// The captured value.
    #[must_use]
    pub fn saved(&self) -> Option<i32> {
        Some(self.0)
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        Errno::set_raw(self.0);
    }
}
