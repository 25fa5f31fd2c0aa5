/// Classification of a failure report.
///
/// Levels are not ordered: a `Warning` is not "less" than an `Error`,
/// it is routed and labelled differently.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Informational message, delivered through the info handler.
    Info,
    /// Something unexpected that the program can live with.
    Warning,
    /// An error that the program survives.
    Error,
    /// An error that terminates the process with an exit status.
    Fatal,
    /// A violated invariant; terminates the process with `abort()`.
    Panic,
}

const PREFIXES: [&str; 5] = ["Info: ", "Warning: ", "Error: ", "Fatal: ", "Panic: "];
const CODES: [u8; 5] = [b'I', b'W', b'E', b'F', b'P'];
const NAMES: [&str; 5] = ["Info", "Warning", "Error", "Fatal", "Panic"];

impl Level {
    /// All levels, in declaration order.
    pub const ALL: [Level; 5] = [
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    fn index(self) -> usize {
        match self {
            Level::Info => 0,
            Level::Warning => 1,
            Level::Error => 2,
            Level::Fatal => 3,
            Level::Panic => 4,
        }
    }

    /// The human-readable label that is put in front of a message, e.g. `"Error: "`.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        PREFIXES[self.index()]
    }

    /// The single character that identifies the level in the framed internal protocol.
    #[must_use]
    pub fn code(self) -> u8 {
        CODES[self.index()]
    }

    /// Inverse of [`Level::code`].
    #[must_use]
    pub fn from_code(code: u8) -> Option<Level> {
        CODES
            .iter()
            .position(|c| *c == code)
            .map(|idx| Self::ALL[idx])
    }

    /// `true` for the two levels that never return to the caller.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Level::Fatal | Level::Panic)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(NAMES[self.index()])
    }
}

#[cfg(feature = "log_bridge")]
impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info | log::Level::Debug | log::Level::Trace => Level::Info,
        }
    }
}
