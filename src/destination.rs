use crate::{writers::blocking_writer::report_to_stderr, FailureLogError, STDERR_PATH};
use std::{
    fs::OpenOptions,
    io::Stderr,
    os::{
        fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd},
        unix::fs::OpenOptionsExt,
    },
    path::Path,
    sync::Arc,
};

/// A descriptor that log output goes to.
///
/// Either the process's standard error stream, which is never closed by this crate,
/// or a descriptor that is owned here and closed when the last reference is replaced.
#[derive(Debug)]
pub enum LogFd {
    /// File descriptor 2.
    Stderr(Stderr),
    /// An owned descriptor, e.g. an opened log file or one end of a pipe.
    Owned(Arc<OwnedFd>),
}

impl Default for LogFd {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Clone for LogFd {
    fn clone(&self) -> Self {
        match self {
            Self::Stderr(_) => Self::stderr(),
            Self::Owned(owned) => Self::Owned(Arc::clone(owned)),
        }
    }
}

impl LogFd {
    /// The process's standard error stream.
    #[must_use]
    pub fn stderr() -> Self {
        Self::Stderr(std::io::stderr())
    }

    /// Opens `path` for appending, creating it with mode `0600` if necessary.
    ///
    /// The path [`STDERR_PATH`] is not opened but mapped to [`LogFd::stderr`].
    ///
    /// # Errors
    ///
    /// [`FailureLogError::LogOpen`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FailureLogError> {
        let path = path.as_ref();
        if path == Path::new(STDERR_PATH) {
            return Ok(Self::stderr());
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(path)
            .map(|file| Self::Owned(Arc::new(OwnedFd::from(file))))
            .map_err(|source| FailureLogError::LogOpen {
                path: path.to_path_buf(),
                source,
            })
    }

    /// `true` for the stderr fallback.
    #[must_use]
    pub fn is_stderr(&self) -> bool {
        matches!(self, Self::Stderr(_))
    }

    /// `true` if both refer to the same descriptor.
    #[must_use]
    pub fn same_as(&self, other: &LogFd) -> bool {
        match (self, other) {
            (Self::Stderr(_), Self::Stderr(_)) => true,
            (Self::Owned(a), Self::Owned(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    // Closes the descriptor if this is the last reference to it, and reports a failing
    // close(2) on stderr.
    pub(crate) fn close(self) {
        if let Self::Owned(arc) = self {
            if let Ok(owned) = Arc::try_unwrap(arc) {
                let raw = owned.into_raw_fd();
                if let Err(errno) = nix::unistd::close(raw) {
                    report_to_stderr(format_args!("close({raw}) failed: {}\n", errno.desc()));
                }
            }
        }
    }
}

impl AsFd for LogFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Stderr(stderr) => stderr.as_fd(),
            Self::Owned(owned) => owned.as_fd(),
        }
    }
}

impl AsRawFd for LogFd {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.as_fd().as_raw_fd()
    }
}

impl From<OwnedFd> for LogFd {
    fn from(fd: OwnedFd) -> Self {
        Self::Owned(Arc::new(fd))
    }
}

/// Where the fd handler writes to, and how lines are decorated.
///
/// Cloning is cheap; each report works on its own clone so that no lock is held
/// while a message is formatted and written.
#[derive(Clone, Debug, Default)]
pub(crate) struct Destination {
    pub(crate) log: LogFd,
    pub(crate) info: LogFd,
    pub(crate) prefix: Option<Arc<str>>,
    pub(crate) timestamp_format: Option<Arc<str>>,
    pub(crate) ignore_write_errors: bool,
}

impl Destination {
    // Routes both the log and the info output to `fd`.
    pub(crate) fn replace_log(&mut self, fd: LogFd) {
        let old_info = std::mem::replace(&mut self.info, fd.clone());
        let old_log = std::mem::replace(&mut self.log, fd);
        if old_info.same_as(&old_log) {
            drop(old_info);
        } else {
            old_info.close();
        }
        old_log.close();
    }

    pub(crate) fn replace_info(&mut self, fd: LogFd) {
        let old_info = std::mem::replace(&mut self.info, fd);
        if !old_info.same_as(&self.log) {
            old_info.close();
        }
    }

    // Falls back to stderr for both outputs and forgets the decorations.
    pub(crate) fn reset(&mut self) {
        self.replace_log(LogFd::stderr());
        self.prefix = None;
        self.timestamp_format = None;
    }
}
