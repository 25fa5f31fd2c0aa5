//! The blocking write primitive shared by all handlers.
//!
//! [`write_full`] places a complete buffer on a descriptor: it continues partial writes,
//! tolerates a bounded number of interrupted calls, and waits through a [`Readiness`]
//! when the descriptor would block.

use nix::{
    errno::Errno,
    poll::{poll, PollFd, PollFlags, PollTimeout},
};
use std::{
    io::{self, ErrorKind},
    os::fd::{AsFd, BorrowedFd},
};

/// Number of consecutive `EINTR` results after which [`write_full`] gives up.
pub const MAX_CONSECUTIVE_EINTR: u32 = 3;

/// A sink that accepts bytes in possibly partial portions, and can be waited on
/// until it accepts more.
pub trait RawWrite {
    /// Writes some prefix of `buf`, like `write(2)`.
    ///
    /// # Errors
    ///
    /// The OS error of the write attempt.
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Blocks until the sink is writable again.
    ///
    /// # Errors
    ///
    /// If waiting itself fails.
    fn wait_writable(&mut self) -> io::Result<()>;
}

/// The primitive that [`write_full`] uses to wait for a descriptor that reported
/// `EAGAIN`/`EWOULDBLOCK`.
///
/// There is no timeout and no cancellation: the call returns only when the descriptor
/// is writable (or reports an error condition, which the next write will surface).
pub trait Readiness: Send + Sync {
    /// Blocks until `fd` is writable.
    ///
    /// # Errors
    ///
    /// If the wait itself fails.
    fn wait_writable(&self, fd: BorrowedFd<'_>) -> io::Result<()>;
}

/// [`Readiness`] based on `poll(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollReadiness;

impl Readiness for PollReadiness {
    fn wait_writable(&self, fd: BorrowedFd<'_>) -> io::Result<()> {
        let mut fds = [PollFd::new(fd, PollFlags::POLLOUT)];
        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }
}

/// Binds a descriptor and a [`Readiness`] to [`RawWrite`].
pub struct FdWrite<'a> {
    fd: BorrowedFd<'a>,
    readiness: &'a dyn Readiness,
}

impl<'a> FdWrite<'a> {
    /// Constructor.
    #[must_use]
    pub fn new(fd: BorrowedFd<'a>, readiness: &'a dyn Readiness) -> Self {
        Self { fd, readiness }
    }
}

impl RawWrite for FdWrite<'_> {
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        nix::unistd::write(self.fd, buf).map_err(io::Error::from)
    }

    fn wait_writable(&mut self) -> io::Result<()> {
        self.readiness.wait_writable(self.fd)
    }
}

/// Writes the complete buffer, or fails.
///
/// * partial writes are continued immediately with the remainder,
/// * a write that accepts zero bytes fails with `ENOSPC`,
/// * `EINTR` is retried, until it occurred [`MAX_CONSECUTIVE_EINTR`] times in a row,
/// * `EAGAIN` waits until the sink is writable and retries, without any deadline,
/// * every other error is returned as is.
///
/// # Errors
///
/// The error of the write attempt that made the write fail.
pub fn write_full<W: RawWrite + ?Sized>(w: &mut W, mut buf: &[u8]) -> io::Result<()> {
    let mut eintr_count = 0;
    while !buf.is_empty() {
        match w.write_some(buf) {
            Ok(0) => return Err(Errno::ENOSPC.into()),
            Ok(written) => {
                buf = &buf[written.min(buf.len())..];
                eintr_count = 0;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                eintr_count += 1;
                if eintr_count >= MAX_CONSECUTIVE_EINTR {
                    return Err(e);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => w.wait_writable()?,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// Last-resort diagnostics of the crate itself; errors are swallowed.
pub(crate) fn report_to_stderr(args: std::fmt::Arguments) {
    let msg = args.to_string();
    let stderr = std::io::stderr();
    write_full(&mut FdWrite::new(stderr.as_fd(), &PollReadiness), msg.as_bytes()).ok();
}
