// only enables the `doc_cfg` feature when the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! A process-wide failure reporting facility.
//!
//! All leveled messages of a program (info, warning, error, fatal, panic) go through one
//! [`Failures`] object, which hands them to a replaceable triple of handlers
//! (fatal, error, info). Three handler families are provided:
//!
//! * [`FdHandler`](writers::FdHandler): writes plain, newline-terminated lines to a log file
//!   descriptor (default: stderr), optionally with a timestamp and a prefix,
//! * [`SyslogHandler`](writers::SyslogHandler): hands the messages to the `syslog(3)` service,
//! * [`InternalHandler`](writers::InternalHandler): writes binary frames (see [`frame`])
//!   that a supervising parent process reads from the child's stderr.
//!
//! Fatal reports never return: a `Fatal` ends the process with an exit status
//! (see [`FatalStatus`]), a `Panic` aborts it.
//!
//! ```rust,no_run
//! use failure_log::{log_error, log_fatal_status, log_info, Failures, FatalStatus};
//!
//! let failures = Failures::new();
//! failures
//!     .open_log_file("/var/log/myapp.log", Some("myapp: "))
//!     .unwrap_or_else(|e| {
//!         log_fatal_status!(failures, e.fatal_status(), "{}: %m", e)
//!     });
//! log_info!(failures, "started");
//! if std::fs::metadata("/etc/myapp.conf").is_err() {
//!     log_error!(failures, "stat(/etc/myapp.conf) failed: %m");
//! }
//! ```
//!
//! Messages support the `%m` marker, which expands to the text of the OS error that was
//! current when the report was made. The entry macros capture `errno` before anything else
//! happens and restore it afterwards, so reporting an error never clobbers it.

mod deferred_now;
mod destination;
mod failure_log_error;
mod failures;
mod fatal_status;
mod formats;
mod level;
#[cfg(feature = "log_bridge")]
mod log_bridge;
mod macros;
mod record;
mod recursion_guard;

pub mod frame;
pub mod writers;

pub use crate::deferred_now::DeferredNow;
pub use crate::destination::LogFd;
pub use crate::failure_log_error::FailureLogError;
pub use crate::failures::{ExitInterceptor, Failures};
pub use crate::fatal_status::FatalStatus;
pub use crate::formats::Verbatim;
pub use crate::level::Level;
#[cfg(feature = "log_bridge")]
#[cfg_attr(docsrs, doc(cfg(feature = "log_bridge")))]
pub use crate::log_bridge::LogBridge;
pub use crate::record::{ErrnoGuard, Record};
pub use crate::recursion_guard::{GuardTicket, RecursionGuard, MAX_RECURSION_DEPTH};

/// Path that is mapped to the process's standard error stream instead of being opened.
pub const STDERR_PATH: &str = "/dev/stderr";

/// Initial capacity of the per-call formatting buffer.
pub const DEFAULT_LINE_CAPA: usize = 256;
