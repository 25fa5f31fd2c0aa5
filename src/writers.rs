//! The handler traits [`FatalHandler`] and [`LogHandler`], the three provided
//! handler families, and the blocking write primitive they share.
//!
//! A [`Failures`](crate::Failures) object holds one handler per role:
//!
//! * the fatal handler gets `Fatal` and `Panic` reports and ends the process,
//! * the error handler gets `Warning` and `Error` reports,
//! * the info handler gets `Info` reports.
//!
//! The provided families each implement both traits, and are installed as a matched triple:
//!
//! * [`FdHandler`]: the default, see
//!   [`Failures::open_log_file`](crate::Failures::open_log_file),
//! * [`SyslogHandler`]: see [`Failures::set_syslog`](crate::Failures::set_syslog),
//! * [`InternalHandler`]: see [`Failures::set_internal`](crate::Failures::set_internal).
//!
//! Own implementations can be installed per role with
//! [`Failures::set_fatal_handler`](crate::Failures::set_fatal_handler) and its siblings,
//! where `None` restores the default. Mixing families across roles is possible,
//! but rarely what you want.
//!
//! Every family keeps a [`RecursionGuard`](crate::RecursionGuard): a report that is
//! triggered while the same family is already active twice on the call path fails without
//! any output.

pub mod blocking_writer;
mod fd_handler;
mod handler;
mod internal_handler;
mod syslog_handler;

pub use self::blocking_writer::{
    write_full, FdWrite, PollReadiness, RawWrite, Readiness, MAX_CONSECUTIVE_EINTR,
};
pub use self::fd_handler::FdHandler;
pub use self::handler::{FatalHandler, Handlers, LogHandler};
pub use self::internal_handler::InternalHandler;
pub use self::syslog_handler::{severity as syslog_severity, SyslogHandler};
pub use nix::syslog::{Facility as SyslogFacility, LogFlags as SyslogOptions};
