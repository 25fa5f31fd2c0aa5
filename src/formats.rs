use crate::{destination::Destination, DeferredNow, Record};
use nix::errno::Errno;
use std::{cell::Cell, fmt, fmt::Write};

thread_local! {
    // > 0 while a `Verbatim` value is rendered into the innermost active `Sanitizer`
    static VERBATIM_DEPTH: Cell<usize> = const { Cell::new(0) };
}

fn verbatim_depth() -> usize {
    VERBATIM_DEPTH.try_with(Cell::get).unwrap_or(0)
}

fn set_verbatim_depth(depth: usize) {
    VERBATIM_DEPTH.try_with(|d| d.set(depth)).ok();
}

/// Renders the wrapped value unchanged, without interpreting `%m` and `%n` in its output.
///
/// The entry macros wrap all explicit arguments with it, so that only the format string
/// itself is scanned for the markers. Code that builds a [`Record`] by hand wraps its
/// arguments the same way:
///
/// ```rust
/// use failure_log::{Level, Record, Verbatim};
///
/// let path = "/srv/50%mail";
/// let _record = Record::new(Level::Error, format_args!("open({}) failed: %m", Verbatim(&path)));
/// ```
pub struct Verbatim<'a, T: ?Sized>(pub &'a T);

struct VerbatimScope;

impl VerbatimScope {
    fn enter() -> Self {
        set_verbatim_depth(verbatim_depth() + 1);
        Self
    }
}

impl Drop for VerbatimScope {
    fn drop(&mut self) {
        set_verbatim_depth(verbatim_depth().saturating_sub(1));
    }
}

macro_rules! impl_verbatim {
    ($($trait:ident),+) => {
        $(
            impl<T: fmt::$trait + ?Sized> fmt::$trait for Verbatim<'_, T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let _scope = VerbatimScope::enter();
                    fmt::$trait::fmt(self.0, f)
                }
            }
        )+
    };
}

impl_verbatim!(Display, Debug, LowerHex, UpperHex, Octal, Binary, LowerExp, UpperExp, Pointer);

// Writes the user message into a byte buffer, rewriting the two printf-style markers
// that have a meaning for failure reports:
// `%m` becomes the text of the captured OS error, `%n` is written as `%%n` so that no
// printf-style consumer further down can ever act on it. `%%` is kept as a pair.
// Output of `Verbatim` values is copied as is.
struct Sanitizer<'a> {
    out: &'a mut Vec<u8>,
    os_error: Option<i32>,
    pending_percent: bool,
    outer_verbatim_depth: usize,
}

impl<'a> Sanitizer<'a> {
    fn new(out: &'a mut Vec<u8>, os_error: Option<i32>) -> Self {
        // a report rendered inside a verbatim argument has its own format string
        let outer_verbatim_depth = verbatim_depth();
        set_verbatim_depth(0);
        Self {
            out,
            os_error,
            pending_percent: false,
            outer_verbatim_depth,
        }
    }

    fn flush_percent(&mut self) {
        if self.pending_percent {
            self.pending_percent = false;
            self.out.push(b'%');
        }
    }

    fn push_os_error(&mut self) {
        let errno = self.os_error.map_or(Errno::UnknownErrno, Errno::from_raw);
        self.out.extend_from_slice(errno.desc().as_bytes());
    }
}

impl Drop for Sanitizer<'_> {
    fn drop(&mut self) {
        self.flush_percent();
        set_verbatim_depth(self.outer_verbatim_depth);
    }
}

impl Write for Sanitizer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if verbatim_depth() > 0 {
            self.flush_percent();
            self.out.extend_from_slice(s.as_bytes());
            return Ok(());
        }
        for &b in s.as_bytes() {
            if self.pending_percent {
                self.pending_percent = false;
                match b {
                    b'm' => self.push_os_error(),
                    b'n' => self.out.extend_from_slice(b"%%n"),
                    _ => self.out.extend_from_slice(&[b'%', b]),
                }
            } else if b == b'%' {
                self.pending_percent = true;
            } else {
                self.out.push(b);
            }
        }
        Ok(())
    }
}

/// Renders the user message of `record` into `buf`, with `%m` and `%n` in the format string
/// rewritten.
pub(crate) fn write_message(buf: &mut Vec<u8>, record: &Record) {
    let mut sanitizer = Sanitizer::new(buf, record.os_error());
    // a failing Display impl leaves what it wrote so far; the line is still delivered
    sanitizer.write_fmt(*record.args()).ok();
}

// Timestamp and configured prefix.
fn write_log_prefix(buf: &mut Vec<u8>, now: &mut DeferredNow, destination: &Destination) {
    if let Some(ref format) = destination.timestamp_format {
        now.render_into(format, buf);
    }
    if let Some(ref prefix) = destination.prefix {
        buf.extend_from_slice(prefix.as_bytes());
    }
}

/// A complete line for a log file descriptor:
/// `[timestamp][prefix]<Level>: <message>\n`.
pub(crate) fn format_fd_line(
    buf: &mut Vec<u8>,
    now: &mut DeferredNow,
    destination: &Destination,
    record: &Record,
) {
    write_log_prefix(buf, now, destination);
    buf.extend_from_slice(record.level().prefix().as_bytes());
    write_message(buf, record);
    buf.push(b'\n');
}

/// The text that is handed to the syslog: `[prefix][Fatal: |Panic: ]<message>`.
///
/// Syslog shows the severity on its own, so the level label is only added for the two
/// levels that end the process.
pub(crate) fn format_syslog_body(buf: &mut Vec<u8>, destination: &Destination, record: &Record) {
    if let Some(ref prefix) = destination.prefix {
        buf.extend_from_slice(prefix.as_bytes());
    }
    if record.level().is_terminal() {
        buf.extend_from_slice(record.level().prefix().as_bytes());
    }
    write_message(buf, record);
}

#[cfg(test)]
mod test {
    use super::{format_fd_line, format_syslog_body, write_message, Verbatim};
    use crate::{destination::Destination, DeferredNow, Level, Record};
    use nix::errno::Errno;
    use std::sync::Arc;

    fn message(record: &Record) -> String {
        let mut buf = Vec::new();
        write_message(&mut buf, record);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_percent_m_expands_captured_error() {
        let record = Record::new(Level::Error, format_args!("open({}) failed: %m", "/x"))
            .with_os_error(Some(Errno::ENOENT as i32));
        assert_eq!(message(&record), "open(/x) failed: No such file or directory");
    }

    #[test]
    fn test_percent_n_is_neutralized() {
        let record = Record::new(Level::Error, format_args!("count%n {}", "%n"));
        assert_eq!(message(&record), "count%%n %%n");
    }

    #[test]
    fn test_other_percent_sequences_pass() {
        let record = Record::new(Level::Info, format_args!("100% {} %%m %s %", "done"))
            .with_os_error(Some(Errno::EIO as i32));
        assert_eq!(message(&record), "100% done %%m %s %");
    }

    #[test]
    fn test_verbatim_arguments_pass_unchanged() {
        let path = Verbatim(&"/srv/50%mail/%n.txt");
        let msg = message(
            &Record::new(Level::Info, format_args!("opened {} %m", path))
                .with_os_error(Some(Errno::ENOENT as i32)),
        );
        assert_eq!(
            msg,
            "opened /srv/50%mail/%n.txt No such file or directory"
        );

        // a marker cannot be completed by argument text
        let m = Verbatim(&"m");
        let msg = message(
            &Record::new(Level::Info, format_args!("50%{}", m))
                .with_os_error(Some(Errno::EACCES as i32)),
        );
        assert_eq!(msg, "50%m");

        let (pn, pm) = (Verbatim(&"%n"), Verbatim(&"%m"));
        let msg = message(&Record::new(Level::Info, format_args!("{:>5}|{:?}", pn, pm)));
        assert_eq!(msg, "   %n|\"%m\"");
    }

    #[test]
    fn test_report_inside_verbatim_argument_has_own_format() {
        struct Nested;
        impl std::fmt::Display for Nested {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let pm = Verbatim(&"%m");
                let inner = message(
                    &Record::new(Level::Info, format_args!("inner %m {}", pm))
                        .with_os_error(Some(Errno::EIO as i32)),
                );
                f.write_str(&inner)
            }
        }
        let nested = Verbatim(&Nested);
        let msg = message(&Record::new(Level::Info, format_args!("outer %n [{}] %n", nested)));
        assert_eq!(
            msg,
            "outer %%n [inner Input/output error %m] %%n"
        );
    }

    #[test]
    fn test_fd_line_layout() {
        let destination = Destination {
            prefix: Some(Arc::from("imap(42): ")),
            ..Destination::default()
        };
        let mut buf = Vec::new();
        format_fd_line(
            &mut buf,
            &mut DeferredNow::new(),
            &destination,
            &Record::new(Level::Warning, format_args!("quota {}%", 95)),
        );
        assert_eq!(buf, b"imap(42): Warning: quota 95%\n");
    }

    #[test]
    fn test_fd_line_with_timestamp() {
        let destination = Destination {
            timestamp_format: Some(Arc::from("%Y ")),
            ..Destination::default()
        };
        let mut buf = Vec::new();
        format_fd_line(
            &mut buf,
            &mut DeferredNow::new(),
            &destination,
            &Record::new(Level::Info, format_args!("up")),
        );
        let line = String::from_utf8(buf).unwrap();
        assert_eq!(line.len(), "2026 Info: up\n".len());
        assert!(line.ends_with(" Info: up\n"));
        assert!(line[..4].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_syslog_body_labels_only_terminal_levels() {
        let destination = Destination {
            prefix: Some(Arc::from("pop3: ")),
            ..Destination::default()
        };
        let mut buf = Vec::new();
        format_syslog_body(
            &mut buf,
            &destination,
            &Record::new(Level::Error, format_args!("broken")),
        );
        assert_eq!(buf, b"pop3: broken");

        buf.clear();
        format_syslog_body(
            &mut buf,
            &destination,
            &Record::new(Level::Fatal, format_args!("gone")),
        );
        assert_eq!(buf, b"pop3: Fatal: gone");
    }
}
