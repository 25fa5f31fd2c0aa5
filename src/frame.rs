//! The framed protocol that a child process uses to send its reports to a supervising
//! parent over a single descriptor (by default the child's stderr).
//!
//! Each frame is one line:
//!
//! ```text
//! 0x01 <level code> <message bytes> 0x0A      log frame, level code one of I W E F P
//! 0x01 'O' <key> '=' <value> 0x0A            option frame, e.g. "Oip=203.0.113.5"
//! ```
//!
//! There is no length prefix, the newline ends a frame. A message that contains line
//! breaks is therefore sent as one frame per line, all with the same level code.
//! The parent owns the presentation: frames carry neither timestamp nor prefix.

use crate::{formats::write_message, Level, Record};
use std::borrow::Cow;

/// First byte of every frame.
pub const CONTROL: u8 = 0x01;

/// Code byte of option frames.
pub const OPTION_CODE: u8 = b'O';

/// Option key used to announce the peer address of the connection the child serves.
pub const OPTION_IP: &str = "ip";

/// Appends the frames for `record` to `buf`.
pub fn encode_record(buf: &mut Vec<u8>, record: &Record) {
    let mut message = Vec::with_capacity(crate::DEFAULT_LINE_CAPA);
    write_message(&mut message, record);
    let message = message.strip_suffix(b"\n").unwrap_or(&message);
    for line in message.split(|b| *b == b'\n') {
        buf.push(CONTROL);
        buf.push(record.level().code());
        buf.extend_from_slice(line);
        buf.push(b'\n');
    }
}

/// Appends an option frame to `buf`. Line breaks in `key` or `value` are dropped.
pub fn encode_option(buf: &mut Vec<u8>, key: &str, value: &str) {
    buf.push(CONTROL);
    buf.push(OPTION_CODE);
    buf.extend(key.bytes().filter(|b| *b != b'\n'));
    buf.push(b'=');
    buf.extend(value.bytes().filter(|b| *b != b'\n'));
    buf.push(b'\n');
}

/// A line as read by the supervising process.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// A report of the child.
    Log {
        /// Level of the report.
        level: Level,
        /// Message text.
        text: Cow<'a, str>,
    },
    /// Out-of-band context for the following reports.
    Option {
        /// Option name, e.g. [`OPTION_IP`].
        key: Cow<'a, str>,
        /// Option value.
        value: Cow<'a, str>,
    },
    /// A line that is not framed, or has an unknown code; the child wrote it directly.
    Plain(Cow<'a, str>),
}

/// Interprets one line (with or without its trailing newline).
#[must_use]
pub fn parse_line(line: &[u8]) -> Frame<'_> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    match line {
        [CONTROL, OPTION_CODE, rest @ ..] => {
            let rest = String::from_utf8_lossy(rest);
            match rest {
                Cow::Borrowed(s) => match s.split_once('=') {
                    Some((key, value)) => Frame::Option {
                        key: Cow::Borrowed(key),
                        value: Cow::Borrowed(value),
                    },
                    None => Frame::Option {
                        key: Cow::Borrowed(s),
                        value: Cow::Borrowed(""),
                    },
                },
                Cow::Owned(s) => {
                    let (key, value) = s.split_once('=').unwrap_or((&s, ""));
                    Frame::Option {
                        key: Cow::Owned(key.to_owned()),
                        value: Cow::Owned(value.to_owned()),
                    }
                }
            }
        }
        [CONTROL, code, rest @ ..] => match Level::from_code(*code) {
            Some(level) => Frame::Log {
                level,
                text: String::from_utf8_lossy(rest),
            },
            None => Frame::Plain(String::from_utf8_lossy(line)),
        },
        _ => Frame::Plain(String::from_utf8_lossy(line)),
    }
}

#[cfg(test)]
mod test {
    use super::{encode_option, encode_record, parse_line, Frame};
    use crate::{Level, Record};

    #[test]
    fn test_encode_record() {
        let mut buf = Vec::new();
        encode_record(
            &mut buf,
            &Record::new(Level::Warning, format_args!("user {} over quota", "bob")),
        );
        assert_eq!(buf, b"\x01Wuser bob over quota\n");
    }

    #[test]
    fn test_multiline_message_becomes_several_frames() {
        let mut buf = Vec::new();
        encode_record(
            &mut buf,
            &Record::new(Level::Error, format_args!("first\nsecond\n")),
        );
        assert_eq!(buf, b"\x01Efirst\n\x01Esecond\n");
    }

    #[test]
    fn test_percent_n_is_neutralized_in_frames() {
        let mut buf = Vec::new();
        encode_record(&mut buf, &Record::new(Level::Info, format_args!("a%nb")));
        assert_eq!(buf, b"\x01Ia%%nb\n");
    }

    #[test]
    fn test_encode_option() {
        let mut buf = Vec::new();
        encode_option(&mut buf, "ip", "203.0.113.5");
        assert_eq!(buf, b"\x01Oip=203.0.113.5\n");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line(b"\x01Fshutting down\n"),
            Frame::Log {
                level: Level::Fatal,
                text: "shutting down".into()
            }
        );
        assert_eq!(
            parse_line(b"\x01Oip=2001:db8::1\n"),
            Frame::Option {
                key: "ip".into(),
                value: "2001:db8::1".into()
            }
        );
        assert_eq!(parse_line(b"\x01Zodd"), Frame::Plain("\u{1}Zodd".into()));
        assert_eq!(parse_line(b"plain text\n"), Frame::Plain("plain text".into()));
    }
}
