use chrono::{
    format::{Item, StrftimeItems},
    DateTime, Local,
};
use std::fmt::Write;

/// Deferred timestamp creation.
///
/// The clock is only read if a timestamp is really rendered, i.e. if a timestamp format
/// is configured.
#[derive(Debug, Default)]
pub struct DeferredNow(Option<DateTime<Local>>);

impl DeferredNow {
    /// Constructs a new instance, but does not generate the timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(None)
    }

    /// Retrieve the timestamp.
    ///
    /// Requires mutability because the first caller will generate the timestamp.
    pub fn now(&mut self) -> &DateTime<Local> {
        self.0.get_or_insert_with(Local::now)
    }

    /// Renders the timestamp with the given strftime-style format and appends it to `buf`.
    ///
    /// Appends nothing if rendering fails or produces no output.
    pub fn render_into(&mut self, fmt: &str, buf: &mut Vec<u8>) {
        let mut rendered = String::with_capacity(32);
        if write!(rendered, "{}", self.now().format(fmt)).is_ok() {
            buf.extend_from_slice(rendered.as_bytes());
        }
    }
}

/// Checks if `fmt` can be rendered by [`DeferredNow::render_into`].
pub(crate) fn is_valid_format(fmt: &str) -> bool {
    !StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error))
}
