use crate::{ErrnoGuard, FailureLogError, Failures, Level, Record, Verbatim};
use std::sync::Arc;

/// Implementation of [`log::Log`] that routes the records of the `log` facade through a
/// [`Failures`] object.
///
/// `error!` becomes an `Error` report, `warn!` a `Warning`, and `info!`, `debug!`
/// and `trace!` become `Info` reports. Nothing that comes through the facade is fatal.
/// Facade messages are written as they are; `%m` and `%n` have no meaning there.
pub struct LogBridge {
    failures: Arc<Failures>,
}

impl LogBridge {
    /// Creates the bridge without registering it.
    #[must_use]
    pub fn new(failures: Arc<Failures>) -> Self {
        Self { failures }
    }

    /// Registers a bridge as the global logger of the `log` facade and sets the max level.
    ///
    /// # Errors
    ///
    /// [`FailureLogError::Log`] if a global logger was already set.
    pub fn install(
        failures: Arc<Failures>,
        max_level: log::LevelFilter,
    ) -> Result<(), FailureLogError> {
        log::set_boxed_logger(Box::new(Self::new(failures)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let errno = ErrnoGuard::save();
        self.failures.log(
            &Record::new(
                Level::from(record.level()),
                format_args!("{}", Verbatim(record.args())),
            )
            .with_os_error(errno.saved()),
        );
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod test {
    use super::LogBridge;
    use crate::Failures;
    use log::Log;
    use std::sync::Arc;

    #[test]
    fn test_facade_levels() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("bridge.log");
        let failures = Arc::new(Failures::new());
        failures.open_log_file(&path, None).unwrap();
        let bridge = LogBridge::new(Arc::clone(&failures));

        for (level, text) in [
            (log::Level::Error, "e"),
            (log::Level::Warn, "w"),
            (log::Level::Info, "i"),
            (log::Level::Debug, "d"),
        ] {
            bridge.log(
                &log::Record::builder()
                    .level(level)
                    .args(format_args!("{text}"))
                    .build(),
            );
        }
        bridge.flush();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Error: e\nWarning: w\nInfo: i\nInfo: d\n"
        );
    }

    #[test]
    fn test_facade_text_is_not_rewritten() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("bridge.log");
        let failures = Arc::new(Failures::new());
        failures.open_log_file(&path, None).unwrap();
        let bridge = LogBridge::new(Arc::clone(&failures));

        let name = "50%mail";
        bridge.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .args(format_args!("disk {name} at 99%n, %m"))
                .build(),
        );

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Warning: disk 50%mail at 99%n, %m\n"
        );
    }
}
