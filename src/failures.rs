use crate::{
    deferred_now::is_valid_format,
    destination::Destination,
    writers::{
        FatalHandler, FdHandler, Handlers, InternalHandler, LogHandler, PollReadiness, Readiness,
        SyslogFacility, SyslogHandler, SyslogOptions,
    },
    FailureLogError, FatalStatus, Level, LogFd, Record, Verbatim,
};
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    net::IpAddr,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
    },
};

/// Callback that may rewrite the exit status before a fatal report ends the process.
pub type ExitInterceptor = Arc<dyn Fn(&mut FatalStatus) + Send + Sync>;

/// The single choke point for all failure reports of a process.
///
/// Holds the installed handler triple, the log destination (descriptors, prefix,
/// timestamp format, error policy) and the exit interceptor.
///
/// Configuration is expected to happen while the process starts up; the setters are
/// safe to call at any time, but reports that are in flight keep using the state they
/// started with.
///
/// Usually one instance is created by the composition root of the program and handed to
/// the code that reports failures. [`Failures::global`] is available for code that has
/// no such root.
pub struct Failures {
    handlers: Mutex<Handlers>,
    destination: Mutex<Destination>,
    exit_interceptor: Mutex<Option<ExitInterceptor>>,
    readiness: Box<dyn Readiness>,
    default_handler: Arc<FdHandler>,
    syslog_opened: AtomicBool,
}

impl Default for Failures {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Failures {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("Failures")
            .field("destination", &self.destination())
            .field("syslog_opened", &self.syslog_opened)
            .finish_non_exhaustive()
    }
}

// A report must never be lost because some other thread panicked while holding a lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Failures {
    /// Everything goes to stderr, through [`FdHandler`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::with_readiness(Box::new(PollReadiness))
    }

    /// Like [`Failures::new`], with a different primitive for waiting on descriptors
    /// that are not writable.
    #[must_use]
    pub fn with_readiness(readiness: Box<dyn Readiness>) -> Self {
        let default_handler = Arc::new(FdHandler::new());
        Self {
            handlers: Mutex::new(Handlers::defaults(&default_handler)),
            destination: Mutex::new(Destination::default()),
            exit_interceptor: Mutex::new(None),
            readiness,
            default_handler,
            syslog_opened: AtomicBool::new(false),
        }
    }

    /// A process-wide instance, created on first use.
    #[must_use]
    pub fn global() -> &'static Failures {
        static GLOBAL: OnceLock<Failures> = OnceLock::new();
        GLOBAL.get_or_init(Failures::new)
    }

    // ---- reporting ----

    /// Dispatches a report by its level:
    /// `Info` to the info handler, `Warning` and `Error` to the error handler,
    /// `Fatal` and `Panic` to the fatal handler (and then does not return).
    pub fn log(&self, record: &Record) {
        match record.level() {
            Level::Info => self.handlers().info.log(self, record),
            Level::Warning | Level::Error => self.handlers().error.log(self, record),
            Level::Fatal => self.fatal(FatalStatus::DEFAULT, record),
            Level::Panic => self.panic(record),
        }
    }

    /// Reports a fatal error and ends the process with `status`
    /// (or with a more specific status, if `status` is [`FatalStatus::DEFAULT`] and
    /// the report could not be delivered).
    pub fn fatal(&self, status: FatalStatus, record: &Record) -> ! {
        let handler = Arc::clone(&self.handlers().fatal);
        handler.fatal(self, &record.with_level(Level::Fatal), status)
    }

    /// Reports a violated invariant and aborts the process.
    pub fn panic(&self, record: &Record) -> ! {
        let handler = Arc::clone(&self.handlers().fatal);
        handler.fatal(self, &record.with_level(Level::Panic), FatalStatus::DEFAULT)
    }

    /// Ends the process after a fatal report was handled.
    ///
    /// For `Panic`, and for the out-of-memory status, a backtrace is reported through the
    /// error handler first (if one can be captured; failures are ignored).
    /// `Panic` then aborts; everything else exits via [`Failures::exit`].
    pub fn fatal_finish(&self, level: Level, status: FatalStatus) -> ! {
        if level == Level::Panic || status == FatalStatus::OUT_OF_MEMORY {
            let backtrace = Backtrace::force_capture();
            if backtrace.status() == BacktraceStatus::Captured {
                let handler = Arc::clone(&self.handlers().error);
                handler
                    .try_log(
                        self,
                        &Record::new(
                            Level::Error,
                            format_args!("Raw backtrace: {}", Verbatim(&backtrace)),
                        ),
                    )
                    .ok();
            }
        }
        if level == Level::Panic {
            std::process::abort();
        }
        self.exit(status)
    }

    /// Exits the process with `status`, after giving the exit interceptor
    /// (if one is installed) the chance to rewrite it.
    pub fn exit(&self, status: FatalStatus) -> ! {
        let mut status = status;
        let interceptor = lock(&self.exit_interceptor).clone();
        if let Some(interceptor) = interceptor {
            interceptor(&mut status);
        }
        std::process::exit(status.code())
    }

    // ---- state access for handlers ----

    /// A snapshot of the installed handler triple.
    #[must_use]
    pub fn handlers(&self) -> Handlers {
        lock(&self.handlers).clone()
    }

    pub(crate) fn destination(&self) -> Destination {
        lock(&self.destination).clone()
    }

    /// The primitive used to wait for descriptors that are not writable.
    #[must_use]
    pub fn readiness(&self) -> &dyn Readiness {
        self.readiness.as_ref()
    }

    // ---- handler registry ----

    /// Installs a fatal handler; `None` restores the default [`FdHandler`].
    pub fn set_fatal_handler(&self, handler: Option<Arc<dyn FatalHandler>>) {
        lock(&self.handlers).fatal =
            handler.unwrap_or_else(|| Arc::clone(&self.default_handler) as Arc<dyn FatalHandler>);
    }

    /// Installs an error handler; `None` restores the default [`FdHandler`].
    pub fn set_error_handler(&self, handler: Option<Arc<dyn LogHandler>>) {
        lock(&self.handlers).error =
            handler.unwrap_or_else(|| Arc::clone(&self.default_handler) as Arc<dyn LogHandler>);
    }

    /// Installs an info handler; `None` restores the default [`FdHandler`].
    pub fn set_info_handler(&self, handler: Option<Arc<dyn LogHandler>>) {
        lock(&self.handlers).info =
            handler.unwrap_or_else(|| Arc::clone(&self.default_handler) as Arc<dyn LogHandler>);
    }

    /// Installs `handler` in all three roles at once.
    pub fn set_handlers<H>(&self, handler: &Arc<H>)
    where
        H: FatalHandler + LogHandler + 'static,
    {
        *lock(&self.handlers) = Handlers::uniform(handler);
    }

    fn reset_handlers(&self) {
        *lock(&self.handlers) = Handlers::defaults(&self.default_handler);
    }

    // ---- destinations ----

    /// Sends both error and info output to the file at `path`, with the given line prefix,
    /// and restores the default handlers.
    ///
    /// Previously opened log files are closed. [`STDERR_PATH`](crate::STDERR_PATH)
    /// selects stderr.
    ///
    /// # Errors
    ///
    /// [`FailureLogError::LogOpen`] if the file cannot be opened; the previous configuration
    /// then stays in place. Programs that cannot run without their log usually end with
    /// [`FailureLogError::fatal_status`] in this case.
    pub fn open_log_file<P: AsRef<Path>>(
        &self,
        path: P,
        prefix: Option<&str>,
    ) -> Result<(), FailureLogError> {
        let fd = LogFd::open(path)?;
        {
            let mut destination = lock(&self.destination);
            destination.prefix = prefix.map(Arc::from);
            destination.replace_log(fd);
        }
        self.reset_handlers();
        Ok(())
    }

    /// Sends info output to the file at `path`, separately from error output,
    /// and restores the default info handler.
    ///
    /// # Errors
    ///
    /// [`FailureLogError::LogOpen`] if the file cannot be opened.
    pub fn open_info_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FailureLogError> {
        let fd = LogFd::open(path)?;
        lock(&self.destination).replace_info(fd);
        self.set_info_handler(None);
        Ok(())
    }

    /// Opens the syslog with the given ident, options and facility, and installs
    /// [`SyslogHandler`]s in all three roles.
    ///
    /// # Errors
    ///
    /// [`FailureLogError::Syslog`] if the syslog cannot be opened.
    pub fn set_syslog(
        &self,
        ident: &str,
        options: SyslogOptions,
        facility: SyslogFacility,
    ) -> Result<(), FailureLogError> {
        let handler = Arc::new(SyslogHandler::open(ident, options, facility)?);
        self.syslog_opened.store(true, Ordering::Release);
        self.set_handlers(&handler);
        Ok(())
    }

    /// Installs [`InternalHandler`]s that write frames to stderr in all three roles.
    pub fn set_internal(&self) {
        self.set_handlers(&Arc::new(InternalHandler::new()));
    }

    /// Sets or removes the prefix that is put in front of each line.
    pub fn set_prefix(&self, prefix: Option<&str>) {
        lock(&self.destination).prefix = prefix.map(Arc::from);
    }

    /// Sets or removes the strftime-style format of the timestamp that starts each line.
    ///
    /// # Errors
    ///
    /// [`FailureLogError::TimestampFormat`] if the format contains unsupported items.
    pub fn set_timestamp_format(&self, format: Option<&str>) -> Result<(), FailureLogError> {
        if let Some(format) = format {
            if !is_valid_format(format) {
                return Err(FailureLogError::TimestampFormat(format.to_owned()));
            }
        }
        lock(&self.destination).timestamp_format = format.map(Arc::from);
        Ok(())
    }

    /// If set, failing writes are treated as successful, instead of terminating the
    /// process or escalating the exit status.
    pub fn set_ignore_write_errors(&self, ignore: bool) {
        lock(&self.destination).ignore_write_errors = ignore;
    }

    /// Installs or removes the callback that may rewrite the status of a fatal exit.
    pub fn set_exit_interceptor(&self, interceptor: Option<ExitInterceptor>) {
        *lock(&self.exit_interceptor) = interceptor;
    }

    // ---- out-of-band context ----

    /// Sends an option frame, if the error handler writes the framed internal protocol;
    /// does nothing otherwise.
    ///
    /// # Errors
    ///
    /// If writing the frame fails.
    pub fn send_option(&self, key: &str, value: &str) -> Result<(), FailureLogError> {
        let error = Arc::clone(&self.handlers().error);
        match error.as_internal() {
            Some(internal) => internal.send_option(self, key, value),
            None => Ok(()),
        }
    }

    /// Announces the address of the peer that subsequent reports relate to;
    /// only effective with the framed internal protocol.
    ///
    /// # Errors
    ///
    /// If writing the frame fails.
    pub fn set_peer_address(&self, ip: IpAddr) -> Result<(), FailureLogError> {
        self.send_option(crate::frame::OPTION_IP, &ip.to_string())
    }

    // ---- teardown ----

    /// Closes owned log descriptors, falls back to stderr, forgets prefix and timestamp
    /// format, and closes the syslog if it was opened. Calling it again is harmless.
    pub fn deinit(&self) {
        lock(&self.destination).reset();
        if self.syslog_opened.swap(false, Ordering::AcqRel) {
            nix::syslog::closelog();
        }
    }
}
