// Message arguments of all entry macros
//
// The format string must be a literal; `%m` and `%n` are only interpreted there.
// The explicit arguments (positional and `name = value`) are wrapped in `Verbatim`, so
// their output reaches the destination unchanged. Variables captured inline in the format
// string (`"{path}"`) are part of the format string, so pass values that may contain `%`
// as explicit arguments.

/// Reports an informational message through the info handler.
///
/// ```rust,no_run
/// # let failures = failure_log::Failures::new();
/// failure_log::log_info!(failures, "listening on port {}", 143);
/// ```
#[macro_export]
macro_rules! log_info {
    ($failures:expr, $($arg:tt)+) => {
        $crate::__log_with_level!($failures, $crate::Level::Info, $($arg)+)
    };
}

/// Reports a warning through the error handler.
#[macro_export]
macro_rules! log_warning {
    ($failures:expr, $($arg:tt)+) => {
        $crate::__log_with_level!($failures, $crate::Level::Warning, $($arg)+)
    };
}

/// Reports an error through the error handler.
///
/// `%m` in the format string expands to the text of `errno` as it was when the macro was
/// invoked. Argument values are written as they are.
///
/// ```rust,no_run
/// # let failures = failure_log::Failures::new();
/// # let path = "/etc/myapp.conf";
/// failure_log::log_error!(failures, "open({}) failed: %m", path);
/// ```
#[macro_export]
macro_rules! log_error {
    ($failures:expr, $($arg:tt)+) => {
        $crate::__log_with_level!($failures, $crate::Level::Error, $($arg)+)
    };
}

/// Reports a fatal error and exits the process with [`FatalStatus::DEFAULT`](crate::FatalStatus),
/// or with a more specific status if the report itself could not be delivered.
#[macro_export]
macro_rules! log_fatal {
    ($failures:expr, $($arg:tt)+) => {
        $crate::log_fatal_status!($failures, $crate::FatalStatus::DEFAULT, $($arg)+)
    };
}

/// Reports a fatal error and exits the process with the given status.
#[macro_export]
macro_rules! log_fatal_status {
    ($failures:expr, $status:expr, $fmt:literal $($arg:tt)*) => {{
        let errno = $crate::ErrnoGuard::save();
        $failures.fatal(
            $status,
            &$crate::Record::new(
                $crate::Level::Fatal,
                $crate::__verbatim_args!(($fmt) () $($arg)*),
            )
            .with_os_error(errno.saved()),
        )
    }};
}

/// Reports a violated invariant and aborts the process.
#[macro_export]
macro_rules! log_panic {
    ($failures:expr, $fmt:literal $($arg:tt)*) => {{
        let errno = $crate::ErrnoGuard::save();
        $failures.panic(
            &$crate::Record::new(
                $crate::Level::Panic,
                $crate::__verbatim_args!(($fmt) () $($arg)*),
            )
            .with_os_error(errno.saved()),
        )
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_level {
    ($failures:expr, $level:expr, $fmt:literal $($arg:tt)*) => {{
        let errno = $crate::ErrnoGuard::save();
        $failures.log(
            &$crate::Record::new($level, $crate::__verbatim_args!(($fmt) () $($arg)*))
                .with_os_error(errno.saved()),
        );
    }};
}

// Builds `format_args!` with every explicit argument wrapped in `Verbatim`.
#[doc(hidden)]
#[macro_export]
macro_rules! __verbatim_args {
    (($fmt:literal) ($($out:tt)*)) => {
        format_args!($fmt $($out)*)
    };
    (($fmt:literal) ($($out:tt)*) ,) => {
        format_args!($fmt $($out)*)
    };
    (($fmt:literal) ($($out:tt)*) , $name:ident = $value:expr $(, $($rest:tt)*)?) => {
        $crate::__verbatim_args!(
            ($fmt) ($($out)* , $name = $crate::Verbatim(&$value)) $(, $($rest)*)?
        )
    };
    (($fmt:literal) ($($out:tt)*) , $value:expr $(, $($rest:tt)*)?) => {
        $crate::__verbatim_args!(
            ($fmt) ($($out)* , $crate::Verbatim(&$value)) $(, $($rest)*)?
        )
    };
}
