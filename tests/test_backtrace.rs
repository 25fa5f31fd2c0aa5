
use failure_log::{log_fatal_status, log_panic, Failures, FatalStatus};
use std::os::unix::process::ExitStatusExt;

#[test]
fn test_backtrace_after_panic() {
    if let Some(path) = test_utils::child_log_path() {
        let failures = Failures::new();
        failures.open_log_file(&path, None).unwrap();
        log_panic!(failures, "invariant violated: {}", 42);
    }

    let dir = temp_dir::TempDir::new().unwrap();
    let path = dir.path().join("panic.log");
    let output = test_utils::spawn_with_log(0, "test_backtrace_after_panic", &path);
    assert_eq!(output.status.signal(), Some(nix::libc::SIGABRT));

    let log = std::fs::read_to_string(&path).unwrap();
    assert!(
        log.starts_with("Panic: invariant violated: 42\nError: Raw backtrace: "),
        "unexpected log content:\n{log}"
    );
}

#[test]
fn test_backtrace_when_out_of_memory() {
    if let Some(path) = test_utils::child_log_path() {
        let failures = Failures::new();
        failures.open_log_file(&path, None).unwrap();
        log_fatal_status!(failures, FatalStatus::OUT_OF_MEMORY, "cannot allocate {} bytes", 4096);
    }

    let dir = temp_dir::TempDir::new().unwrap();
    let path = dir.path().join("oom.log");
    let output = test_utils::spawn_with_log(0, "test_backtrace_when_out_of_memory", &path);
    assert_eq!(output.status.code(), Some(83));

    let log = std::fs::read_to_string(&path).unwrap();
    assert!(
        log.starts_with("Fatal: cannot allocate 4096 bytes\nError: Raw backtrace: "),
        "unexpected log content:\n{log}"
    );
}

#[test]
fn test_no_backtrace_for_plain_fatal() {
    if let Some(path) = test_utils::child_log_path() {
        let failures = Failures::new();
        failures.open_log_file(&path, None).unwrap();
        log_fatal_status!(failures, FatalStatus::new(5), "configuration broken");
    }

    let dir = temp_dir::TempDir::new().unwrap();
    let path = dir.path().join("fatal.log");
    let output = test_utils::spawn_with_log(0, "test_no_backtrace_for_plain_fatal", &path);
    assert_eq!(output.status.code(), Some(5));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Fatal: configuration broken\n"
    );
}
