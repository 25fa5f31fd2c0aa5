#![cfg(feature = "log_bridge")]

use failure_log::{FailureLogError, Failures, LogBridge};
use log::{debug, error, info, trace, warn};
use std::sync::Arc;

#[test]
fn test_log_bridge() {
    let dir = temp_dir::TempDir::new().unwrap();
    let path = dir.path().join("bridge.log");

    let failures = Arc::new(Failures::new());
    failures.open_log_file(&path, Some("bridge: ")).unwrap();
    LogBridge::install(Arc::clone(&failures), log::LevelFilter::Debug).unwrap();

    error!("error {}", 1);
    warn!("warning {}", 2);
    info!("info {}", 3);
    debug!("debug {}", 4);
    trace!("filtered by the max level");

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "bridge: Error: error 1\n\
         bridge: Warning: warning 2\n\
         bridge: Info: info 3\n\
         bridge: Info: debug 4\n"
    );

    // only one global logger
    assert!(matches!(
        LogBridge::install(Arc::clone(&failures), log::LevelFilter::Info),
        Err(FailureLogError::Log(_))
    ));
}
