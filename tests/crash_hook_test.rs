mod common;

use common::{NEVER, RecordingTransport, fixed_environment};
use rask_client_logger::{Logger, LoggerConfig, Severity};

#[tokio::test]
async fn test_panic_is_recorded_as_crash() {
    let logger = Logger::builder(
        LoggerConfig::new("http://collector.test/logs").with_intervals(NEVER, NEVER),
    )
    .environment(fixed_environment())
    .transport(RecordingTransport::new())
    .spill_store(common::MemorySpillStore::new())
    .register()
    .unwrap();
    logger.install_crash_hook();

    let result = std::thread::spawn(|| {
        panic!("worker exploded");
    })
    .join();
    assert!(result.is_err());

    let snapshot = logger.snapshot();
    assert_eq!(snapshot.level(), Severity::Crash);
    let entry = &snapshot.logs()[0];
    assert_eq!(entry.level, Severity::Crash);
    assert_eq!(entry.message, "worker exploded");
    assert!(entry.description.as_deref().unwrap().contains("crash_hook_test.rs"));
    assert!(entry.stacktrace.is_some());
    logger.unregister();
}
