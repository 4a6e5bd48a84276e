mod common;

use common::{MemorySpillStore, NEVER, RecordingTransport, fixed_environment};
use rask_client_logger::reliability::ConnectivityFlag;
use rask_client_logger::{Logger, LoggerConfig};
use std::sync::Arc;

fn logger(
    connectivity: Arc<ConnectivityFlag>,
    transport: Arc<RecordingTransport>,
    store: Arc<MemorySpillStore>,
) -> Logger {
    Logger::builder(LoggerConfig::new("http://collector.test/logs").with_intervals(NEVER, NEVER))
        .environment(fixed_environment())
        .connectivity(connectivity)
        .transport(transport)
        .spill_store(store)
        .register()
        .unwrap()
}

#[tokio::test]
async fn test_removes_exactly_the_deletable_files() {
    let store = MemorySpillStore::new();
    let transport = RecordingTransport::new();
    let connectivity = Arc::new(ConnectivityFlag::new(false));
    let logger = logger(connectivity.clone(), transport.clone(), store.clone());

    for n in 1..=3 {
        logger.error(&format!("offline failure {n}"), None);
        let outcome = logger.flush_now().drain.unwrap().await.unwrap();
        assert!(outcome.is_spilled());
    }
    assert_eq!(
        store.names(),
        ["logs (2).txt", "logs (3).txt", "logs.txt"].map(String::from)
    );
    assert!(transport.payloads().is_empty());
    store.refuse_delete("logs (2).txt");

    connectivity.set_connected(true);
    let tick = logger.flush_now();
    assert!(tick.drain.is_none());
    let report = tick.backlog.unwrap().await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.retained, ["logs (2).txt".to_string()]);
    assert_eq!(store.names(), ["logs (2).txt".to_string()]);
    assert_eq!(transport.payloads().len(), 3);
    let descriptions: Vec<String> = transport
        .batches()
        .iter()
        .flat_map(|b| b.log.iter().filter_map(|l| l.description.clone()))
        .collect();
    for n in 1..=3 {
        assert!(descriptions.contains(&format!("offline failure {n}")));
    }

    let again = logger.flush_now().backlog.unwrap().await.unwrap();
    assert_eq!(again.attempted, 1);
    assert_eq!(transport.payloads().len(), 4);
    logger.unregister();
}

#[tokio::test]
async fn test_send_failure_still_deletes() {
    let store = MemorySpillStore::new();
    store.insert("logs.txt", "{}");
    let transport = RecordingTransport::new();
    transport.set_failing(true);

    let logger = logger(
        Arc::new(ConnectivityFlag::new(true)),
        transport.clone(),
        store.clone(),
    );
    let report = logger.flush_now().backlog.unwrap().await.unwrap();

    assert_eq!(report.delivered, 0);
    assert_eq!(report.deleted, ["logs.txt".to_string()]);
    assert!(store.names().is_empty());
    logger.unregister();
}

#[tokio::test]
async fn test_offline_leaves_backlog_alone() {
    let store = MemorySpillStore::new();
    store.insert("logs.txt", "{}");
    let logger = logger(
        Arc::new(ConnectivityFlag::new(false)),
        RecordingTransport::new(),
        store.clone(),
    );

    assert!(logger.flush_now().backlog.is_none());
    assert_eq!(store.names(), ["logs.txt".to_string()]);
    logger.unregister();
}

#[tokio::test]
async fn test_foreign_files_are_ignored_on_disk() {
    use rask_client_logger::reliability::{FileSpillStore, SpillStore};

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{}").unwrap();
    let spill = Arc::new(FileSpillStore::at(dir.path()));
    spill.write_batch("{\"n\":1}").await.unwrap();

    let transport = RecordingTransport::new();
    let logger = Logger::builder(
        LoggerConfig::new("http://collector.test/logs")
            .with_intervals(NEVER, NEVER)
            .with_storage_path(dir.path()),
    )
    .environment(fixed_environment())
    .transport(transport.clone())
    .register()
    .unwrap();

    let report = logger.flush_now().backlog.unwrap().await.unwrap();
    assert_eq!(report.deleted, ["logs.txt".to_string()]);
    assert!(dir.path().join("settings.json").exists());
    assert_eq!(spill.list().await.unwrap().len(), 0);
    logger.unregister();
}
