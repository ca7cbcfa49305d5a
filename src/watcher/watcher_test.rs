use std::io;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tracing_test::traced_test;

use super::*;
use crate::constants::ROOT_BEHAVIOR;
use crate::loader::MockDocumentSource;
use crate::selector::ConsistencyMode;
use crate::selector::OperationKind;
use crate::selector::OperationShape;
use crate::WatcherConfig;

const V1: &str = "svc:\n  all_operations:\n    max_attempts: 5\n";
const V2: &str = "svc:\n  all_operations:\n    max_attempts: 6\n";

fn fast_config() -> EngineConfig {
    EngineConfig {
        watcher: WatcherConfig {
            debounce_in_ms: 100,
            io_retry_interval_in_ms: 100,
            event_channel_capacity: 8,
        },
        ..Default::default()
    }
}

fn write_document(
    dir: &TempDir,
    text: &str,
) -> PathBuf {
    let path = dir.path().join("behaviors.yml");
    std::fs::write(&path, text).unwrap();
    path
}

fn svc_attempts(registry: &Registry) -> Option<u32> {
    registry
        .get_settings(
            "svc",
            OperationKind::Read,
            OperationShape::Point,
            ConsistencyMode::Availability,
        )
        .ok()
        .and_then(|r| r.max_attempts)
}

/// Polls `condition` for up to five seconds
async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_loads_document_and_stop_releases_task() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();

    let mut watcher = ConfigWatcher::start(registry.clone(), &path, &fast_config()).unwrap();
    assert!(watcher.is_active());
    assert_eq!(watcher.reload_count(), 1);
    assert_eq!(watcher.location(), path.as_path());
    assert_eq!(svc_attempts(&registry), Some(5));

    watcher.stop().await.unwrap();
    assert!(!watcher.is_active());
    watcher.stop().await.unwrap();
    assert!(matches!(
        watcher.force_reload().await,
        Err(Error::Watch(WatchError::Stopped))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_change_triggers_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();
    let mut watcher = ConfigWatcher::start(registry.clone(), &path, &fast_config()).unwrap();

    write_document(&dir, V2);
    assert!(eventually(|| svc_attempts(&registry) == Some(6)).await);

    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_of_changes_reloads_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();
    let mut config = fast_config();
    config.watcher.debounce_in_ms = 300;
    let mut watcher = ConfigWatcher::start(registry.clone(), &path, &config).unwrap();

    for _ in 0..5 {
        watcher.notify_changed();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(watcher.reload_count(), 1);

    assert!(eventually(|| watcher.reload_count() == 2).await);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(watcher.reload_count(), 2);

    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_broken_document_keeps_active_behaviors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();
    let mut watcher = ConfigWatcher::start(registry.clone(), &path, &fast_config()).unwrap();

    write_document(&dir, "svc:\n  all_operations:\n    total_timeout: 10xyz\n");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(svc_attempts(&registry), Some(5));
    assert_eq!(watcher.reload_count(), 1);
    assert!(watcher.is_active());

    assert!(matches!(
        watcher.force_reload().await,
        Err(Error::Document(DocumentError::Malformed(_)))
    ));

    write_document(&dir, V2);
    assert!(eventually(|| svc_attempts(&registry) == Some(6)).await);

    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[traced_test]
async fn test_unknown_parent_is_logged_once_per_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();
    let mut watcher = ConfigWatcher::start(registry.clone(), &path, &fast_config()).unwrap();

    write_document(&dir, "svc:\n  parent: ghost\n  all_operations:\n    max_attempts: 6\n");
    assert!(eventually(|| svc_attempts(&registry) == Some(6)).await);
    watcher.stop().await.unwrap();

    assert!(logs_contain("behavior document reloaded"));
    logs_assert(|lines: &[&str]| {
        let count = |needle: &str| lines.iter().filter(|line| line.contains(needle)).count();
        let warnings = count("unknown parent, attaching to root");
        // One write may still settle into more than one reload; each warns once
        let reloads = count("behavior document reloaded");
        if warnings == 0 || warnings != reloads {
            return Err(format!("{warnings} unknown-parent warnings for {reloads} reloads"));
        }
        Ok(())
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_force_reload_skips_debounce() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();
    let mut config = fast_config();
    config.watcher.debounce_in_ms = 60_000;
    let mut watcher = ConfigWatcher::start(registry.clone(), &path, &config).unwrap();

    write_document(&dir, V2);
    let report = watcher.force_reload().await.unwrap();
    assert_eq!(report.installed, vec!["svc"]);
    assert_eq!(svc_attempts(&registry), Some(6));

    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_io_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("behaviors.yml");
    let calls = Arc::new(AtomicUsize::new(0));

    let mut source = MockDocumentSource::new();
    source.expect_location().return_const(location);
    let counter = calls.clone();
    source.expect_read().returning(move || match counter.fetch_add(1, Ordering::SeqCst) {
        0 => Ok(V1.to_string()),
        1 | 2 => Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        _ => Ok(V2.to_string()),
    });

    let registry = Registry::new();
    let mut watcher = ConfigWatcher::start_with_source(registry.clone(), Arc::new(source), &fast_config()).unwrap();
    assert_eq!(svc_attempts(&registry), Some(5));

    // One change, two failed reads, then the retry succeeds without another change
    watcher.notify_changed();
    assert!(eventually(|| svc_attempts(&registry) == Some(6)).await);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(watcher.is_active());

    watcher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_fails_when_initial_load_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, "svc:\n  parent: svc\n");
    let registry = Registry::new();

    let result = ConfigWatcher::start(registry.clone(), &path, &fast_config());
    assert!(matches!(
        result,
        Err(Error::Document(DocumentError::CyclicParent { .. }))
    ));
    assert_eq!(registry.names(), vec![ROOT_BEHAVIOR]);

    let missing = ConfigWatcher::start(registry, dir.path().join("missing.yml"), &fast_config());
    assert!(matches!(
        missing,
        Err(Error::Document(DocumentError::Read { .. }))
    ));
}

#[tokio::test]
async fn test_start_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let mut config = fast_config();
    config.watcher.debounce_in_ms = 0;

    let result = ConfigWatcher::start(Registry::new(), &path, &config);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_registry_start_watching() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, V1);
    let registry = Registry::new();

    let mut watcher = registry
        .start_watching(&path, Some(Duration::from_millis(50)))
        .unwrap();
    assert!(registry.contains("svc"));

    write_document(&dir, V2);
    assert!(eventually(|| svc_attempts(&registry) == Some(6)).await);

    watcher.stop().await.unwrap();
    drop(watcher);
}

#[test]
fn test_split_location() {
    let (dir, name) = split_location(Path::new("/etc/app/behaviors.yml")).unwrap();
    assert_eq!(dir, PathBuf::from("/etc/app"));
    assert_eq!(name, "behaviors.yml");

    let (dir, _) = split_location(Path::new("behaviors.yml")).unwrap();
    assert_eq!(dir, PathBuf::from("."));

    assert!(matches!(
        split_location(Path::new("/")),
        Err(Error::Watch(WatchError::InvalidLocation(_)))
    ));
}
