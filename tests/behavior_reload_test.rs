use std::path::Path;
use std::time::Duration;

use behavior_engine::ConsistencyMode;
use behavior_engine::DocumentError;
use behavior_engine::DynamicConfigLoader;
use behavior_engine::EngineConfig;
use behavior_engine::Error;
use behavior_engine::OperationKind;
use behavior_engine::OperationShape;
use behavior_engine::Registry;
use behavior_engine::Selector;
use behavior_engine::SettingsRecord;
use behavior_engine::ROOT_BEHAVIOR;

const DOCUMENT_V1: &str = r#"
default:
  all_operations:
    max_attempts: 3
  batch_reads:
    max_concurrent_nodes: 1
reporting:
  parent: default
  query:
    record_queue_size: 20000
    total_timeout: 2m
"#;

const DOCUMENT_V2: &str = r#"
default:
  all_operations:
    max_attempts: 8
  batch_reads:
    max_concurrent_nodes: 1
reporting:
  parent: default
  query:
    record_queue_size: 500
"#;

fn write(
    path: &Path,
    text: &str,
) {
    std::fs::write(path, text).expect("write behavior document");
}

fn read_batch_ap(
    registry: &Registry,
    name: &str,
) -> SettingsRecord {
    registry
        .get_settings(
            name,
            OperationKind::Read,
            OperationShape::Batch,
            ConsistencyMode::Availability,
        )
        .expect("settings")
}

async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[test]
fn test_child_override_leaves_inherited_rows_alone() {
    let registry = Registry::new();
    DynamicConfigLoader::default()
        .load_str(DOCUMENT_V1, &registry)
        .expect("load");

    let child = registry
        .behavior(ROOT_BEHAVIOR)
        .expect("root")
        .derive_with_changes("child", |b| {
            b.on(Selector::all().writes().retryable().point(), |p| {
                p.max_attempts(7);
            });
        })
        .expect("derive");

    let write = child
        .get_settings(
            OperationKind::WriteRetryable,
            OperationShape::Point,
            ConsistencyMode::Availability,
        )
        .expect("settings");
    assert_eq!(write.max_attempts, Some(7));

    let read = read_batch_ap(&registry, "child");
    assert_eq!(read.max_attempts, Some(3));
    assert_eq!(read.max_concurrent_nodes, Some(1));

    let explained = child.explain().expect("explain");
    assert!(explained.contains("write_retryable/point/any: max_attempts=7"));
}

#[test]
fn test_malformed_reload_leaves_previous_behaviors() {
    let registry = Registry::new();
    let loader = DynamicConfigLoader::default();
    loader.load_str(DOCUMENT_V1, &registry).expect("load");
    let before = registry.matrix_for("reporting").expect("matrix");

    let broken = DOCUMENT_V1.replace("2m", "10xyz");
    let result = loader.load_str(&broken, &registry);
    assert!(matches!(
        result,
        Err(Error::Document(DocumentError::Malformed(_)))
    ));
    assert_eq!(*registry.matrix_for("reporting").expect("matrix"), *before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_derive_watch_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("behaviors.yml");
    write(&path, DOCUMENT_V1);

    let registry = Registry::new();
    let mut config = EngineConfig::default();
    config.watcher.debounce_in_ms = 100;
    let mut watcher = behavior_engine::ConfigWatcher::start(registry.clone(), &path, &config).expect("start");

    // A programmatic behavior below a document-defined one
    let adhoc = registry
        .behavior("reporting")
        .expect("reporting")
        .derive_with_changes("adhoc", |b| {
            b.on(Selector::all().query(), |p| {
                p.max_records(100);
            });
        })
        .expect("derive");

    let query = |registry: &Registry| {
        registry
            .get_settings(
                "adhoc",
                OperationKind::Read,
                OperationShape::Query,
                ConsistencyMode::Consistency,
            )
            .expect("settings")
    };
    let before = query(&registry);
    assert_eq!(before.record_queue_size, Some(20000));
    assert_eq!(before.total_timeout, Some(Duration::from_secs(120)));
    assert_eq!(before.max_records, Some(100));
    assert_eq!(before.max_attempts, Some(3));

    write(&path, DOCUMENT_V2);
    assert!(eventually(|| query(&registry).record_queue_size == Some(500)).await);

    // Untouched descendant picks up both the new root and the new parent
    let after = query(&registry);
    assert_eq!(after.max_attempts, Some(8));
    assert_eq!(after.total_timeout, Some(Duration::ZERO));
    assert_eq!(after.max_records, Some(100));
    assert_eq!(adhoc.parent().expect("parent").name(), "reporting");
    assert!(registry.contains("adhoc"));

    watcher.stop().await.expect("stop");
    assert!(!watcher.is_active());
}
