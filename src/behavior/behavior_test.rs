use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::constants::ROOT_BEHAVIOR;
use crate::selector::ConsistencyMode;
use crate::selector::OperationKey;
use crate::selector::OperationKind;
use crate::selector::OperationShape;
use crate::selector::Patch;
use crate::selector::Selector;
use crate::selector::SelectorSpec;
use crate::settings::Replica;
use crate::settings::SettingsField;
use crate::settings::SettingsRecord;

fn key(
    kind: OperationKind,
    shape: OperationShape,
    mode: ConsistencyMode,
) -> OperationKey {
    OperationKey::new(kind, shape, mode).unwrap()
}

fn row<'a>(
    matrix: &'a ResolvedMatrix,
    kind: OperationKind,
    shape: OperationShape,
    mode: ConsistencyMode,
) -> &'a SettingsRecord {
    matrix.get(&key(kind, shape, mode)).unwrap()
}

#[test]
fn test_later_patch_overrides_only_the_fields_it_sets() {
    let mut builder = BehaviorBuilder::new("svc");
    builder
        .on(Selector::all(), |p| {
            p.max_attempts(2)
                .total_timeout(Duration::from_millis(250))
                .send_key(true);
        })
        .on(Selector::all().writes().retryable().point(), |p| {
            p.max_attempts(9);
        });
    let node = builder.build();
    let matrix = resolve(None, node.patches());

    let record = row(
        &matrix,
        OperationKind::WriteRetryable,
        OperationShape::Point,
        ConsistencyMode::Consistency,
    );
    assert_eq!(record.max_attempts, Some(9));
    assert_eq!(record.total_timeout, Some(Duration::from_millis(250)));
    assert_eq!(record.send_key, Some(true));

    let untouched = row(
        &matrix,
        OperationKind::WriteNonRetryable,
        OperationShape::Point,
        ConsistencyMode::Consistency,
    );
    assert_eq!(untouched.max_attempts, Some(2));
}

#[test]
fn test_unset_fields_never_clear_parent_values() {
    let parent = resolve(None, root_behavior().patches());

    let mut builder = BehaviorBuilder::new("child");
    builder.on(Selector::all().reads(), |p| {
        p.socket_timeout(Duration::from_secs(5));
    });
    let child = resolve(Some(&parent), builder.build().patches());

    for (key, record) in child.iter() {
        let inherited = parent.get(&key).unwrap();
        assert_eq!(record.max_attempts, inherited.max_attempts, "{key}");
        assert_eq!(record.replica, inherited.replica, "{key}");
        if key.kind() == OperationKind::Read {
            assert_eq!(record.socket_timeout, Some(Duration::from_secs(5)));
        } else {
            assert_eq!(record.socket_timeout, inherited.socket_timeout);
        }
    }
}

#[test]
fn test_resolution_is_deterministic() {
    let root = root_behavior();
    let first = resolve(None, root.patches());
    let second = resolve(None, root.patches());
    assert_eq!(first, second);
}

#[test]
fn test_child_without_patches_equals_parent() {
    let parent = resolve(None, root_behavior().patches());
    let child = BehaviorBuilder::new("empty").build();
    assert!(child.patches().is_empty());
    assert_eq!(resolve(Some(&parent), child.patches()), parent);
}

#[test]
fn test_scenario_child_overrides_retryable_point_writes_only() {
    let mut root = BehaviorBuilder::new(ROOT_BEHAVIOR);
    root.on(Selector::all(), |p| {
        p.max_attempts(3);
    })
    .on(Selector::all().reads().batch(), |p| {
        p.max_concurrent_nodes(1);
    });
    let root_matrix = resolve(None, root.build().patches());

    let mut child = BehaviorBuilder::new("child");
    child.on(Selector::all().writes().retryable().point(), |p| {
        p.max_attempts(7);
    });
    let child_matrix = resolve(Some(&root_matrix), child.build().patches());

    let write = row(
        &child_matrix,
        OperationKind::WriteRetryable,
        OperationShape::Point,
        ConsistencyMode::Availability,
    );
    assert_eq!(write.max_attempts, Some(7));

    let read = row(
        &child_matrix,
        OperationKind::Read,
        OperationShape::Batch,
        ConsistencyMode::Availability,
    );
    assert_eq!(read.max_attempts, Some(3));
    assert_eq!(read.max_concurrent_nodes, Some(1));
}

#[test]
fn test_patch_on_ap_writes_leaves_reads_and_cp_writes_alone() {
    let mut builder = BehaviorBuilder::new("ap");
    builder.on(Selector::all().writes().availability(), |p| {
        p.durable_delete(true);
    });
    let matrix = resolve(None, builder.build().patches());

    for (key, record) in matrix.iter() {
        let expected = key.kind().is_write() && key.mode() == ConsistencyMode::Availability;
        assert_eq!(record.durable_delete.is_some(), expected, "{key}");
    }
}

#[test]
fn test_baseline_sets_every_field_a_key_can_carry() {
    let matrix = resolve(None, root_behavior().patches());

    for (key, record) in matrix.iter() {
        let exact = SelectorSpec::new(key.kind(), key.shape(), key.mode());
        for field in SettingsField::ALL {
            assert_eq!(
                record.is_set(field),
                exact.permits(field),
                "{field} on {key}"
            );
        }
    }
}

#[test]
fn test_baseline_values() {
    let matrix = resolve(None, root_behavior().patches());

    let point_read = row(
        &matrix,
        OperationKind::Read,
        OperationShape::Point,
        ConsistencyMode::Availability,
    );
    assert_eq!(point_read.max_attempts, Some(3));
    assert_eq!(point_read.replica, Some(Replica::Sequence));
    assert_eq!(point_read.total_timeout, Some(Duration::from_secs(1)));

    let non_retryable = row(
        &matrix,
        OperationKind::WriteNonRetryable,
        OperationShape::Batch,
        ConsistencyMode::Consistency,
    );
    assert_eq!(non_retryable.max_attempts, Some(1));

    let query = row(
        &matrix,
        OperationKind::Read,
        OperationShape::Query,
        ConsistencyMode::Consistency,
    );
    assert_eq!(query.record_queue_size, Some(5000));
    assert_eq!(query.total_timeout, Some(Duration::ZERO));
}

#[test]
fn test_builder_defaults_parent_to_root() {
    assert_eq!(BehaviorBuilder::new("x").build().parent(), Some(ROOT_BEHAVIOR));
    assert_eq!(BehaviorBuilder::new(ROOT_BEHAVIOR).build().parent(), None);
    assert_eq!(
        BehaviorBuilder::new("x").parent("y").build().parent(),
        Some("y")
    );
}

#[test]
fn test_builder_skips_empty_patches() {
    let mut builder = BehaviorBuilder::new("x");
    builder.on(Selector::all().batch(), |_| {});
    assert!(builder.build().patches().is_empty());
}

#[test]
fn test_builder_accepts_checked_patches() {
    let mut settings = SettingsRecord::new();
    settings.max_records = Some(10);
    let spec = Selector::all().query().spec();
    let patch = Patch::try_new(spec, settings).unwrap();

    let mut builder = BehaviorBuilder::new("x");
    builder.push(patch);
    assert_eq!(builder.build().patches(), &[patch]);
}

#[test]
fn test_publish_discards_matrix_after_invalidation() {
    let node = BehaviorBuilder::new("x").build();
    let matrix = Arc::new(ResolvedMatrix::default());

    let epoch = node.epoch();
    assert!(node.publish(matrix.clone(), epoch));
    assert!(node.cached().is_some());

    let stale = node.epoch();
    node.invalidate();
    assert!(node.cached().is_none());
    assert!(!node.publish(matrix, stale));
    assert!(node.cached().is_none());
}

#[test]
fn test_explain_lists_patches_and_rows() {
    let mut builder = BehaviorBuilder::new("svc");
    builder.on(Selector::all().reads().batch(), |p| {
        p.max_concurrent_nodes(4);
    });
    let node = builder.build();
    let matrix = resolve(None, node.patches());

    let text = explain(&node, &matrix);
    assert!(text.contains("behavior 'svc' (parent: default"));
    assert!(text.contains("#1 read/batch/any: max_concurrent_nodes=4"));
    assert!(text.contains("read/batch/ap: max_concurrent_nodes=4"));
    assert!(text.contains("read/point/ap: (nothing set)"));
    assert_eq!(text.lines().filter(|l| l.starts_with("  ") && !l.starts_with("  #")).count(), 14);
}

#[test]
fn test_validate_reports_first_out_of_range_patch() {
    let mut builder = BehaviorBuilder::new("svc");
    builder
        .on(Selector::all(), |p| {
            p.max_attempts(2);
        })
        .on(Selector::all().reads(), |p| {
            p.reset_ttl_percent(150);
        })
        .on(Selector::all(), |p| {
            p.max_attempts(0);
        });
    let node = builder.build();

    let invalid = node.validate().unwrap_err();
    assert_eq!(invalid.field, SettingsField::ResetTtlPercent);
    assert!(BehaviorBuilder::new("ok").build().validate().is_ok());
}
