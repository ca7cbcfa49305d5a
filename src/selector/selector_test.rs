use std::collections::HashSet;
use std::time::Duration;

use super::*;
use crate::settings::CommitLevel;
use crate::settings::ReadModeSc;
use crate::settings::SettingsField;
use crate::settings::SettingsRecord;

fn keys_of(spec: SelectorSpec) -> Vec<OperationKey> {
    spec.matching_keys().collect()
}

#[test]
fn key_space_has_fourteen_distinct_rows() {
    let indexes: HashSet<usize> = OperationKey::ALL.iter().map(|k| k.index().unwrap()).collect();
    assert_eq!(indexes.len(), KEY_COUNT);
    for (i, key) in OperationKey::ALL.iter().enumerate() {
        assert_eq!(key.index(), Some(i), "{key} is out of place");
    }
}

#[test]
fn operation_key_rejects_wildcards_and_write_queries() {
    assert!(OperationKey::new(OperationKind::Read, OperationShape::Any, ConsistencyMode::Availability).is_none());
    assert!(OperationKey::new(OperationKind::Read, OperationShape::Point, ConsistencyMode::Any).is_none());
    assert!(OperationKey::new(
        OperationKind::WriteRetryable,
        OperationShape::Query,
        ConsistencyMode::Consistency
    )
    .is_none());
    assert!(OperationKey::new(OperationKind::Read, OperationShape::Query, ConsistencyMode::Consistency).is_some());
}

#[test]
fn all_selector_matches_every_key() {
    assert_eq!(keys_of(SelectorSpec::ALL).len(), KEY_COUNT);
}

#[test]
fn all_writes_in_availability_mode_hits_only_ap_write_keys() {
    let spec = Selector::all().writes().availability().spec();
    let keys = keys_of(spec);

    assert_eq!(keys.len(), 4);
    for key in &keys {
        assert!(key.kind().is_write());
        assert_eq!(key.mode(), ConsistencyMode::Availability);
    }
    let shapes: HashSet<_> = keys.iter().map(|k| k.shape()).collect();
    assert_eq!(shapes, HashSet::from([OperationShape::Point, OperationShape::Batch]));
    let kinds: HashSet<_> = keys.iter().map(|k| k.kind()).collect();
    assert_eq!(
        kinds,
        HashSet::from([OperationKind::WriteRetryable, OperationKind::WriteNonRetryable])
    );
}

#[test]
fn narrowing_order_does_not_change_the_spec() {
    let a = Selector::all().reads().batch().availability().spec();
    let b = Selector::all().availability().batch().reads().spec();
    assert_eq!(a, b);
    assert_eq!(
        a,
        SelectorSpec::new(OperationKind::Read, OperationShape::Batch, ConsistencyMode::Availability)
    );
}

#[test]
fn query_narrowing_implies_reads() {
    let spec = Selector::all().query().spec();
    assert_eq!(spec.kind, KindSelector::Exactly(OperationKind::Read));
    assert!(keys_of(spec).iter().all(|k| k.shape() == OperationShape::Query));
    assert_eq!(keys_of(spec).len(), 2);
}

#[test]
fn later_narrowing_overwrites_the_kind() {
    let spec = Selector::all().writes().retryable().non_retryable().spec();
    assert_eq!(spec.kind, KindSelector::Exactly(OperationKind::WriteNonRetryable));
}

#[test]
fn permits_mirrors_field_capabilities() {
    let all = SelectorSpec::ALL;
    let batch_reads = Selector::all().reads().batch().spec();
    let cp_reads = Selector::all().reads().consistency().spec();
    let ap_writes = Selector::all().writes().availability().spec();
    let cp_writes = Selector::all().writes().consistency().spec();

    assert!(all.permits(SettingsField::MaxAttempts));
    assert!(!all.permits(SettingsField::MaxConcurrentNodes));
    assert!(!all.permits(SettingsField::DurableDelete));

    assert!(batch_reads.permits(SettingsField::MaxConcurrentNodes));
    assert!(batch_reads.permits(SettingsField::ResetTtlPercent));
    assert!(!batch_reads.permits(SettingsField::RecordQueueSize));

    assert!(cp_reads.permits(SettingsField::ReadModeSc));
    assert!(!cp_reads.permits(SettingsField::ReadModeAp));

    assert!(ap_writes.permits(SettingsField::CommitLevel));
    assert!(ap_writes.permits(SettingsField::DurableDelete));
    assert!(!cp_writes.permits(SettingsField::CommitLevel));
}

#[test]
fn patch_try_new_rejects_unpermitted_field() {
    let settings = SettingsRecord {
        max_attempts: Some(2),
        max_concurrent_nodes: Some(4),
        ..Default::default()
    };
    let rejected = Patch::try_new(SelectorSpec::ALL, settings).unwrap_err();
    assert_eq!(rejected, SettingsField::MaxConcurrentNodes);

    let batch = Selector::all().batch().spec();
    let patch = Patch::try_new(batch, settings).unwrap();
    assert_eq!(patch.settings().max_concurrent_nodes, Some(4));
}

#[test]
fn patch_builder_setter_called_twice_keeps_last_value() {
    let mut builder = PatchBuilder::new(Selector::all().writes().availability());
    builder
        .max_attempts(2)
        .commit_level(CommitLevel::All)
        .max_attempts(5)
        .total_timeout(Duration::from_millis(20));

    let patch = builder.into_patch().unwrap();
    assert_eq!(patch.settings().max_attempts, Some(5));
    assert_eq!(patch.settings().commit_level, Some(CommitLevel::All));
    assert_eq!(*patch.selector(), Selector::all().writes().availability().spec());
}

#[test]
fn typed_patch_equals_runtime_checked_patch() {
    let mut builder = PatchBuilder::new(Selector::all().reads().consistency());
    builder.read_mode_sc(ReadModeSc::Linearize).send_key(true);
    let typed = builder.into_patch().unwrap();

    let checked = Patch::try_new(
        SelectorSpec::new(OperationKind::Read, OperationShape::Any, ConsistencyMode::Consistency),
        SettingsRecord {
            read_mode_sc: Some(ReadModeSc::Linearize),
            send_key: Some(true),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(typed, checked);
}

#[test]
fn empty_patch_builder_yields_no_patch() {
    let builder = PatchBuilder::new(Selector::all());
    assert!(builder.into_patch().is_none());
}
