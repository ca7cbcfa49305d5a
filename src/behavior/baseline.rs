//! Built-in root behavior.
//!
//! Gives every field of every concrete key a value, so a lookup through any
//! behavior tree only yields an unset field when the consumer asked about a
//! field it must default itself.

use std::time::Duration;

use super::BehaviorBuilder;
use super::BehaviorNode;
use super::NodeOrigin;
use crate::constants::ROOT_BEHAVIOR;
use crate::selector::Patch;
use crate::selector::Selector;
use crate::settings::CommitLevel;
use crate::settings::ReadModeAp;
use crate::settings::ReadModeSc;
use crate::settings::Replica;

pub(crate) fn baseline_builder() -> BehaviorBuilder {
    let mut b = BehaviorBuilder::new(ROOT_BEHAVIOR).origin(NodeOrigin::Builtin);
    b.on(Selector::all(), |p| {
        p.total_timeout(Duration::from_secs(1))
            .socket_timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(1))
            .timeout_delay(Duration::ZERO)
            .sleep_between_retries(Duration::ZERO)
            .max_attempts(3)
            .replica(Replica::Sequence)
            .send_key(false)
            .use_compression(false);
    })
    .on(Selector::all().writes().non_retryable(), |p| {
        p.max_attempts(1);
    })
    .on(Selector::all().writes(), |p| {
        p.durable_delete(false);
    })
    .on(Selector::all().writes().availability(), |p| {
        p.commit_level(CommitLevel::All);
    })
    .on(Selector::all().batch(), |p| {
        p.max_concurrent_nodes(1)
            .allow_inline(true)
            .allow_inline_ssd(false)
            .respond_all_keys(true);
    })
    .on(Selector::all().query(), |p| {
        p.total_timeout(Duration::ZERO)
            .record_queue_size(5000)
            .max_records(0);
    })
    .on(Selector::all().reads(), |p| {
        p.reset_ttl_percent(0);
    })
    .on(Selector::all().reads().availability(), |p| {
        p.read_mode_ap(ReadModeAp::One);
    })
    .on(Selector::all().reads().consistency(), |p| {
        p.read_mode_sc(ReadModeSc::Session);
    });
    b
}

/// Baseline patches, for layering a document-defined root on top
pub(crate) fn baseline_patches() -> Vec<Patch> {
    baseline_builder().build().patches().to_vec()
}

pub(crate) fn root_behavior() -> BehaviorNode {
    baseline_builder().build()
}
