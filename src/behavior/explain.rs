use std::fmt::Write;

use super::BehaviorNode;
use super::ResolvedMatrix;
use crate::settings::SettingsRecord;

fn render_record(record: &SettingsRecord) -> String {
    let fields: Vec<String> = record
        .set_fields()
        .into_iter()
        .filter_map(|f| record.field_value(f).map(|v| format!("{f}={v}")))
        .collect();
    if fields.is_empty() {
        "(nothing set)".to_string()
    } else {
        fields.join(", ")
    }
}

/// Human-readable dump of a node's ordered patches and its resolved matrix
pub fn explain(
    node: &BehaviorNode,
    matrix: &ResolvedMatrix,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "behavior '{}' (parent: {}, origin: {:?})",
        node.name(),
        node.parent().unwrap_or("-"),
        node.origin()
    );

    let _ = writeln!(out, "patches:");
    if node.patches().is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (i, patch) in node.patches().iter().enumerate() {
        let _ = writeln!(
            out,
            "  #{} {}: {}",
            i + 1,
            patch.selector(),
            render_record(patch.settings())
        );
    }

    let _ = writeln!(out, "resolved:");
    for (key, record) in matrix.iter() {
        let _ = writeln!(out, "  {}: {}", key, render_record(record));
    }
    out
}
