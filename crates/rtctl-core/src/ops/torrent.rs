//! Per-torrent field table.

use crate::batch::{BatchScope, compile_batch};
use crate::descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors, target};
use crate::error::RpcResult;
use crate::registry::registry;
use crate::value::Value;

/// `(field, getter, extra params)` for every scalar torrent field, in record order.
const SCALAR_FIELDS: &[(&str, &str, &[&str])] = &[
    ("hash", "d.hash", &[]),
    ("name", "d.name", &[]),
    ("label", "d.custom1", &[]),
    ("ratio", "d.ratio", &[]),
    ("ratio_group", "d.views", &[]),
    ("priority", "d.priority", &[]),
    ("priority_str", "d.priority_str", &[]),
    ("seeding_time", "d.custom", &["seedingtime"]),
    ("file_count", "d.size_files", &[]),
    ("comment", "d.custom2", &[]),
    ("bytes_done", "d.bytes_done", &[]),
    ("bytes_left", "d.left_bytes", &[]),
    ("bytes_total", "d.size_bytes", &[]),
    ("bytes_chunk_size", "d.size_chunks", &[]),
    ("hashing", "d.hashing", &[]),
    ("hashing_checked", "d.is_hash_checked", &[]),
    ("hashing_checking", "d.is_hash_checking", &[]),
    ("state", "d.state", &[]),
    ("state_is_active", "d.is_active", &[]),
    ("state_is_open", "d.is_open", &[]),
    ("state_counter", "d.state_counter", &[]),
    ("state_changed", "d.state_changed", &[]),
    ("peers_complete", "d.peers_complete", &[]),
    ("peers_accounted", "d.peers_accounted", &[]),
    ("peers_connected", "d.peers_connected", &[]),
    ("peers_max", "d.peers_max", &[]),
    ("peers_min", "d.peers_min", &[]),
    ("peers_not_connected", "d.peers_not_connected", &[]),
    ("upload_speed", "d.up.rate", &[]),
    ("upload_total", "d.up.total", &[]),
    ("download_speed", "d.down.rate", &[]),
    ("download_total", "d.down.total", &[]),
    ("base_parent_path", "d.directory", &[]),
    ("base_path", "d.base_path", &[]),
    ("base_filename", "d.base_filename", &[]),
    ("loaded_file", "d.loaded_file", &[]),
    ("is_complete", "d.complete", &[]),
    ("is_active", "d.is_active", &[]),
    ("is_incomplete", "d.incomplete", &[]),
    ("is_private", "d.is_private", &[]),
    ("is_multi_file", "d.is_multi_file", &[]),
    ("connection_current", "d.connection_current", &[]),
    ("timestamp_created", "d.creation_date", &[]),
    ("timestamp_added", "d.load_date", &[]),
    ("timestamp_started", "d.timestamp.started", &[]),
    ("timestamp_finished", "d.timestamp.finished", &[]),
];

/// Every field of one torrent, scalar fields first, then the nested groups.
///
/// With `hash` unset the descriptors form a template for [`compile_batch`].
#[must_use]
pub fn torrent_fields(hash: Option<&str>, selection: &FieldSelection) -> Vec<MethodDescriptor> {
    let scalars = SCALAR_FIELDS.iter().map(|&(field, getter, extra)| {
        let mut params = Vec::with_capacity(1 + extra.len());
        params.push(target(hash));
        params.extend(extra.iter().copied().map(Value::str));
        (field, WireCall::new(getter, params))
    });
    let groups = registry().groups().map(|group| {
        let mut params = vec![target(hash), Value::str("")];
        params.extend(group.getters().map(Value::str));
        (group.name(), WireCall::new(group.multicall(), params))
    });
    build_descriptors(scalars.chain(groups), selection)
}

/// One batched descriptor fetching the selected fields of every torrent in scope.
///
/// # Errors
///
/// Propagates ratio-group validation failures from the scope.
pub fn all_torrents(scope: &BatchScope, selection: &FieldSelection) -> RpcResult<MethodDescriptor> {
    compile_batch(&torrent_fields(None, selection), scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BATCH_METHOD;
    use crate::registry::{FILES, PEERS, TRACKERS};

    #[test]
    fn bound_fields_target_the_hash() {
        let fields = torrent_fields(Some("ABC"), &FieldSelection::all());
        assert_eq!(fields.len(), SCALAR_FIELDS.len() + 3);
        assert_eq!(SCALAR_FIELDS.len(), 46);
        assert!(fields.iter().all(|d| d.params[0] == Value::str("ABC")));

        let seeding = fields
            .iter()
            .find(|d| d.key == "seeding_time")
            .expect("seeding_time descriptor");
        assert_eq!(seeding.wire_method, "d.custom");
        assert_eq!(seeding.params[1], Value::str("seedingtime"));

        let tail: Vec<_> = fields[46..].iter().map(|d| d.key.as_str()).collect();
        assert_eq!(tail, vec![TRACKERS, FILES, PEERS]);
        let files = &fields[47];
        assert_eq!(files.wire_method, "f.multicall");
        assert_eq!(files.params[1], Value::str(""));
        assert_eq!(files.params[2], Value::str("f.path="));
        assert_eq!(files.params.len(), 2 + 8);
    }

    #[test]
    fn batched_torrents_skip_excluded_groups() -> RpcResult<()> {
        let selection = FieldSelection::all()
            .excluding(TRACKERS)
            .excluding(FILES)
            .excluding(PEERS);
        let batch = all_torrents(&BatchScope::view("complete"), &selection)?;
        assert_eq!(batch.wire_method, BATCH_METHOD);
        assert_eq!(batch.params[1], Value::str("complete"));
        assert_eq!(batch.sub_field_keys.as_ref().map(Vec::len), Some(46));
        assert_eq!(batch.params[2], Value::str("d.hash="));
        assert!(
            batch
                .params
                .iter()
                .any(|p| *p == Value::str("d.custom=seedingtime"))
        );
        Ok(())
    }
}
