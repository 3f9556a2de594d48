//! Lifecycle actions applied to individual torrents or to a whole view.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::batch::{BatchScope, compile_batch};
use crate::descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors, target};
use crate::error::RpcResult;
use crate::value::Value;

/// Lifecycle action understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentAction {
    /// Open and start.
    Start,
    /// Stop without closing.
    Pause,
    /// Start an open, stopped torrent.
    Unpause,
    /// Stop and close.
    Stop,
    /// Re-verify piece hashes.
    CheckHash,
    /// Stop, close and erase from the session.
    Remove,
    /// As [`TorrentAction::Remove`], flagging the payload for deletion first.
    RemoveAndDelete,
}

impl TorrentAction {
    /// Every action, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Start,
        Self::Pause,
        Self::Unpause,
        Self::Stop,
        Self::CheckHash,
        Self::Remove,
        Self::RemoveAndDelete,
    ];

    /// Stable snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Stop => "stop",
            Self::CheckHash => "check_hash",
            Self::Remove => "remove",
            Self::RemoveAndDelete => "remove_and_delete",
        }
    }

    /// Wire methods after the leading `d.hash`, with their extra parameters.
    const fn steps(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Self::Start => &[("d.open", &[]), ("d.start", &[])],
            Self::Pause => &[("d.stop", &[])],
            Self::Unpause => &[("d.start", &[])],
            Self::Stop => &[("d.stop", &[]), ("d.close", &[])],
            Self::CheckHash => &[("d.check_hash", &[])],
            Self::Remove => &[("d.stop", &[]), ("d.close", &[]), ("d.erase", &[])],
            Self::RemoveAndDelete => &[
                ("d.stop", &[]),
                ("d.close", &[]),
                ("d.set_custom5", &["1"]),
                ("d.erase", &[]),
            ],
        }
    }

    /// Descriptors for one torrent; the first is always `hash`.
    #[must_use]
    pub fn descriptors(self, hash: Option<&str>) -> Vec<MethodDescriptor> {
        let head = ("hash", WireCall::new("d.hash", vec![target(hash)]));
        let steps = self.steps().iter().map(|&(method, extra)| {
            let mut params = vec![target(hash)];
            params.extend(extra.iter().copied().map(Value::str));
            (method, WireCall::new(method, params))
        });
        build_descriptors(std::iter::once(head).chain(steps), &FieldSelection::all())
    }

    /// One batched descriptor applying the action to every torrent in scope.
    ///
    /// # Errors
    ///
    /// Propagates ratio-group validation failures from the scope.
    pub fn batch(self, scope: &BatchScope) -> RpcResult<MethodDescriptor> {
        compile_batch(&self.descriptors(None), scope)
    }
}

impl Display for TorrentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptors applying `action` to each hash in turn.
#[must_use]
pub fn action_descriptors<S: AsRef<str>>(action: TorrentAction, hashes: &[S]) -> Vec<MethodDescriptor> {
    hashes
        .iter()
        .flat_map(|hash| action.descriptors(Some(hash.as_ref())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methods(descriptors: &[MethodDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.wire_method.as_str()).collect()
    }

    #[test]
    fn actions_expand_to_their_wire_sequences() {
        assert_eq!(
            methods(&TorrentAction::Start.descriptors(Some("A"))),
            vec!["d.hash", "d.open", "d.start"]
        );
        assert_eq!(
            methods(&TorrentAction::Stop.descriptors(Some("A"))),
            vec!["d.hash", "d.stop", "d.close"]
        );
        assert_eq!(
            methods(&TorrentAction::Remove.descriptors(Some("A"))),
            vec!["d.hash", "d.stop", "d.close", "d.erase"]
        );

        let delete = TorrentAction::RemoveAndDelete.descriptors(Some("A"));
        assert_eq!(delete[3].wire_method, "d.set_custom5");
        assert_eq!(delete[3].params, vec![Value::str("A"), Value::str("1")]);
        assert!(TorrentAction::ALL.iter().all(|a| a.descriptors(Some("A"))[0].key == "hash"));
    }

    #[test]
    fn multiple_hashes_repeat_the_sequence() {
        let descriptors = action_descriptors(TorrentAction::Pause, &["A", "B"]);
        assert_eq!(methods(&descriptors), vec!["d.hash", "d.stop", "d.hash", "d.stop"]);
        assert_eq!(descriptors[2].params, vec![Value::str("B")]);
    }

    #[test]
    fn batched_action_uses_fragments() -> RpcResult<()> {
        let batch = TorrentAction::CheckHash.batch(&BatchScope::view("seeding"))?;
        assert_eq!(
            batch.params,
            vec![
                Value::str(""),
                Value::str("seeding"),
                Value::str("d.hash="),
                Value::str("d.check_hash="),
            ]
        );
        let delete = TorrentAction::RemoveAndDelete.batch(&BatchScope::default())?;
        assert!(delete.params.contains(&Value::str("d.set_custom5=1")));
        assert_eq!(TorrentAction::CheckHash.to_string(), "check_hash");
        Ok(())
    }
}
