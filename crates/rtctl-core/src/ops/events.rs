//! Download event hooks (`event.download.*` multi-commands).

use crate::descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors};
use crate::value::Value;

/// Download events the daemon exposes as named-command maps.
pub const DOWNLOAD_EVENTS: &[&str] = &[
    "event.download.closed",
    "event.download.erased",
    "event.download.finished",
    "event.download.hash_done",
    "event.download.hash_failed",
    "event.download.hash_final_failed",
    "event.download.hash_queued",
    "event.download.hash_removed",
    "event.download.inserted",
    "event.download.inserted_new",
    "event.download.inserted_session",
    "event.download.opened",
    "event.download.paused",
    "event.download.resumed",
];

fn read_event(event: &str) -> WireCall {
    WireCall::new("method.get", vec![Value::str(""), Value::str(event)])
}

/// Read the handlers registered on every download event.
#[must_use]
pub fn events_get(selection: &FieldSelection) -> Vec<MethodDescriptor> {
    let calls = DOWNLOAD_EVENTS
        .iter()
        .map(|&event| (event, read_event(event)));
    build_descriptors(calls, selection)
}

/// Register `command` under `name` on `event`, then read the event back.
#[must_use]
pub fn events_set(event: &str, name: &str, command: &str) -> Vec<MethodDescriptor> {
    let set = WireCall::new(
        "method.set_key",
        vec![
            Value::str(""),
            Value::str(event),
            Value::str(name),
            Value::str(command),
        ],
    );
    let calls = [("method.set_key", set), ("method.get", read_event(event))];
    build_descriptors(calls, &FieldSelection::all())
}

/// Drop the handler `name` from `event`, then read the event back.
///
/// Setting a key without a command erases it.
#[must_use]
pub fn events_remove(event: &str, name: &str) -> Vec<MethodDescriptor> {
    let erase = WireCall::new(
        "method.set_key",
        vec![Value::str(""), Value::str(event), Value::str(name)],
    );
    let calls = [("method.erase", erase), ("method.get", read_event(event))];
    build_descriptors(calls, &FieldSelection::all())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_is_read_with_method_get() {
        let all = events_get(&FieldSelection::all());
        assert_eq!(all.len(), 14);
        assert!(all.iter().all(|d| d.wire_method == "method.get"));
        assert_eq!(all[2].key, "event.download.finished");
        assert_eq!(
            all[2].params,
            vec![Value::str(""), Value::str("event.download.finished")]
        );

        let some = events_get(&FieldSelection::only(["event.download.erased"]));
        assert_eq!(some.len(), 1);
    }

    #[test]
    fn set_and_remove_read_the_event_back() {
        let set = events_set("event.download.finished", "notify", "execute=notify-send,done");
        assert_eq!(set[0].wire_method, "method.set_key");
        assert_eq!(set[0].params.len(), 4);
        assert_eq!(set[1].key, "method.get");

        let removed = events_remove("event.download.finished", "notify");
        assert_eq!(removed[0].key, "method.erase");
        assert_eq!(removed[0].wire_method, "method.set_key");
        assert_eq!(
            removed[0].params,
            vec![
                Value::str(""),
                Value::str("event.download.finished"),
                Value::str("notify")
            ]
        );
    }
}
