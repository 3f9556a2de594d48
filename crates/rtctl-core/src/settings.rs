//! Global daemon settings: getter table, setter normalisation, payload ceiling.
//!
//! # Design
//! - Callers may spell a setting `min_peers`, `get_min_peers`, or `set_min_peers`;
//!   [`normalize_settings`] maps every spelling to the bare display name and the
//!   `set_` wire method.
//! - Setters and getters both take the empty target parameter first.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors};
use crate::error::{RpcError, RpcResult};
use crate::value::Value;

/// One mebibyte in bytes.
pub const ONE_MIB: u64 = 1 << 20;

/// Largest request payload the daemon accepts: 64 MiB minus one byte.
pub const MAX_XMLRPC_SIZE: u64 = ONE_MIB * 64 - 1;

const GETTER_PREFIX: &str = "get_";
const SETTER_PREFIX: &str = "set_";

const SETTING_GETTERS: &[(&str, &str)] = &[
    ("dht_statistics", "dht_statistics"),
    ("check_hash", "get_check_hash"),
    ("bind", "get_bind"),
    ("dht_port", "get_dht_port"),
    ("directory", "get_directory"),
    ("download_rate", "get_download_rate"),
    ("http_cacert", "get_http_cacert"),
    ("http_capath", "get_http_capath"),
    ("http_proxy", "get_http_proxy"),
    ("ip", "get_ip"),
    ("max_downloads_div", "get_max_downloads_div"),
    ("max_downloads_global", "get_max_downloads_global"),
    ("max_file_size", "get_max_file_size"),
    ("max_memory_usage", "get_max_memory_usage"),
    ("max_open_files", "get_max_open_files"),
    ("max_open_http", "get_max_open_http"),
    ("max_peers", "get_max_peers"),
    ("max_peers_seed", "get_max_peers_seed"),
    ("max_uploads", "get_max_uploads"),
    ("max_uploads_global", "get_max_uploads_global"),
    ("min_peers_seed", "get_min_peers_seed"),
    ("min_peers", "get_min_peers"),
    ("peer_exchange", "get_peer_exchange"),
    ("port_open", "get_port_open"),
    ("upload_rate", "get_upload_rate"),
    ("port_random", "get_port_random"),
    ("port_range", "get_port_range"),
    ("preload_min_size", "get_preload_min_size"),
    ("preload_required_rate", "get_preload_required_rate"),
    ("preload_type", "get_preload_type"),
    ("proxy_address", "get_proxy_address"),
    ("receive_buffer_size", "get_receive_buffer_size"),
    ("safe_sync", "get_safe_sync"),
    ("scgi_dont_route", "get_scgi_dont_route"),
    ("send_buffer_size", "get_send_buffer_size"),
    ("session", "get_session"),
    ("session_lock", "get_session_lock"),
    ("session_on_completion", "get_session_on_completion"),
    ("split_file_size", "get_split_file_size"),
    ("split_suffix", "get_split_suffix"),
    ("timeout_safe_sync", "get_timeout_safe_sync"),
    ("timeout_sync", "get_timeout_sync"),
    ("tracker_numwant", "get_tracker_numwant"),
    ("use_udp_trackers", "get_use_udp_trackers"),
    ("max_uploads_div", "get_max_uploads_div"),
    ("max_open_sockets", "get_max_open_sockets"),
];

/// Normalised write of one setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingWrite {
    /// Setter wire method, always `set_`-prefixed.
    pub setter: String,
    /// Value to write; nil is replaced by the empty string.
    pub value: Value,
}

/// Canonicalise caller-supplied setting names.
///
/// Later spellings of the same setting overwrite earlier ones.
pub fn normalize_settings<I, K, V>(settings: I) -> IndexMap<String, SettingWrite>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    settings
        .into_iter()
        .map(|(name, value)| {
            let name = name.as_ref();
            let display = name
                .strip_prefix(GETTER_PREFIX)
                .or_else(|| name.strip_prefix(SETTER_PREFIX))
                .unwrap_or(name);
            let value = match value.into() {
                Value::Nil => Value::str(""),
                other => other,
            };
            let write = SettingWrite {
                setter: format!("{SETTER_PREFIX}{display}"),
                value,
            };
            (display.to_string(), write)
        })
        .collect()
}

/// Read every known setting.
#[must_use]
pub fn settings_get(selection: &FieldSelection) -> Vec<MethodDescriptor> {
    let calls = SETTING_GETTERS
        .iter()
        .map(|&(name, getter)| (name, WireCall::new(getter, vec![Value::str("")])));
    build_descriptors(calls, selection)
}

/// Write normalised settings, keyed by display name.
#[must_use]
pub fn settings_set(
    settings: &IndexMap<String, SettingWrite>,
    selection: &FieldSelection,
) -> Vec<MethodDescriptor> {
    let calls = settings.iter().map(|(name, write)| {
        (
            name.as_str(),
            WireCall::new(&write.setter, vec![Value::str(""), write.value.clone()]),
        )
    });
    build_descriptors(calls, selection)
}

/// Translate a ceiling in MiB to bytes, clamping exactly 64 MiB to the maximum.
///
/// # Errors
///
/// Returns [`RpcError::ResourceLimit`] when the request exceeds 64 MiB.
pub fn size_limit_bytes(mib: u64) -> RpcResult<u64> {
    let requested = mib.saturating_mul(ONE_MIB);
    if requested <= MAX_XMLRPC_SIZE {
        Ok(requested)
    } else if mib == 64 {
        Ok(MAX_XMLRPC_SIZE)
    } else {
        Err(RpcError::ResourceLimit {
            requested,
            maximum: MAX_XMLRPC_SIZE,
        })
    }
}

/// Round a byte ceiling reported by the daemon to whole MiB.
#[must_use]
pub const fn size_limit_mib(bytes: u64) -> u64 {
    (bytes + ONE_MIB / 2) / ONE_MIB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_gain_setter_prefix() {
        let normalized = normalize_settings([("min_peers", 1)]);
        let write = normalized.get("min_peers").expect("min_peers entry");
        assert_eq!(write.setter, "set_min_peers");
        assert_eq!(write.value, Value::Int(1));
    }

    #[test]
    fn getter_and_setter_spellings_collapse() {
        let normalized = normalize_settings([
            ("get_max_peers", Value::Int(50)),
            ("set_upload_rate", Value::Int(0)),
            ("directory", Value::Nil),
        ]);
        let keys: Vec<_> = normalized.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["max_peers", "upload_rate", "directory"]);
        assert_eq!(
            normalized.get("max_peers"),
            Some(&SettingWrite {
                setter: "set_max_peers".to_string(),
                value: Value::Int(50),
            })
        );
        assert_eq!(
            normalized.get("upload_rate").map(|w| w.setter.as_str()),
            Some("set_upload_rate")
        );
        assert_eq!(
            normalized.get("directory").map(|w| &w.value),
            Some(&Value::str(""))
        );
    }

    #[test]
    fn getter_table_covers_every_setting() {
        let all = settings_get(&FieldSelection::all());
        assert_eq!(all.len(), 46);
        assert_eq!(all[0].wire_method, "dht_statistics");
        assert!(all.iter().all(|d| d.params == vec![Value::str("")]));

        let some = settings_get(&FieldSelection::only(["max_peers", "port_range"]));
        let keys: Vec<_> = some.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["max_peers", "port_range"]);
    }

    #[test]
    fn setters_carry_empty_target_then_value() {
        let normalized = normalize_settings([("max_peers", 200), ("min_peers", 1)]);
        let descriptors = settings_set(&normalized, &FieldSelection::all().excluding("min_peers"));
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].key, "max_peers");
        assert_eq!(descriptors[0].wire_method, "set_max_peers");
        assert_eq!(descriptors[0].params, vec![Value::str(""), Value::Int(200)]);
    }

    #[test]
    fn payload_ceiling_is_enforced_locally() -> RpcResult<()> {
        assert_eq!(size_limit_bytes(2)?, 2 * ONE_MIB);
        assert_eq!(size_limit_bytes(64)?, MAX_XMLRPC_SIZE);
        match size_limit_bytes(65) {
            Err(RpcError::ResourceLimit { requested, maximum }) => {
                assert_eq!(requested, 65 * ONE_MIB);
                assert_eq!(maximum, MAX_XMLRPC_SIZE);
            }
            other => panic!("expected resource limit error, got {other:?}"),
        }
        assert_eq!(size_limit_mib(MAX_XMLRPC_SIZE), 64);
        assert_eq!(size_limit_mib(2 * ONE_MIB + 1), 2);
        Ok(())
    }
}
