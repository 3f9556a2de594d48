//! Sample metainfo and response builders.

use indexmap::IndexMap;
use rtctl_core::Value;

/// Single-file torrent named `sample.iso` with comment `Hello World`.
pub const SAMPLE_TORRENT: &[u8] = b"d8:announce31:http://tracker.example/announce7:comment11:Hello World10:created by5:rtctl4:infod6:lengthi1048576e4:name10:sample.iso12:piece lengthi262144e6:pieces20:abcdefghijklmnopqrstee";

/// Hex info hash of [`SAMPLE_TORRENT`].
pub const SAMPLE_INFO_HASH: &str = "0430ec51cf02afb54dfca272f6a88e7fad2b5a02";

/// Base32 form of [`SAMPLE_INFO_HASH`].
pub const SAMPLE_INFO_HASH_BASE32: &str = "AQYOYUOPAKX3KTP4UJZPNKEOP6WSWWQC";

/// Owned copy of [`SAMPLE_TORRENT`].
#[must_use]
pub fn sample_torrent_bytes() -> Vec<u8> {
    SAMPLE_TORRENT.to_vec()
}

/// Magnet link for the sample torrent.
#[must_use]
pub fn sample_magnet() -> String {
    format!("magnet:?xt=urn:btih:{SAMPLE_INFO_HASH}&dn=sample.iso")
}

/// A successful `system.multicall` element (results arrive wrapped in a one-element array).
#[must_use]
pub fn ok(value: impl Into<Value>) -> Value {
    Value::Array(vec![value.into()])
}

/// A faulted `system.multicall` element.
#[must_use]
pub fn fault(code: i64, message: &str) -> Value {
    let mut members = IndexMap::with_capacity(2);
    members.insert("faultCode".to_string(), Value::Int(code));
    members.insert("faultString".to_string(), Value::str(message));
    Value::Struct(members)
}
