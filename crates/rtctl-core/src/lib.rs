#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Batch compilation and response decoding for the rTorrent XML-RPC interface.
//!
//! Layout: `registry.rs` (nested-entity field tables), `descriptor.rs` (call
//! descriptors and field selection), `ratio_group.rs` (ratio-group codec),
//! `batch.rs` (view-wide `d.multicall2` compiler), `parse.rs` (response
//! demultiplexer), `settings.rs` (settings codec), `ops/` (per-operation
//! descriptor builders), `transport.rs` (wire seam).

pub mod batch;
pub mod descriptor;
pub mod error;
pub mod ops;
pub mod parse;
pub mod ratio_group;
pub mod registry;
pub mod settings;
pub mod transport;
pub mod value;

pub use batch::{BATCH_METHOD, BatchScope, call_fragment, compile_batch};
pub use descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors};
pub use error::{RpcError, RpcResult, TransportError};
pub use parse::{
    COMMENT_MARKER, ResponseDecoder, check_faults, check_response, parse_method_response,
    parse_number, parse_result,
};
pub use ratio_group::{
    RatioGroupSelector, RatioGroupTag, RatioGroupTransition, format_ratio_group_tag,
    parse_ratio_group, parse_ratio_group_value, plan_ratio_group_change,
};
pub use registry::{FieldGroup, FieldRegistry, registry};
pub use settings::{
    MAX_XMLRPC_SIZE, ONE_MIB, SettingWrite, normalize_settings, settings_get, settings_set,
    size_limit_bytes, size_limit_mib,
};
pub use transport::{MULTICALL_METHOD, Transport};
pub use value::{Fault, Record, Value};
