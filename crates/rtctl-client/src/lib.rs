#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! XML-RPC transport and batched client for the rTorrent daemon.
//!
//! Layout: `xmlrpc.rs` (document codec), `transport.rs` (HTTP transport),
//! `config.rs` (connection settings), `client.rs` (operation facade),
//! `error.rs` (error types).

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod xmlrpc;

pub use client::{RtorrentClient, TorrentItem, TorrentQuery};
pub use config::{ConnectionConfig, DEFAULT_RPC_PATH, DEFAULT_SCHEME, DEFAULT_TIMEOUT_SECS};
pub use error::{ClientError, ClientResult, ConfigError, XmlRpcError};
pub use transport::HttpTransport;
pub use xmlrpc::{MethodResponse, decode_response, encode_call};
