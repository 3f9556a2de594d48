//! Error types for the wire codec, connection configuration, and client facade.

use std::path::PathBuf;

use rtctl_core::{RpcError, TransportError};
use rtctl_metainfo::MetainfoError;
use thiserror::Error;

/// Errors raised while decoding XML-RPC documents.
#[derive(Debug, Error)]
pub enum XmlRpcError {
    /// The document was not well-formed XML.
    #[error("malformed XML document")]
    Syntax {
        /// Underlying parser error.
        #[source]
        source: quick_xml::Error,
    },
    /// Start and end tags did not pair up.
    #[error("unbalanced XML elements")]
    Unbalanced,
    /// An element name was not valid UTF-8.
    #[error("element name is not valid UTF-8")]
    InvalidName,
    /// A required element was absent.
    #[error("missing XML-RPC element")]
    MissingElement {
        /// Element that was expected.
        expected: &'static str,
    },
    /// A scalar's text could not be parsed as its declared type.
    #[error("invalid XML-RPC scalar")]
    InvalidScalar {
        /// Declared type.
        kind: &'static str,
        /// Offending text.
        text: String,
    },
    /// A `<value>` declared a type this codec does not know.
    #[error("unknown XML-RPC value type")]
    UnknownType {
        /// Element name of the type.
        name: String,
    },
    /// A `<base64>` payload did not decode.
    #[error("invalid base64 payload")]
    InvalidBase64 {
        /// Underlying decoder error.
        #[source]
        source: base64::DecodeError,
    },
}

/// Errors raised while building connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither an explicit URI nor a host was configured.
    #[error("connection host missing")]
    MissingHost,
    /// The scheme is not `http` or `https`.
    #[error("unsupported connection scheme")]
    UnsupportedScheme {
        /// Scheme as configured.
        scheme: String,
    },
    /// The composed endpoint is not a valid URL.
    #[error("invalid connection URL")]
    InvalidUrl {
        /// Endpoint text that failed to parse.
        value: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// A numeric setting could not be parsed.
    #[error("invalid connection setting")]
    InvalidSetting {
        /// Environment variable or field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The request payload ceiling is above what the daemon accepts.
    #[error("request payload ceiling too large")]
    PayloadCeiling {
        /// Requested ceiling in bytes.
        requested: u64,
        /// Hard maximum in bytes.
        maximum: u64,
    },
    /// The endpoint was rejected by the HTTP transport.
    #[error("invalid endpoint")]
    Endpoint {
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    HttpClient {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors surfaced by [`crate::RtorrentClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Compilation, decoding, or delivery of a batch failed.
    #[error("remote call failed")]
    Rpc(#[from] RpcError),
    /// A torrent file or magnet link was rejected before any call was issued.
    #[error("invalid torrent input")]
    Metainfo(#[from] MetainfoError),
    /// A torrent file could not be read from disk.
    #[error("failed to read torrent file")]
    ReadTorrent {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A single-record query returned nothing.
    #[error("torrent not found")]
    MissingRecord {
        /// Hash that was queried.
        hash: String,
    },
    /// A single call returned a value of the wrong type.
    #[error("unexpected value in response")]
    UnexpectedValue {
        /// Remote method that produced the value.
        method: &'static str,
    },
}

impl From<TransportError> for ClientError {
    fn from(error: TransportError) -> Self {
        Self::Rpc(RpcError::Transport(error))
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;
