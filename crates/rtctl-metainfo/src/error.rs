//! Error types for metainfo decoding and magnet parsing.

use thiserror::Error;

/// Errors raised while reading torrent metainfo or magnet links.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetainfoError {
    /// Input ended before a value was complete.
    #[error("unexpected end of bencode input")]
    UnexpectedEof {
        /// Offset at which more input was expected.
        offset: usize,
    },
    /// A byte that cannot start or continue a value.
    #[error("invalid bencode byte")]
    InvalidByte {
        /// Offset of the byte.
        offset: usize,
        /// Offending byte.
        byte: u8,
    },
    /// An integer was empty, zero-padded, `-0`, or overflowed.
    #[error("invalid bencode integer")]
    InvalidInteger {
        /// Offset of the integer body.
        offset: usize,
    },
    /// A byte-string length prefix was malformed.
    #[error("invalid bencode string length")]
    InvalidLength {
        /// Offset of the length prefix.
        offset: usize,
    },
    /// Values nested deeper than the decoder allows.
    #[error("bencode nesting too deep")]
    NestingTooDeep {
        /// Offset of the value that exceeded the limit.
        offset: usize,
    },
    /// Bytes remained after the top-level value.
    #[error("trailing data after bencode value")]
    TrailingData {
        /// Offset of the first trailing byte.
        offset: usize,
    },
    /// The top-level value was not a dictionary.
    #[error("metainfo root is not a dictionary")]
    NotADictionary,
    /// The metainfo carried no `info` dictionary.
    #[error("metainfo has no info dictionary")]
    MissingInfo,
    /// A magnet link had no usable `btih` info hash.
    #[error("failed to parse magnet link")]
    InvalidMagnet {
        /// Magnet URI as supplied.
        uri: String,
    },
}

/// Convenience alias for metainfo results.
pub type MetainfoResult<T> = Result<T, MetainfoError>;
