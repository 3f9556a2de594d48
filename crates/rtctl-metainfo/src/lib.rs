#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Torrent metainfo support for the add-torrent path.
//!
//! Layout: `bencode.rs` (value model and codec), `torrent.rs` (metainfo view and
//! info hash), `magnet.rs` (magnet link validation), `error.rs` (error type).

pub mod bencode;
pub mod error;
pub mod magnet;
pub mod torrent;

pub use bencode::{Bencode, decode, encode};
pub use error::{MetainfoError, MetainfoResult};
pub use magnet::MagnetLink;
pub use torrent::{Metainfo, info_hash};
