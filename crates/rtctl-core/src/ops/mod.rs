//! Descriptor builders for every remote operation the client exposes.
//!
//! Each builder is a pure mapping from an entity identifier plus parameters to
//! an ordered descriptor list; none of them touch the network.

pub mod actions;
pub mod add;
pub mod events;
pub mod torrent;

pub use actions::{TorrentAction, action_descriptors};
pub use add::{
    AddTorrentOptions, DEFAULT_DOWNLOAD_PATH, LoadDirectives, add_torrent_file, add_torrent_magnet,
    ratio_group_command,
};
pub use events::{DOWNLOAD_EVENTS, events_get, events_remove, events_set};
pub use torrent::{all_torrents, torrent_fields};
