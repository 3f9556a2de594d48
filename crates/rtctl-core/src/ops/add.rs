//! Descriptors for loading new torrents, from raw metainfo or a magnet link.
//!
//! # Design
//! - Post-load commands (label, comment, directory, ratio group) ride along as
//!   extra parameters of the `load.*` call so the torrent is configured before it
//!   starts.
//! - Every load is followed by a `hash` descriptor echoing the expected info hash,
//!   so each added torrent decodes to one record.

use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldSelection, MethodDescriptor, WireCall, build_descriptors};
use crate::error::RpcResult;
use crate::parse::COMMENT_MARKER;
use crate::ratio_group::{RatioGroupSelector, RatioGroupTag, parse_ratio_group};
use crate::value::Value;

/// Directory used when neither the caller nor the daemon names one.
pub const DEFAULT_DOWNLOAD_PATH: &str = "~/torrents/downloads";

/// Caller-facing options for adding torrents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddTorrentOptions {
    /// Target directory; the daemon default is used when unset.
    pub download_path: Option<String>,
    /// Label stored in `custom1`.
    pub label: Option<String>,
    /// Ratio group joined on load.
    pub ratio_group: Option<RatioGroupSelector>,
    /// Load without starting.
    pub add_stopped: bool,
    /// Place the payload in a sub-directory named after the torrent.
    pub add_name_to_path: bool,
    /// Keep the uploaded metainfo file in the session directory.
    pub save_torrent: bool,
}

impl Default for AddTorrentOptions {
    fn default() -> Self {
        Self {
            download_path: None,
            label: None,
            ratio_group: None,
            add_stopped: false,
            add_name_to_path: true,
            save_torrent: false,
        }
    }
}

impl AddTorrentOptions {
    /// Resolve the options into wire-ready directives.
    ///
    /// `fallback_path` is used when no download path was given; when it is also
    /// absent or empty, [`DEFAULT_DOWNLOAD_PATH`] applies.
    ///
    /// # Errors
    ///
    /// Propagates ratio-group validation failures.
    pub fn resolve(&self, fallback_path: Option<&str>) -> RpcResult<LoadDirectives> {
        let download_path = self
            .download_path
            .as_deref()
            .or(fallback_path)
            .filter(|path| !path.is_empty())
            .unwrap_or(DEFAULT_DOWNLOAD_PATH)
            .to_string();
        Ok(LoadDirectives {
            download_path,
            label: quote(self.label.as_deref().unwrap_or_default()),
            ratio_group: parse_ratio_group(self.ratio_group.as_ref())?,
            add_stopped: self.add_stopped,
            add_name_to_path: self.add_name_to_path,
            save_torrent: self.save_torrent,
        })
    }
}

/// Percent-encode `text`, leaving path separators readable.
fn quote(text: &str) -> String {
    text.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolved load parameters shared by every torrent in one add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDirectives {
    /// Target directory.
    pub download_path: String,
    /// Percent-encoded label.
    pub label: String,
    /// Ratio group joined on load.
    pub ratio_group: Option<RatioGroupTag>,
    /// Load without starting.
    pub add_stopped: bool,
    /// Use `d.set_directory` instead of `d.set_directory_base`.
    pub add_name_to_path: bool,
    /// Keep the tied metainfo file.
    pub save_torrent: bool,
}

impl LoadDirectives {
    fn delete_tied(&self) -> Value {
        Value::str(if self.save_torrent { "" } else { "d.delete_tied=" })
    }

    fn mkdir(&self) -> Value {
        Value::str(format!("execute=mkdir,-p,\"{}\"", self.download_path))
    }

    fn set_directory(&self) -> Value {
        let command = if self.add_name_to_path {
            "d.set_directory="
        } else {
            "d.set_directory_base="
        };
        Value::str(format!("{command}\"{}\"", self.download_path))
    }

    fn ratio_group(&self) -> Value {
        Value::str(
            self.ratio_group
                .map(ratio_group_command)
                .unwrap_or_default(),
        )
    }
}

/// Post-load command joining an ungrouped torrent to `group`.
#[must_use]
pub fn ratio_group_command(group: RatioGroupTag) -> String {
    format!(
        "if=(not, (d.views)), (cat, $d.views.push_back_unique={group}, $view.set_visible={group}, $d.views=), (cat, \"\")"
    )
}

fn echo_hash(hash: &str) -> (&'static str, WireCall) {
    ("hash", WireCall::new("cat", vec![Value::str(""), Value::str(hash)]))
}

/// Load raw metainfo bytes.
///
/// `comment` and `name` are percent-encoded here; `hash` is the hex info hash.
#[must_use]
pub fn add_torrent_file(
    hash: &str,
    data: Vec<u8>,
    name: &str,
    comment: &str,
    directives: &LoadDirectives,
) -> Vec<MethodDescriptor> {
    let method = if directives.add_stopped {
        "load.raw"
    } else {
        "load.raw_start"
    };
    let params = vec![
        Value::str(""),
        Value::Bytes(data),
        Value::str(format!("d.set_custom1={}", directives.label)),
        Value::str(format!(
            "d.set_custom2={COMMENT_MARKER}{}",
            quote(comment)
        )),
        Value::str(format!(
            "d.set_custom=x-filename,{}",
            quote(name)
        )),
        directives.delete_tied(),
        directives.mkdir(),
        directives.set_directory(),
        directives.ratio_group(),
    ];
    let calls = [("add_torrent", WireCall::new(method, params)), echo_hash(hash)];
    build_descriptors(calls, &FieldSelection::all())
}

/// Load a magnet link.
#[must_use]
pub fn add_torrent_magnet(
    hash: &str,
    magnet: &str,
    directives: &LoadDirectives,
) -> Vec<MethodDescriptor> {
    let method = if directives.add_stopped {
        "load.normal"
    } else {
        "load.start"
    };
    let params = vec![
        Value::str(""),
        Value::str(magnet),
        Value::str(format!("d.set_custom1={}", directives.label)),
        directives.delete_tied(),
        directives.mkdir(),
        directives.set_directory(),
        directives.ratio_group(),
    ];
    let calls = [
        ("add_torrent_magnet", WireCall::new(method, params)),
        echo_hash(hash),
    ];
    build_descriptors(calls, &FieldSelection::all())
}
