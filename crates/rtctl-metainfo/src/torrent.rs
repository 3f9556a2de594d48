//! Read-only view over a decoded `.torrent` file.

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::bencode::{Bencode, decode, encode};
use crate::error::{MetainfoError, MetainfoResult};

/// Hex SHA-1 of the canonical encoding of an `info` dictionary.
#[must_use]
pub fn info_hash(info: &Bencode) -> String {
    hex::encode(Sha1::digest(encode(info)))
}

/// Decoded torrent metainfo and its derived info hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    root: Bencode,
    info_hash: String,
}

impl Metainfo {
    /// Decode metainfo bytes and derive the info hash.
    ///
    /// # Errors
    ///
    /// Fails on malformed bencode, a non-dictionary root, or a missing `info`
    /// dictionary.
    pub fn from_bytes(data: &[u8]) -> MetainfoResult<Self> {
        let root = decode(data)?;
        if root.as_dict().is_none() {
            return Err(MetainfoError::NotADictionary);
        }
        let info = root
            .get("info")
            .filter(|info| info.as_dict().is_some())
            .ok_or(MetainfoError::MissingInfo)?;
        let info_hash = info_hash(info);
        debug!(info_hash = %info_hash, bytes = data.len(), "decoded metainfo");
        Ok(Self { root, info_hash })
    }

    /// Lowercase 40-character hex info hash.
    #[must_use]
    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }

    /// Suggested name from `info.name`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.root
            .get("info")
            .and_then(|info| info.get("name"))
            .and_then(Bencode::as_str)
    }

    /// Free-form `comment`, if present.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.root.get("comment").and_then(Bencode::as_str)
    }

    /// Top-level value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Bencode> {
        self.root.get(key)
    }

    /// Canonical re-encoding for submission to the daemon.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtctl_test_support::fixtures::{SAMPLE_INFO_HASH, sample_torrent_bytes};

    #[test]
    fn derives_hash_name_and_comment() -> anyhow::Result<()> {
        let metainfo = Metainfo::from_bytes(&sample_torrent_bytes())?;
        assert_eq!(metainfo.info_hash(), SAMPLE_INFO_HASH);
        assert_eq!(metainfo.name(), Some("sample.iso"));
        assert_eq!(metainfo.comment(), Some("Hello World"));
        assert_eq!(
            metainfo.get("announce").and_then(Bencode::as_str),
            Some("http://tracker.example/announce")
        );
        assert_eq!(metainfo.to_bytes(), sample_torrent_bytes());
        Ok(())
    }

    #[test]
    fn hash_ignores_source_key_order() -> anyhow::Result<()> {
        let unsorted =
            b"d4:infod4:name10:sample.iso6:lengthi1048576e12:piece lengthi262144e6:pieces20:abcdefghijklmnopqrstee";
        let metainfo = Metainfo::from_bytes(unsorted)?;
        assert_eq!(metainfo.info_hash(), SAMPLE_INFO_HASH);
        assert_eq!(metainfo.comment(), None);
        Ok(())
    }

    #[test]
    fn rejects_roots_without_info() {
        assert_eq!(
            Metainfo::from_bytes(b"li1ee"),
            Err(MetainfoError::NotADictionary)
        );
        assert_eq!(
            Metainfo::from_bytes(b"d4:infoi1ee"),
            Err(MetainfoError::MissingInfo)
        );
    }
}
