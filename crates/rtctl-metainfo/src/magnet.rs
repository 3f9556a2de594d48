//! Magnet link validation and info-hash extraction.

use data_encoding::BASE32;

use crate::error::{MetainfoError, MetainfoResult};

const BTIH_MARKER: &str = "btih:";

/// Magnet URI with its hex info hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    uri: String,
    info_hash: String,
}

impl MagnetLink {
    /// Whether `candidate` should be treated as a magnet link rather than a path.
    #[must_use]
    pub fn is_magnet(candidate: &str) -> bool {
        candidate.starts_with("magnet") || candidate.contains("xt=urn:btih:")
    }

    /// Validate a magnet URI and extract its `btih` info hash.
    ///
    /// Hex hashes (40 characters) are kept as given; base32 hashes (32
    /// characters) are converted to lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns [`MetainfoError::InvalidMagnet`] when no hash is present or it
    /// is neither valid hex nor valid base32.
    pub fn parse(uri: &str) -> MetainfoResult<Self> {
        let invalid = || MetainfoError::InvalidMagnet {
            uri: uri.to_string(),
        };
        let (_, tail) = uri.split_once(BTIH_MARKER).ok_or_else(invalid)?;
        let candidate = tail.split('&').next().unwrap_or_default();
        let info_hash = match candidate.len() {
            40 if candidate.chars().all(|c| c.is_ascii_hexdigit()) => candidate.to_string(),
            32 => {
                let raw = BASE32
                    .decode(candidate.to_ascii_uppercase().as_bytes())
                    .map_err(|_| invalid())?;
                hex::encode(raw)
            }
            _ => return Err(invalid()),
        };
        Ok(Self {
            uri: uri.to_string(),
            info_hash,
        })
    }

    /// The URI as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Hex info hash.
    #[must_use]
    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }
}
