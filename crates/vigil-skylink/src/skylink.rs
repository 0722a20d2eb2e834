// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skylink parsing, validation and canonical hashing.
//!
//! A skylink is 46 characters of unpadded URL-safe base64 encoding a
//! 34-byte payload: a little-endian `u16` bitfield followed by a 32-byte
//! merkle root. The two low bits of the bitfield encode the version.
//! Version-1 skylinks name content directly; version-2 skylinks are
//! resolver entries that the portal maps to another skylink.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use vigil_core::{Hash, VigilError};

/// Encoded length of a skylink in characters.
pub const ENCODED_LEN: usize = 46;

/// Decoded payload length: bitfield (2 bytes) + merkle root (32 bytes).
const PAYLOAD_LEN: usize = 34;

type Blake2b256 = Blake2b<U32>;

/// A syntactically valid skylink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skylink {
    raw: String,
    bitfield: u16,
    merkle_root: [u8; 32],
}

impl Skylink {
    /// Parses and validates a skylink string.
    pub fn parse(raw: &str) -> Result<Self, VigilError> {
        if raw.len() != ENCODED_LEN {
            return Err(VigilError::InvalidSkylink(format!(
                "expected {ENCODED_LEN} characters, got {}",
                raw.len()
            )));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(VigilError::InvalidSkylink(
                "contains characters outside the URL-safe base64 alphabet".into(),
            ));
        }
        let payload = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|e| VigilError::InvalidSkylink(format!("not valid base64: {e}")))?;
        if payload.len() != PAYLOAD_LEN {
            return Err(VigilError::InvalidSkylink(format!(
                "expected a {PAYLOAD_LEN}-byte payload, got {}",
                payload.len()
            )));
        }

        let bitfield = u16::from_le_bytes([payload[0], payload[1]]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&payload[2..]);

        let link = Self {
            raw: raw.to_string(),
            bitfield,
            merkle_root,
        };
        match link.version() {
            1 | 2 => Ok(link),
            v => Err(VigilError::InvalidSkylink(format!("unsupported version {v}"))),
        }
    }

    /// Skylink version encoded in the two low bitfield bits.
    pub fn version(&self) -> u8 {
        ((self.bitfield & 0b11) + 1) as u8
    }

    /// Whether this is a version-2 resolver skylink that must be followed
    /// against the portal before it names content.
    pub fn is_resolver(&self) -> bool {
        self.version() == 2
    }

    /// The embedded 32-byte merkle root.
    pub fn merkle_root(&self) -> &[u8; 32] {
        &self.merkle_root
    }

    /// Canonical content hash: blake2b-256 over the merkle root.
    ///
    /// Only meaningful for version-1 skylinks; resolver skylinks must be
    /// reduced to version 1 first.
    pub fn hash(&self) -> Hash {
        let mut hasher = Blake2b256::new();
        hasher.update(self.merkle_root);
        Hash(hasher.finalize().into())
    }

    /// The original encoded form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for Skylink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
