// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Vigil service.

use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::VigilError;

/// Canonical 32-byte content hash. The unique key for a [`ScanRecord`].
///
/// Serialized as lowercase hex everywhere it crosses a boundary (store,
/// HTTP bodies, logs).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Size of a hash in bytes.
    pub const SIZE: usize = 32;

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(Self::SIZE * 2);
        for b in self.0 {
            let _ = write!(s, "{b:02x}");
        }
        s
    }

    /// Parses a 64-character lowercase or uppercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, VigilError> {
        if s.len() != Self::SIZE * 2 {
            return Err(VigilError::Internal(format!(
                "hash hex must be {} characters, got {}",
                Self::SIZE * 2,
                s.len()
            )));
        }
        let mut out = [0u8; Self::SIZE];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| VigilError::Internal("hash hex is not ASCII".into()))?;
            out[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| VigilError::Internal(format!("invalid hash hex pair '{pair}'")))?;
        }
        Ok(Hash(out))
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = VigilError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VigilError::Internal(format!("hash must be 32 bytes, got {}", bytes.len())))?;
        Ok(Hash(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Scanning status of a queued skylink.
///
/// Transitions: `new -> scanning` (claim), `scanning -> complete` (clean
/// verdict), `scanning -> unreported` (infected verdict),
/// `unreported -> complete` (reported to blocker), `scanning -> new`
/// (scanner error or expired lease).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    New,
    Scanning,
    Unreported,
    Complete,
}

/// A skylink in the scanning queue together with its verdict fields.
///
/// One record exists per unique content hash. Records are never deleted;
/// once the verdict is terminal the skylink string itself is cleared so
/// the store does not accumulate an index of harmful content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Store-assigned identifier. `None` until the record is inserted.
    pub id: Option<i64>,
    /// Canonical content hash. Never mutated after creation.
    pub hash: Hash,
    /// The identifier as originally submitted. Cleared once the verdict
    /// is terminal.
    pub skylink: String,
    /// Queue status.
    pub status: ScanStatus,
    /// Whether the scanner flagged the content. Meaningful only when
    /// status is `unreported` or `complete`.
    pub infected: bool,
    /// Scanner-produced description of the detected malware.
    pub infection_description: String,
    /// Full content length as reported by the portal.
    pub size: u64,
    /// Bytes actually streamed through the scanner.
    pub scanned_size: u64,
    /// Whether the whole content was streamed (`scanned_size == size`).
    pub scanned_all_content: bool,
    /// Reserved for offset-range re-scans. Always persisted false.
    pub scanned_all_offsets: bool,
    /// Updated on every state transition. While `scanning` this is the
    /// moment the claim was taken and is the basis for the reaper.
    pub timestamp: DateTime<Utc>,
}

impl ScanRecord {
    /// Creates a fresh queue entry for the given skylink and hash.
    pub fn new(skylink: String, hash: Hash) -> Self {
        Self {
            id: None,
            hash,
            skylink,
            status: ScanStatus::New,
            infected: false,
            infection_description: String::new(),
            size: 0,
            scanned_size: 0,
            scanned_all_content: false,
            scanned_all_offsets: false,
            timestamp: Utc::now(),
        }
    }
}

/// Verdict from scanning a raw byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanVerdict {
    /// Whether malware was found.
    pub infected: bool,
    /// Signature name or description reported by the scanner.
    pub description: String,
}

/// Verdict from scanning a skylink's content, including how much of it
/// was actually streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub infected: bool,
    pub description: String,
    /// Content length the portal reported.
    pub size: u64,
    /// Bytes read from the portal before the scanner returned.
    pub scanned_size: u64,
}
