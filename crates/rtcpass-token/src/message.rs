//! Signable message and signed content packing.
//!
//! Message (the bytes covered by the signature, after the caller's identity):
//!
//! ```text
//! u32 salt | u32 issued_at | privileges
//! ```
//!
//! Content (what gets base64-encoded into the token):
//!
//! ```text
//! u16 len | signature | u32 channel_checksum | u32 subject_checksum | u16 len | message
//! ```

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::codec::Packer;
use crate::error::TokenError;
use crate::privilege::PrivilegeSet;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 digest.
pub const SIGNATURE_SIZE: usize = 32;

/// What to write into the two reserved checksum fields of the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Both fields are zero.
    #[default]
    Zeroed,
    /// CRC-32 (IEEE) of the channel name and of the subject id.
    Crc32,
}

impl ChecksumMode {
    /// Checksum values for `channel_name` and `subject_id` under this mode.
    pub fn checksums(self, channel_name: &str, subject_id: &str) -> (u32, u32) {
        match self {
            Self::Zeroed => (0, 0),
            Self::Crc32 => (
                crc32fast::hash(channel_name.as_bytes()),
                crc32fast::hash(subject_id.as_bytes()),
            ),
        }
    }
}

impl std::str::FromStr for ChecksumMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zeroed" | "zero" | "none" => Ok(Self::Zeroed),
            "crc32" => Ok(Self::Crc32),
            other => Err(format!("unknown checksum mode '{other}' (expected zeroed or crc32)")),
        }
    }
}

impl std::fmt::Display for ChecksumMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zeroed => write!(f, "zeroed"),
            Self::Crc32 => write!(f, "crc32"),
        }
    }
}

/// The part of a token covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableMessage {
    pub salt: u32,
    pub issued_at: u32,
    pub privileges: PrivilegeSet,
}

impl SignableMessage {
    pub fn pack(&self) -> Result<Vec<u8>, TokenError> {
        let mut packer = Packer::with_capacity(10 + 6 * self.privileges.len());
        packer.put_u32(self.salt).put_u32(self.issued_at);
        self.privileges.pack_into(&mut packer)?;
        Ok(packer.into_bytes())
    }
}

/// HMAC-SHA256 keyed by `app_secret` over the raw concatenation
/// `app_id | channel_name | subject_id | message`.
pub fn compute_signature(
    app_secret: &[u8],
    app_id: &str,
    channel_name: &str,
    subject_id: &str,
    message: &[u8],
) -> [u8; SIGNATURE_SIZE] {
    let mut mac = signing_mac(app_secret);
    mac.update(app_id.as_bytes());
    mac.update(channel_name.as_bytes());
    mac.update(subject_id.as_bytes());
    mac.update(message);
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&mac.finalize().into_bytes());
    signature
}

/// Keyed MAC over the signing input.
#[allow(clippy::expect_used)] // HMAC takes keys of any length
pub(crate) fn signing_mac(app_secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(app_secret).expect("HMAC can take key of any size")
}

/// The signed structure carried (base64-encoded) in the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedContent {
    pub signature: [u8; SIGNATURE_SIZE],
    pub channel_checksum: u32,
    pub subject_checksum: u32,
    pub message: Vec<u8>,
}

impl SignedContent {
    pub fn pack(&self) -> Result<Vec<u8>, TokenError> {
        let mut packer = Packer::with_capacity(2 + SIGNATURE_SIZE + 8 + 2 + self.message.len());
        packer.put_bytes("signature", &self.signature)?;
        packer.put_u32(self.channel_checksum).put_u32(self.subject_checksum);
        packer.put_bytes("message", &self.message)?;
        Ok(packer.into_bytes())
    }
}
