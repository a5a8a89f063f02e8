//! Token decoding for tests.
//!
//! Reverses the issuer's packing so tests can check what went into a token.
//! Production verification happens in the media network, not here.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::Mac;

use crate::codec::Unpacker;
use crate::error::TokenError;
use crate::issuer::VERSION;
use crate::message::{SIGNATURE_SIZE, signing_mac};
use crate::privilege::{Privilege, PrivilegeSet};

/// Every field recovered from a token string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub app_id: String,
    pub signature: [u8; SIGNATURE_SIZE],
    pub channel_checksum: u32,
    pub subject_checksum: u32,
    /// Raw message bytes, as signed.
    pub message: Vec<u8>,
    pub salt: u32,
    pub issued_at: u32,
    pub privileges: PrivilegeSet,
}

impl DecodedToken {
    /// Decode `token`, which must have been issued for `app_id`.
    ///
    /// The app id is fixed-width and not length-prefixed, so the caller has
    /// to supply it.
    pub fn parse(token: &str, app_id: &str) -> Result<Self, TokenError> {
        let rest = token
            .strip_prefix(VERSION)
            .ok_or_else(|| TokenError::Malformed(format!("missing version {VERSION}")))?;
        let encoded = rest
            .strip_prefix(app_id)
            .ok_or_else(|| TokenError::Malformed("app id does not match".to_string()))?;
        let content = STANDARD
            .decode(encoded)
            .map_err(|e| TokenError::Malformed(format!("base64: {e}")))?;

        let mut reader = Unpacker::new(&content);
        let raw_signature = reader.bytes()?;
        if raw_signature.len() != SIGNATURE_SIZE {
            return Err(TokenError::Malformed(format!(
                "signature is {} bytes, expected {SIGNATURE_SIZE}",
                raw_signature.len()
            )));
        }
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(raw_signature);
        let channel_checksum = reader.u32()?;
        let subject_checksum = reader.u32()?;
        let message = reader.bytes()?.to_vec();
        if reader.remaining() != 0 {
            return Err(TokenError::Malformed("trailing bytes after message".to_string()));
        }

        let mut msg = Unpacker::new(&message);
        let salt = msg.u32()?;
        let issued_at = msg.u32()?;
        let count = msg.u16()?;
        let mut privileges = PrivilegeSet::new();
        for _ in 0..count {
            let code = msg.u16()?;
            let expires_at = msg.u32()?;
            let privilege = Privilege::from_code(code)
                .ok_or_else(|| TokenError::Malformed(format!("unknown privilege code {code}")))?;
            privileges.insert(privilege, expires_at);
        }
        if msg.remaining() != 0 {
            return Err(TokenError::Malformed("trailing bytes after privileges".to_string()));
        }

        Ok(Self {
            app_id: app_id.to_string(),
            signature,
            channel_checksum,
            subject_checksum,
            message,
            salt,
            issued_at,
            privileges,
        })
    }

    /// Check the signature against `app_secret` for the given channel and
    /// subject. Comparison is constant-time.
    pub fn verify(&self, app_secret: &[u8], channel_name: &str, subject_id: &str) -> bool {
        let mut mac = signing_mac(app_secret);
        mac.update(self.app_id.as_bytes());
        mac.update(channel_name.as_bytes());
        mac.update(subject_id.as_bytes());
        mac.update(&self.message);
        mac.verify_slice(&self.signature).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::issuer::{AppCredentials, TokenIssuer, TokenRequest};
    use crate::privilege::Role;

    const APP_ID: &str = "0123456789abcdef0123456789abcdef";

    fn token() -> String {
        let creds = AppCredentials::new(APP_ID, "s3cret").unwrap();
        TokenIssuer::new(creds, 60)
            .issue_at(&TokenRequest::new("lobby", 9u64, Role::Subscriber), 500, 42)
            .unwrap()
            .token
    }

    #[test]
    fn wrong_secret_or_channel_fails_verification() {
        let decoded = DecodedToken::parse(&token(), APP_ID).unwrap();
        assert!(decoded.verify(b"s3cret", "lobby", "9"));
        assert!(!decoded.verify(b"other", "lobby", "9"));
        assert!(!decoded.verify(b"s3cret", "lobby2", "9"));
        assert!(!decoded.verify(b"s3cret", "lobby", "0"));
    }

    #[test]
    fn wrong_app_id_is_malformed() {
        let err = DecodedToken::parse(&token(), "ffffffffffffffffffffffffffffffff").unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn missing_version_is_malformed() {
        let t = token();
        let err = DecodedToken::parse(&t[3..], APP_ID).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let t = token();
        let truncated = &t[..t.len() - 8];
        assert!(DecodedToken::parse(truncated, APP_ID).is_err());
    }

    #[test]
    fn message_bytes_survive_unchanged() {
        let decoded = DecodedToken::parse(&token(), APP_ID).unwrap();
        // salt 42 | issued_at 500 | 1 privilege | JoinChannel until 560
        assert_eq!(
            decoded.message,
            vec![42, 0, 0, 0, 0xF4, 0x01, 0, 0, 1, 0, 1, 0, 0x30, 0x02, 0, 0]
        );
    }
}
