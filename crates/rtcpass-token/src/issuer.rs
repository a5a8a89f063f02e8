//! Token assembly and signing.
//!
//! A token is `VERSION | app_id | base64(content)`, where the content is the
//! signed structure from [`crate::message`]. The issuer holds the application
//! credentials and is immutable once built, so one instance can be shared
//! across any number of request handlers.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::Zeroizing;

use crate::codec::length_prefix;
use crate::error::TokenError;
use crate::message::{ChecksumMode, SignableMessage, SignedContent, compute_signature};
use crate::privilege::{PrivilegeSet, Role};

/// Version tag every token starts with.
pub const VERSION: &str = "007";

/// Default token lifetime: 24 hours.
pub const DEFAULT_VALIDITY_SECS: u32 = 86_400;

/// Number of token characters kept when a token is logged.
const LOG_PREFIX_CHARS: usize = 16;

/// Application identifier and signing secret.
pub struct AppCredentials {
    app_id: String,
    app_secret: Zeroizing<String>,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

impl AppCredentials {
    /// Both values must be non-blank.
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Result<Self, TokenError> {
        let app_id = app_id.into();
        let app_secret = Zeroizing::new(app_secret.into());
        if app_id.trim().is_empty() {
            return Err(TokenError::MissingAppId);
        }
        if app_secret.trim().is_empty() {
            return Err(TokenError::MissingAppSecret);
        }
        Ok(Self { app_id, app_secret })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    fn secret_bytes(&self) -> &[u8] {
        self.app_secret.as_bytes()
    }
}

/// Identity of the participant a token is issued for.
///
/// Integers and strings are both accepted and normalised to their decimal
/// or literal string form. `"0"` means any participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    /// The wildcard subject.
    pub fn any() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_any(&self) -> bool {
        self.0 == "0"
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::any()
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        if value.is_empty() { Self::any() } else { Self(value) }
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<u64> for SubjectId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for SubjectId {
    fn from(value: u32) -> Self {
        Self::from(u64::from(value))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of one issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub channel_name: String,
    pub subject_id: SubjectId,
    pub role: Role,
}

impl TokenRequest {
    pub fn new(channel_name: impl Into<String>, subject_id: impl Into<SubjectId>, role: Role) -> Self {
        Self {
            channel_name: channel_name.into(),
            subject_id: subject_id.into(),
            role,
        }
    }
}

/// A freshly issued token plus the values the client SDK needs alongside it.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub app_id: String,
    pub channel_name: String,
    pub subject_id: SubjectId,
    pub role: Role,
    pub issued_at: u32,
    pub expires_at: u32,
}

impl IssuedToken {
    /// Loggable form of the token: a short prefix followed by `...`.
    pub fn redacted(&self) -> String {
        redact_token(&self.token)
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &self.redacted())
            .field("app_id", &self.app_id)
            .field("channel_name", &self.channel_name)
            .field("subject_id", &self.subject_id)
            .field("role", &self.role)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Truncate a bearer token for logging.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(LOG_PREFIX_CHARS).collect();
    format!("{prefix}...")
}

/// Builds and signs join tokens for one application.
#[derive(Debug)]
pub struct TokenIssuer {
    credentials: AppCredentials,
    validity_secs: u32,
    checksum_mode: ChecksumMode,
}

impl TokenIssuer {
    pub const fn new(credentials: AppCredentials, validity_secs: u32) -> Self {
        Self {
            credentials,
            validity_secs,
            checksum_mode: ChecksumMode::Zeroed,
        }
    }

    #[must_use]
    pub fn with_checksum_mode(mut self, mode: ChecksumMode) -> Self {
        self.checksum_mode = mode;
        self
    }

    pub fn app_id(&self) -> &str {
        self.credentials.app_id()
    }

    pub const fn validity_secs(&self) -> u32 {
        self.validity_secs
    }

    pub const fn checksum_mode(&self) -> ChecksumMode {
        self.checksum_mode
    }

    /// Issue a token stamped with the current time and a random salt.
    pub fn issue(&self, request: &TokenRequest) -> Result<IssuedToken, TokenError> {
        let issued_at = now_secs()?;
        let salt = OsRng.next_u32();
        self.issue_at(request, issued_at, salt)
    }

    /// Issue a token for a fixed issuance time and salt.
    ///
    /// The output depends only on the inputs and the issuer's configuration.
    pub fn issue_at(
        &self,
        request: &TokenRequest,
        issued_at: u32,
        salt: u32,
    ) -> Result<IssuedToken, TokenError> {
        let channel_name = request.channel_name.as_str();
        if channel_name.is_empty() {
            return Err(TokenError::EmptyChannelName);
        }
        length_prefix("channelName", channel_name.len())?;

        let expires_at = issued_at
            .checked_add(self.validity_secs)
            .ok_or(TokenError::ExpiryOverflow {
                issued_at,
                validity_secs: self.validity_secs,
            })?;

        let message = SignableMessage {
            salt,
            issued_at,
            privileges: PrivilegeSet::for_role(request.role, expires_at),
        }
        .pack()?;

        let app_id = self.credentials.app_id();
        let subject_id = request.subject_id.as_str();
        let signature = compute_signature(
            self.credentials.secret_bytes(),
            app_id,
            channel_name,
            subject_id,
            &message,
        );
        let (channel_checksum, subject_checksum) =
            self.checksum_mode.checksums(channel_name, subject_id);

        let content = SignedContent {
            signature,
            channel_checksum,
            subject_checksum,
            message,
        }
        .pack()?;

        let encoded = STANDARD.encode(&content);
        let mut token = String::with_capacity(VERSION.len() + app_id.len() + encoded.len());
        token.push_str(VERSION);
        token.push_str(app_id);
        token.push_str(&encoded);

        let issued = IssuedToken {
            token,
            app_id: app_id.to_string(),
            channel_name: channel_name.to_string(),
            subject_id: request.subject_id.clone(),
            role: request.role,
            issued_at,
            expires_at,
        };
        debug!(
            channel = %issued.channel_name,
            subject = %issued.subject_id,
            role = %issued.role,
            expires_at,
            token_prefix = %issued.redacted(),
            "Issued join token"
        );
        Ok(issued)
    }
}

fn now_secs() -> Result<u32, TokenError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    u32::try_from(secs).map_err(|_| TokenError::ClockOutOfRange)
}
