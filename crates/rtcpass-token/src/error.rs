//! Token issuance error types.

/// Broad category of a [`TokenError`], used by callers to pick a response
/// status without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server-held credentials are missing or unusable.
    Configuration,
    /// The caller asked for something the issuer refuses to sign.
    Validation,
    /// A value does not fit its wire field.
    Encoding,
    /// A token could not be decoded (inspection only).
    Malformed,
}

/// Errors from building or inspecting join tokens.
///
/// None of the messages carry the application secret.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Application ID is not configured")]
    MissingAppId,

    #[error("Application secret is not configured")]
    MissingAppSecret,

    #[error("channelName is required")]
    EmptyChannelName,

    #[error("Invalid role {0}: expected 0 (subscriber) or 1 (publisher)")]
    InvalidRole(i64),

    #[error("Token validity of {validity_secs}s from {issued_at} overflows the expiry timestamp")]
    ExpiryOverflow { issued_at: u32, validity_secs: u32 },

    #[error("System clock is outside the 32-bit timestamp range")]
    ClockOutOfRange,

    #[error("{field} is {len} bytes, exceeding the 16-bit length prefix")]
    LengthOverflow { field: &'static str, len: usize },

    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { bits: u8, value: u64 },

    #[error("Malformed token: {0}")]
    Malformed(String),
}

impl TokenError {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAppId | Self::MissingAppSecret => ErrorKind::Configuration,
            Self::EmptyChannelName
            | Self::InvalidRole(_)
            | Self::ExpiryOverflow { .. }
            | Self::ClockOutOfRange => ErrorKind::Validation,
            Self::LengthOverflow { .. } | Self::ValueOutOfRange { .. } => ErrorKind::Encoding,
            Self::Malformed(_) => ErrorKind::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(TokenError::MissingAppSecret.kind(), ErrorKind::Configuration);
        assert_eq!(TokenError::EmptyChannelName.kind(), ErrorKind::Validation);
        assert_eq!(
            TokenError::ExpiryOverflow { issued_at: 1, validity_secs: 2 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            TokenError::LengthOverflow { field: "message", len: 70_000 }.kind(),
            ErrorKind::Encoding
        );
    }

    #[test]
    fn overflow_message_names_inputs() {
        let err = TokenError::ExpiryOverflow { issued_at: 1_700_000_000, validity_secs: 4_000_000_000 };
        let msg = err.to_string();
        assert!(msg.contains("1700000000"));
        assert!(msg.contains("4000000000s"));
    }
}
