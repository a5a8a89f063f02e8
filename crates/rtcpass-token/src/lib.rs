//! Join tokens for real-time audio/video channels.
//!
//! A token authorizes one subject to join a named channel, with a role that
//! decides which publish privileges come with it, until an absolute expiry.
//!
//! ## Layers
//!
//! - **codec**: little-endian `u16`/`u32` and `u16`-length-prefixed bytes
//! - **privilege**: roles, privileges and the ordered privilege → expiry map
//! - **message**: signable message, HMAC-SHA256 signature, signed content
//! - **issuer**: credentials, clock + salt, base64 framing behind the `007` tag
//!
//! Verification is done by the media network; [`inspect`] only exists for
//! tests (`test-utils` feature).

pub mod codec;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod inspect;
pub mod issuer;
pub mod message;
pub mod privilege;

pub use error::{ErrorKind, TokenError};
#[cfg(any(test, feature = "test-utils"))]
pub use inspect::DecodedToken;
pub use issuer::{
    AppCredentials, DEFAULT_VALIDITY_SECS, IssuedToken, SubjectId, TokenIssuer, TokenRequest,
    VERSION, redact_token,
};
pub use message::{ChecksumMode, SignableMessage, SignedContent, compute_signature};
pub use privilege::{Privilege, PrivilegeSet, Role};
