//! rtcpass edge endpoint
//!
//! HTTP front for the join-token issuer: validates the request body,
//! issues a token with the server-held credentials and returns it with the
//! application id the client SDK needs.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, TokenRequestBody, TokenResponse, Uid, build_router};
