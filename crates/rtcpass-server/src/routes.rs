use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use rtcpass_core::config::IssuerConfig;
use rtcpass_token::{AppCredentials, Role, SubjectId, TokenError, TokenIssuer, TokenRequest};

use crate::error::ApiError;

/// Token requests are a few short strings.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer: Arc::new(issuer) }
    }

    /// Build the issuer from settings and the two server-held secrets.
    ///
    /// Missing or blank secrets are a configuration error.
    pub fn from_config(
        config: &IssuerConfig,
        app_id: Option<String>,
        app_secret: Option<String>,
    ) -> Result<Self, TokenError> {
        let credentials =
            AppCredentials::new(app_id.unwrap_or_default(), app_secret.unwrap_or_default())?;
        let issuer = TokenIssuer::new(credentials, config.validity_secs)
            .with_checksum_mode(config.checksum_mode);
        Ok(Self::new(issuer))
    }
}

/// Participant id as sent by the client: a JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Uid {
    Number(u64),
    Text(String),
}

impl Default for Uid {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl Uid {
    /// Empty strings mean "any participant", like an absent uid.
    fn normalized(self) -> Self {
        match self {
            Self::Text(s) if s.is_empty() => Self::default(),
            other => other,
        }
    }
}

impl From<&Uid> for SubjectId {
    fn from(uid: &Uid) -> Self {
        match uid {
            Uid::Number(n) => Self::from(*n),
            Uid::Text(s) => Self::from(s.as_str()),
        }
    }
}

/// `POST /agora-token` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestBody {
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub uid: Option<Uid>,
    #[serde(default)]
    pub role: Option<i64>,
}

/// `POST /agora-token` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub app_id: String,
    pub channel: String,
    pub uid: Uid,
}

/// Issue a token for the body's request with `issuer`.
pub fn issue_for(issuer: &TokenIssuer, body: TokenRequestBody) -> Result<TokenResponse, ApiError> {
    let channel_name = body.channel_name.unwrap_or_default();
    let uid = body.uid.unwrap_or_default().normalized();
    let role = body.role.map_or(Ok(Role::default()), Role::try_from)?;

    let request = TokenRequest::new(channel_name, SubjectId::from(&uid), role);
    let issued = issuer.issue(&request)?;

    info!(
        channel = %issued.channel_name,
        subject = %issued.subject_id,
        role = %issued.role,
        expires_at = issued.expires_at,
        token_prefix = %issued.redacted(),
        "Issued join token"
    );

    Ok(TokenResponse {
        token: issued.token,
        app_id: issued.app_id,
        channel: issued.channel_name,
        uid,
    })
}

/// `POST /agora-token`
pub async fn agora_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequestBody>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Malformed token request body");
        ApiError::BadRequest(rejection.body_text())
    })?;
    issue_for(&state.issuer, body).map(Json)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// CORS policy for browser clients calling the token endpoint directly.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| {
                HeaderValue::from_str(o)
                    .inspect_err(|e| warn!(origin = %o, error = %e, "Ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ])
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/agora-token", post(agora_token))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(AppCredentials::new("app", "secret").unwrap(), 60)
    }

    #[test]
    fn absent_uid_echoes_zero() {
        let body = TokenRequestBody {
            channel_name: Some("room".to_string()),
            ..Default::default()
        };
        let resp = issue_for(&issuer(), body).unwrap();
        assert_eq!(resp.uid, Uid::Number(0));
        assert_eq!(resp.channel, "room");
        assert_eq!(resp.app_id, "app");
    }

    #[test]
    fn empty_string_uid_becomes_zero() {
        let body = TokenRequestBody {
            channel_name: Some("room".to_string()),
            uid: Some(Uid::Text(String::new())),
            role: None,
        };
        assert_eq!(issue_for(&issuer(), body).unwrap().uid, Uid::Number(0));
    }

    #[test]
    fn invalid_role_is_bad_request() {
        let body = TokenRequestBody {
            channel_name: Some("room".to_string()),
            uid: None,
            role: Some(3),
        };
        let err = issue_for(&issuer(), body).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn missing_secrets_fail_state_construction() {
        let config = IssuerConfig::default();
        let err = AppState::from_config(&config, Some("app".to_string()), None).err().unwrap();
        assert!(matches!(err, TokenError::MissingAppSecret));
        let err = AppState::from_config(&config, None, Some("s".to_string())).err().unwrap();
        assert!(matches!(err, TokenError::MissingAppId));
    }

    #[test]
    fn uid_deserializes_from_number_or_string() {
        let n: Uid = serde_json::from_str("42").unwrap();
        assert_eq!(n, Uid::Number(42));
        let s: Uid = serde_json::from_str("\"user-9\"").unwrap();
        assert_eq!(s, Uid::Text("user-9".to_string()));
    }
}
