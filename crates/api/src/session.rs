//! Session token codec.
//!
//! The bearer credential is an HS256-signed token embedding the cached
//! session claims. The codec is the only place that knows the wire shape;
//! guards and store logic only ever see `SessionClaims`. Decoded values pass
//! through the claims normalizer, so a tampered-but-validly-signed payload
//! still cannot smuggle malformed claims downstream.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clavis_auth::{SessionClaims, normalize_role, normalize_scopes, normalize_token_version};
use clavis_core::UserId;

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Uuid>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_version: Option<i64>,
    /// Unix milliseconds of the last successful store reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_verified_at: Option<i64>,
    exp: i64,
}

/// Encoder/decoder for the session token.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, max_age_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            max_age: Duration::seconds(max_age_secs as i64),
        }
    }

    pub fn encode(
        &self,
        claims: &SessionClaims,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let payload = TokenPayload {
            sub: claims.subject.map(|id| *id.as_uuid()),
            role: claims.role.as_str().to_string(),
            scopes: claims.scopes.iter().map(|s| s.as_str().to_string()).collect(),
            token_version: claims.token_version.map(|v| v as i64),
            last_verified_at: claims.last_verified_at.map(|t| t.timestamp_millis()),
            exp: (now + self.max_age).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
    }

    /// Decode and normalize a token. Invalid signature, garbled payload, or
    /// an expired token all yield `None`: the call proceeds anonymously and
    /// the authentication guard takes it from there.
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        let data = jsonwebtoken::decode::<TokenPayload>(token, &self.decoding, &validation).ok()?;
        let payload = data.claims;

        Some(SessionClaims {
            subject: payload.sub.map(UserId::from_uuid),
            role: normalize_role(&payload.role),
            scopes: normalize_scopes(payload.scopes.iter().map(String::as_str)),
            token_version: payload
                .token_version
                .map(|v| normalize_token_version(Some(v))),
            last_verified_at: payload
                .last_verified_at
                .and_then(DateTime::from_timestamp_millis),
        })
    }
}
