//! JWT claim decoding.
//!
//! Tokens are opaque bearer credentials; the client never verifies
//! signatures. Only the claims segment is decoded, for the `exp`
//! timestamp and the identity claims a session id is derived from.

use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Claims the client reads from an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since epoch (UTC).
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(rename = "tenant-id", alias = "tenantId", default)]
    pub tenant_id: Option<String>,
    #[serde(rename = "external-user-id", alias = "externalUserId", default)]
    pub external_user_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl TokenClaims {
    /// External identity, falling back to the subject claim.
    pub fn user_identity(&self) -> Option<&str> {
        self.external_user_id.as_deref().or(self.sub.as_deref())
    }

    /// Seconds until expiry; negative once the token has expired.
    pub fn expires_in(&self) -> i64 {
        self.exp - Utc::now().timestamp()
    }
}

/// Decode the claims segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> ServiceResult<TokenClaims> {
    let mut segments = token.split('.');
    let (_header, payload) = match (segments.next(), segments.next()) {
        (Some(h), Some(p)) if !p.is_empty() => (h, p),
        _ => {
            return Err(ServiceError::validation(
                "token is not a three-segment JWT",
            ))
        }
    };
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let raw = engine
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ServiceError::validation(format!("token payload is not base64url: {}", e)))?;
    serde_json::from_slice(&raw)
        .map_err(|e| ServiceError::validation(format!("token claims are not valid JSON: {}", e)))
}

/// Stable session id for a token: a UUID v5 over the identity claims,
/// so the same tenant/user pair always maps to the same session slot.
pub fn session_id_for(token: &str, claims: &TokenClaims) -> String {
    let seed = match (claims.tenant_id.as_deref(), claims.user_identity()) {
        (Some(tenant), Some(user)) => format!("{}/{}", tenant, user),
        _ => token.to_string(),
    };
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::Engine;

    /// Build an unsigned JWT with the given claims for tests.
    pub fn make_token(claims: &serde_json::Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = engine.encode(claims.to_string().as_bytes());
        format!("{}.{}.sig", header, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::test_tokens::make_token;
    use super::*;

    #[test]
    fn decodes_expiry_and_identity() {
        let token = make_token(&serde_json::json!({
            "exp": 4102444800i64,
            "tenant-id": "t-1",
            "external-user-id": "alice",
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 4102444800);
        assert_eq!(claims.tenant_id.as_deref(), Some("t-1"));
        assert_eq!(claims.user_identity(), Some("alice"));
        assert!(claims.expires_in() > 0);
    }

    #[test]
    fn subject_fallback() {
        let token = make_token(&serde_json::json!({"exp": 1, "sub": "bob"}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.user_identity(), Some("bob"));
        assert!(claims.expires_in() < 0);
    }

    #[test]
    fn rejects_non_jwt_input() {
        assert!(decode_claims("not-a-token").is_err());
        assert!(decode_claims("a.!!!.c").is_err());
    }

    #[test]
    fn session_ids_are_stable_per_identity() {
        let claims_a = decode_claims(&make_token(
            &serde_json::json!({"exp": 10, "tenant-id": "t", "external-user-id": "u"}),
        ))
        .unwrap();
        let claims_b = decode_claims(&make_token(
            &serde_json::json!({"exp": 99, "tenant-id": "t", "external-user-id": "u"}),
        ))
        .unwrap();
        assert_eq!(
            session_id_for("tok-a", &claims_a),
            session_id_for("tok-b", &claims_b)
        );
    }
}
