//! Signed session tokens and the request-level auth extractor.
//!
//! Sessions are explicit signed tokens, not client-trusted state:
//!
//! ```text
//! TSES1.<base64url claims JSON>.<base64url HMAC-SHA256 signature>
//! ```
//!
//! The expiry is part of the signed claims, so a client cannot extend its
//! own session. Tokens are minted at login and verified server-side on
//! every protected request via the [`Session`] extractor.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::app_state::AppState;
use crate::domain::{Profile, ProfileId, Role};
use crate::error::ServerError;

type HmacSha256 = Hmac<Sha256>;

/// Version tag prefixing every token this build mints.
const TOKEN_VERSION: &str = "TSES1";

/// Upper bound on accepted token length; anything longer is rejected
/// before any decoding work.
const MAX_TOKEN_LEN: usize = 1024;

/// The signed claims carried inside a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated profile.
    pub profile_id: ProfileId,
    /// Role at mint time.
    pub role: Role,
    /// Expiry instant; part of the signature.
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    /// Creates a key set with the given secret and token lifetime.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Mints a token for a profile, stamping the expiry claim.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] on serialization or key failure.
    pub fn mint(&self, profile: &Profile) -> Result<String, ServerError> {
        let claims = SessionClaims {
            profile_id: profile.id,
            role: profile.role,
            expires_at: Utc::now() + self.ttl,
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| ServerError::Internal(format!("claims serialization: {e}")))?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);
        let sig_part = URL_SAFE_NO_PAD.encode(self.signature(&payload_part)?);
        Ok(format!("{TOKEN_VERSION}.{payload_part}.{sig_part}"))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Unauthorized`] on any malformation, bad
    /// signature, or expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ServerError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(ServerError::Unauthorized("token too long".to_string()));
        }
        let mut parts = token.split('.');
        let (Some(version), Some(payload_part), Some(sig_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ServerError::Unauthorized("malformed token".to_string()));
        };
        if version != TOKEN_VERSION {
            return Err(ServerError::Unauthorized(format!(
                "unsupported token version: {version}"
            )));
        }

        let provided = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| ServerError::Unauthorized("malformed signature".to_string()))?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("hmac key: {e}")))?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| ServerError::Unauthorized("signature mismatch".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| ServerError::Unauthorized("malformed payload".to_string()))?;
        let claims: SessionClaims = serde_json::from_slice(&payload)
            .map_err(|_| ServerError::Unauthorized("malformed claims".to_string()))?;

        if claims.expires_at <= Utc::now() {
            return Err(ServerError::Unauthorized("session expired".to_string()));
        }
        Ok(claims)
    }

    fn signature(&self, payload_part: &str) -> Result<Vec<u8>, ServerError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("hmac key: {e}")))?;
        mac.update(payload_part.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Authenticated request identity, extracted from the `Authorization:
/// Bearer` header.
#[derive(Debug, Clone)]
pub struct Session {
    /// Verified claims.
    pub claims: SessionClaims,
}

impl Session {
    /// Returns the authenticated profile id.
    #[must_use]
    pub const fn profile_id(&self) -> ProfileId {
        self.claims.profile_id
    }

    /// Converts the session into the service-layer actor identity.
    #[must_use]
    pub const fn actor(&self) -> crate::service::Actor {
        crate::service::Actor {
            profile_id: self.claims.profile_id,
            role: self.claims.role,
        }
    }

    /// Returns the authenticated role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.claims.role
    }

    /// Requires an exact role.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] when the session role differs.
    pub fn require_role(&self, role: Role) -> Result<(), ServerError> {
        if self.claims.role == role {
            Ok(())
        } else {
            Err(ServerError::Forbidden(format!("requires {role} role")))
        }
    }

    /// Requires a role allowed to operate a check-in scanner.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Forbidden`] for non-staff roles.
    pub fn require_scanner(&self) -> Result<(), ServerError> {
        if self.claims.role.can_scan() {
            Ok(())
        } else {
            Err(ServerError::Forbidden(
                "requires volunteer, organizer, or admin role".to_string(),
            ))
        }
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServerError::Unauthorized("missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServerError::Unauthorized("expected Bearer token".to_string()))?;
        let claims = state.sessions.verify(token)?;
        Ok(Self { claims })
    }
}

impl OptionalFromRequestParts<AppState> for Session {
    type Rejection = ServerError;

    /// Absent credentials yield `None`; present-but-invalid credentials
    /// still reject, so a bad token is never silently anonymous.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if parts.headers.get(AUTHORIZATION).is_none() {
            return Ok(None);
        }
        <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_keys() -> SessionKeys {
        SessionKeys::new(*b"test-session-secret", Duration::minutes(30))
    }

    fn make_profile(role: Role) -> Profile {
        Profile::new("Test User", "user@campus.edu", role)
    }

    #[test]
    fn mint_verify_round_trip() {
        let keys = make_keys();
        let profile = make_profile(Role::Volunteer);
        let token = keys.mint(&profile);
        let Ok(token) = token else {
            panic!("minting must succeed");
        };
        assert!(token.starts_with("TSES1."));

        let claims = keys.verify(&token);
        let Ok(claims) = claims else {
            panic!("fresh token must verify");
        };
        assert_eq!(claims.profile_id, profile.id);
        assert_eq!(claims.role, Role::Volunteer);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new(*b"test-session-secret", Duration::minutes(-5));
        let token = keys.mint(&make_profile(Role::Student)).unwrap_or_default();
        let result = keys.verify(&token);
        assert!(matches!(result, Err(ServerError::Unauthorized(_))));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let keys = make_keys();
        let token = keys.mint(&make_profile(Role::Student)).unwrap_or_default();
        // Flip a character inside the payload part.
        let tampered = token.replacen('.', ".A", 1);
        assert!(keys.verify(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let keys = make_keys();
        let other = SessionKeys::new(*b"another-secret", Duration::minutes(30));
        let token = keys.mint(&make_profile(Role::Admin)).unwrap_or_default();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let keys = make_keys();
        for raw in ["", "TSES1", "TSES1.only-two", "TSES2.a.b", "a.b.c.d"] {
            assert!(keys.verify(raw).is_err(), "input: {raw:?}");
        }
    }

    #[test]
    fn role_gates() {
        let keys = make_keys();
        let token = keys
            .mint(&make_profile(Role::Student))
            .unwrap_or_default();
        let claims = keys.verify(&token).ok().unwrap_or_else(|| {
            panic!("token must verify");
        });
        let session = Session { claims };
        assert!(session.require_role(Role::Student).is_ok());
        assert!(session.require_role(Role::Admin).is_err());
        assert!(session.require_scanner().is_err());
    }
}
