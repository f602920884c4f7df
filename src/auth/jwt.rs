use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{auth::repo::User, config::JwtConfig, state::AppState};

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_USER: &str = "User";

/// JWT payload minted at login and checked on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub jti: Uuid,
    pub roles: Vec<String>,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            expire_days,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((expire_days as u64) * 24 * 60 * 60),
        }
    }
}

impl JwtKeys {
    /// Signs a session token carrying the user's current role set. The jti
    /// is fresh per token; everything else is deterministic for a given
    /// user and instant.
    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            name: user.full_name.clone(),
            email: user.email.clone(),
            jti: Uuid::new_v4(),
            roles: user.roles.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Caller identity resolved from the bearer token before a handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        Ok(AuthUser {
            id: claims.sub,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn sample_user(roles: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            full_name: "Ada Example".into(),
            password_hash: "unused".into(),
            email_confirmed: true,
            profile_picture: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            security_stamp: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user = sample_user(&[ROLE_USER]);
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.name, "Ada Example");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.roles, vec![ROLE_USER.to_string()]);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn fresh_jti_per_token() {
        let keys = make_keys();
        let user = sample_user(&[ROLE_USER]);
        let a = keys.verify(&keys.sign(&user).unwrap()).unwrap();
        let b = keys.verify(&keys.sign(&user).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[tokio::test]
    async fn tampered_signature_rejected() {
        let keys = make_keys();
        let token = keys.sign(&sample_user(&[ROLE_USER])).expect("sign");
        // flip the first character of the signature segment
        let dot = token.rfind('.').expect("three segments");
        let mut chars: Vec<char> = token.chars().collect();
        chars[dot + 1] = if chars[dot + 1] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert_ne!(token, tampered);
        assert!(keys.verify(&tampered).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_foreign_issuer_and_audience() {
        let keys = make_keys();
        let foreign = JwtKeys {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            issuer: "someone-else".into(),
            audience: "their-users".into(),
            ttl: Duration::from_secs(3600),
        };
        let token = foreign.sign(&sample_user(&[ROLE_USER])).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn admin_role_survives_the_roundtrip() {
        let keys = make_keys();
        let token = keys.sign(&sample_user(&[ROLE_ADMIN, ROLE_USER])).unwrap();
        let claims = keys.verify(&token).unwrap();
        let caller = AuthUser {
            id: claims.sub,
            roles: claims.roles,
        };
        assert!(caller.is_admin());

        let plain = AuthUser {
            id: Uuid::new_v4(),
            roles: vec![ROLE_USER.to_string()],
        };
        assert!(!plain.is_admin());
    }
}
