use std::time::Duration;

use axum::extract::FromRef;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::repo::User, state::AppState};

const PURPOSE: &str = "confirm_email";
const TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("user not found")]
    InvalidUser,
    /// Bad encoding, bad signature, expiry, wrong purpose, wrong subject,
    /// stale stamp and replay all collapse here so the caller cannot probe
    /// which check failed.
    #[error("invalid confirmation token")]
    InvalidToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfirmClaims {
    sub: Uuid,
    stamp: Uuid,
    purpose: String,
    iat: usize,
    exp: usize,
    iss: String,
    aud: String,
}

/// Mints and validates single-use email-confirmation tokens. Tokens are
/// purpose-tagged JWTs bound to the user's current security stamp, wrapped
/// in URL-safe base64 for use in a link.
#[derive(Clone)]
pub struct ConfirmationTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl FromRef<AppState> for ConfirmationTokens {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        Self {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
        }
    }
}

impl ConfirmationTokens {
    pub fn issue(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(TTL.as_secs() as i64);
        let claims = ConfirmClaims {
            sub: user.id,
            stamp: user.security_stamp,
            purpose: PURPOSE.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let raw = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    fn decode(&self, token: &str) -> Result<ConfirmClaims, ConfirmError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ConfirmError::InvalidToken)?;
        let raw = String::from_utf8(raw).map_err(|_| ConfirmError::InvalidToken)?;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = jsonwebtoken::decode::<ConfirmClaims>(&raw, &self.decoding, &validation)
            .map_err(|_| ConfirmError::InvalidToken)?;
        if data.claims.purpose != PURPOSE {
            return Err(ConfirmError::InvalidToken);
        }
        Ok(data.claims)
    }
}

/// Validates the presented token against the user's current state and flips
/// the confirmed flag exactly once. On success the user becomes eligible to
/// log in.
pub async fn confirm(
    db: &PgPool,
    tokens: &ConfirmationTokens,
    user_id: Uuid,
    token: &str,
) -> Result<(), ConfirmError> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or(ConfirmError::InvalidUser)?;

    let claims = tokens.decode(token)?;
    if claims.sub != user.id || claims.stamp != user.security_stamp || user.email_confirmed {
        return Err(ConfirmError::InvalidToken);
    }

    let confirmed = User::confirm_email(db, user.id, user.security_stamp).await?;
    if !confirmed {
        // lost the race against a concurrent confirmation
        return Err(ConfirmError::InvalidToken);
    }
    debug!(user_id = %user.id, "email confirmed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tokens() -> ConfirmationTokens {
        let state = AppState::fake();
        ConfirmationTokens::from_ref(&state)
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            full_name: "Ada Example".into(),
            password_hash: "unused".into(),
            email_confirmed: false,
            profile_picture: None,
            roles: vec!["User".into()],
            security_stamp: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn issued_token_is_url_safe_and_decodes() {
        let tokens = make_tokens();
        let user = sample_user();
        let token = tokens.issue(&user).expect("issue");
        assert!(!token.contains('+') && !token.contains('/') && !token.contains('='));

        let claims = tokens.decode(&token).expect("decode");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.stamp, user.security_stamp);
        assert_eq!(claims.purpose, "confirm_email");
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let tokens = make_tokens();
        assert!(matches!(
            tokens.decode("not-a-token"),
            Err(ConfirmError::InvalidToken)
        ));
        assert!(matches!(
            tokens.decode(&URL_SAFE_NO_PAD.encode("still-not-a-jwt")),
            Err(ConfirmError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let tokens = make_tokens();
        let token = tokens.issue(&sample_user()).expect("issue");
        let mut chars: Vec<char> = token.chars().collect();
        chars[10] = if chars[10] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert_ne!(token, tampered);
        assert!(matches!(
            tokens.decode(&tampered),
            Err(ConfirmError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn session_tokens_do_not_pass_as_confirmation_tokens() {
        use crate::auth::jwt::JwtKeys;

        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let session = keys.sign(&sample_user()).expect("sign");
        let tokens = make_tokens();
        assert!(matches!(
            tokens.decode(&URL_SAFE_NO_PAD.encode(session)),
            Err(ConfirmError::InvalidToken)
        ));
    }
}
