use axum::{
    extract::{FromRef, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        confirm::{self, ConfirmError, ConfirmationTokens},
        dto::{ConfirmEmailQuery, LoginRequest, MessageResponse, RegisterRequest, TokenResponse},
        is_valid_email,
        jwt::{AuthUser, JwtKeys, ROLE_USER},
        password,
        repo::User,
    },
    error::{ApiError, FieldError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/confirm-email", get(confirm_email))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if !is_valid_email(&payload.email) {
        errors.push(FieldError {
            field: "email",
            message: "Invalid email".into(),
        });
    }
    let name_len = payload.full_name.trim().chars().count();
    if !(3..=100).contains(&name_len) {
        errors.push(FieldError {
            field: "fullName",
            message: "Full name must be between 3 and 100 characters".into(),
        });
    }
    for problem in password::validate(&state.config.password, &payload.password) {
        errors.push(FieldError {
            field: "password",
            message: problem,
        });
    }
    if payload.confirm_password != payload.password {
        errors.push(FieldError {
            field: "confirmPassword",
            message: "Password and confirmation do not match".into(),
        });
    }
    if !errors.is_empty() {
        warn!(email = %payload.email, "registration validation failed");
        return Err(ApiError::Validation(errors));
    }

    // Ensure email is not taken
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &payload.email,
        payload.full_name.trim(),
        &hash,
        &[ROLE_USER.to_string()],
    )
    .await?;

    let tokens = ConfirmationTokens::from_ref(&state);
    let token = tokens.issue(&user)?;
    let link = format!(
        "{}/api/auth/confirm-email?userId={}&token={}",
        state.config.public_base_url.trim_end_matches('/'),
        user.id,
        token
    );
    let body = format!(
        r#"Please confirm your email address by <a href="{}">clicking here</a>."#,
        link
    );
    // The user row is kept even when the send fails; registering again with
    // the same address reports the email as taken, so the failure is only
    // reported, not rolled back.
    if let Err(e) = state.mailer.send(&user.email, "Confirm your email", &body).await {
        error!(error = %e, user_id = %user.id, "confirmation email failed");
        return Err(ApiError::Internal(e));
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(MessageResponse {
        message: "Registration successful. Check your email to confirm your address.".into(),
    }))
}

#[instrument(skip(state, query))]
pub async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<ConfirmEmailQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let tokens = ConfirmationTokens::from_ref(&state);
    match confirm::confirm(&state.db, &tokens, query.user_id, &query.token).await {
        Ok(()) => {
            info!(user_id = %query.user_id, "email confirmed");
            Ok(Json(MessageResponse {
                message: "Email confirmed. You can now log in.".into(),
            }))
        }
        Err(ConfirmError::InvalidUser) => Err(ApiError::NotFound("User not found".into())),
        Err(ConfirmError::InvalidToken) => {
            warn!(user_id = %query.user_id, "email confirmation failed");
            Err(ApiError::BadRequest("Failed to confirm email".into()))
        }
        Err(ConfirmError::Internal(e)) => Err(ApiError::Internal(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid email or password".into()));
        }
    };

    // Confirmation is checked before the password: unconfirmed accounts get
    // a distinct error even though that reveals the address is registered.
    if !user.email_confirmed {
        warn!(user_id = %user.id, "login before email confirmation");
        return Err(ApiError::Unauthorized(
            "Email not confirmed. Check your inbox for the confirmation link.".into(),
        ));
    }

    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse { token }))
}

/// Tokens are stateless, so there is nothing to clear server-side; the
/// endpoint exists so clients have a uniform logout call.
#[instrument(skip_all)]
pub async fn logout(caller: AuthUser) -> Json<MessageResponse> {
    info!(user_id = %caller.id, "user logged out");
    Json(MessageResponse {
        message: "Logout successful".into(),
    })
}
