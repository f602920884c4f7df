use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        confirm::ConfirmationTokens,
        dto::MessageResponse,
        is_valid_email,
        jwt::AuthUser,
        password,
        repo::User,
    },
    error::{ApiError, FieldError},
    state::AppState,
};

use super::dto::{ChangePasswordRequest, ProfileResponse};

const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/change-password", post(change_password))
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
}

/// Maps an uploaded file name onto the extension allow-list.
fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    match ext.as_str() {
        "jpg" => Some(".jpg"),
        "jpeg" => Some(".jpeg"),
        "png" => Some(".png"),
        "gif" => Some(".gif"),
        _ => None,
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        profile_picture_url: user.profile_picture,
    }))
}

#[instrument(skip(state, multipart))]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let mut full_name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut picture: Option<(&'static str, Bytes)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("fullName") => {
                full_name = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Malformed multipart field: {}", e))
                })?);
            }
            Some("email") => {
                email = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Malformed multipart field: {}", e))
                })?);
            }
            Some("profilePicture") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let ext = allowed_extension(&file_name).ok_or_else(|| {
                    ApiError::invalid(
                        "profilePicture",
                        "Invalid file type. Only JPG, JPEG, PNG and GIF are allowed.",
                    )
                })?;
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Malformed multipart field: {}", e))
                })?;
                if data.len() > MAX_PICTURE_BYTES {
                    return Err(ApiError::invalid(
                        "profilePicture",
                        "File size cannot exceed 5MB",
                    ));
                }
                picture = Some((ext, data));
            }
            _ => {}
        }
    }

    // Blank fields keep their stored values, matching partial form posts.
    let new_full_name = match full_name.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => user.full_name.clone(),
    };
    let new_email = match email.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => user.email.clone(),
    };
    if !is_valid_email(&new_email) {
        return Err(ApiError::invalid("email", "Invalid email"));
    }
    let name_len = new_full_name.chars().count();
    if !(3..=100).contains(&name_len) {
        return Err(ApiError::Validation(vec![FieldError {
            field: "fullName",
            message: "Full name must be between 3 and 100 characters".into(),
        }]));
    }

    let email_changed = new_email != user.email;
    if email_changed
        && User::find_by_email(&state.db, &new_email).await?.is_some()
    {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let mut picture_url = user.profile_picture.clone();
    if let Some((ext, data)) = picture {
        let filename = format!("{}{}", Uuid::new_v4(), ext);
        picture_url = Some(state.files.save(&filename, data).await?);
    }

    // A changed address goes back to unconfirmed and gets a fresh token
    // bound to the rotated stamp.
    let updated = User::update_profile(
        &state.db,
        user.id,
        &new_full_name,
        &new_email,
        picture_url.as_deref(),
        user.email_confirmed && !email_changed,
        email_changed,
    )
    .await?;

    if email_changed {
        let tokens = ConfirmationTokens::from_ref(&state);
        let token = tokens.issue(&updated)?;
        info!(
            user_id = %updated.id,
            email = %updated.email,
            token = %token,
            "email changed; confirmation token issued"
        );
    }

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(MessageResponse {
        message: "Profile updated successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let mut errors = Vec::new();
    for problem in password::validate(&state.config.password, &payload.new_password) {
        errors.push(FieldError {
            field: "newPassword",
            message: problem,
        });
    }
    if payload.confirm_password != payload.new_password {
        errors.push(FieldError {
            field: "confirmPassword",
            message: "New password and confirmation do not match".into(),
        });
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if !password::verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "change password with wrong current password");
        return Err(ApiError::invalid("currentPassword", "Incorrect password"));
    }

    let hash = password::hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("me.jpg"), Some(".jpg"));
        assert_eq!(allowed_extension("me.JPEG"), Some(".jpeg"));
        assert_eq!(allowed_extension("avatar.png"), Some(".png"));
        assert_eq!(allowed_extension("anim.gif"), Some(".gif"));
        assert_eq!(allowed_extension("script.exe"), None);
        assert_eq!(allowed_extension("archive.tar.gz"), None);
        assert_eq!(allowed_extension("noextension"), None);
        assert_eq!(allowed_extension(""), None);
    }
}
