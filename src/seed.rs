use tracing::info;

use crate::{
    auth::{
        jwt::{ROLE_ADMIN, ROLE_USER},
        password,
        repo::User,
    },
    state::AppState,
};

/// Creates the configured admin account on first start. Without it a fresh
/// deployment has no way to reach the aggregate dashboard.
pub async fn run(state: &AppState) -> anyhow::Result<()> {
    let Some(admin) = state.config.seed_admin.clone() else {
        return Ok(());
    };

    let email = admin.email.trim().to_lowercase();
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Ok(());
    }

    let hash = password::hash_password(&admin.password)?;
    let user = User::create(
        &state.db,
        &email,
        &admin.full_name,
        &hash,
        &[ROLE_ADMIN.to_string(), ROLE_USER.to_string()],
    )
    .await?;
    // seeded accounts skip the confirmation email
    User::confirm_email(&state.db, user.id, user.security_stamp).await?;

    info!(user_id = %user.id, email = %user.email, "seeded admin user");
    Ok(())
}
