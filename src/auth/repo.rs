use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Rows are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_confirmed: bool,
    pub profile_picture: Option<String>,
    pub roles: Vec<String>,
    /// Rotated whenever credentials change; outstanding confirmation tokens
    /// bind to the value current at issue time.
    pub security_stamp: Uuid,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Find a user by email. Emails are stored trimmed and lowercased.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, email_confirmed,
                   profile_picture, roles, security_stamp, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, email_confirmed,
                   profile_picture, roles, security_stamp, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new unconfirmed user with a hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        full_name: &str,
        password_hash: &str,
        roles: &[String],
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, password_hash, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, password_hash, email_confirmed,
                      profile_picture, roles, security_stamp, created_at
            "#,
        )
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .bind(roles.to_vec())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Flips the confirmed flag exactly once. The expected stamp guards
    /// against stale tokens; the flipped flag guards against replays. The
    /// stamp is rotated so the consumed token cannot validate again.
    pub async fn confirm_email(
        db: &PgPool,
        id: Uuid,
        expected_stamp: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_confirmed = TRUE, security_stamp = gen_random_uuid()
            WHERE id = $1 AND security_stamp = $2 AND NOT email_confirmed
            "#,
        )
        .bind(id)
        .bind(expected_stamp)
        .execute(db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Overwrites profile fields. When `rotate_stamp` is set (email change)
    /// the security stamp is refreshed, invalidating outstanding
    /// confirmation tokens.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        full_name: &str,
        email: &str,
        profile_picture: Option<&str>,
        email_confirmed: bool,
        rotate_stamp: bool,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = $2,
                email = $3,
                profile_picture = $4,
                email_confirmed = $5,
                security_stamp = CASE WHEN $6 THEN gen_random_uuid() ELSE security_stamp END
            WHERE id = $1
            RETURNING id, email, full_name, password_hash, email_confirmed,
                      profile_picture, roles, security_stamp, created_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(profile_picture)
        .bind(email_confirmed)
        .bind(rotate_stamp)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Replaces the password hash and rotates the security stamp.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, security_stamp = gen_random_uuid()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}
