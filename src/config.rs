use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expire_days: i64,
}

/// Password requirements enforced at registration and password change.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_symbol: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_symbol: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub public_prefix: String,
}

/// Admin account created at startup when configured.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub public_base_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordPolicy,
    pub smtp: SmtpConfig,
    pub uploads: UploadConfig,
    pub seed_admin: Option<SeedAdmin>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "stockroom".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "stockroom-users".into()),
            expire_days: std::env::var("JWT_EXPIRE_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let password = PasswordPolicy {
            min_length: std::env::var("PASSWORD_MIN_LENGTH")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(8),
            ..PasswordPolicy::default()
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Stockroom <no-reply@stockroom.local>".into()),
        };
        let uploads = UploadConfig {
            dir: std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads/profile-pictures".into()),
            public_prefix: std::env::var("UPLOADS_PUBLIC_PREFIX")
                .unwrap_or_else(|_| "/uploads/profile-pictures".into()),
        };
        let seed_admin =
            match (std::env::var("SEED_ADMIN_EMAIL"), std::env::var("SEED_ADMIN_PASSWORD")) {
                (Ok(email), Ok(password)) => Some(SeedAdmin {
                    email,
                    password,
                    full_name: std::env::var("SEED_ADMIN_FULL_NAME")
                        .unwrap_or_else(|_| "Administrator".into()),
                }),
                _ => None,
            };
        Ok(Self {
            database_url,
            public_base_url,
            jwt,
            password,
            smtp,
            uploads,
            seed_admin,
        })
    }
}
