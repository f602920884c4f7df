use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::PasswordPolicy;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Checks a candidate password against the configured policy and returns one
/// message per unmet requirement.
pub fn validate(policy: &PasswordPolicy, plain: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if plain.chars().count() < policy.min_length {
        problems.push(format!(
            "Password must be at least {} characters",
            policy.min_length
        ));
    }
    if policy.require_digit && !plain.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Password must contain a digit".into());
    }
    if policy.require_lowercase && !plain.chars().any(|c| c.is_lowercase()) {
        problems.push("Password must contain a lowercase letter".into());
    }
    if policy.require_uppercase && !plain.chars().any(|c| c.is_uppercase()) {
        problems.push("Password must contain an uppercase letter".into());
    }
    if policy.require_symbol && !plain.chars().any(|c| !c.is_alphanumeric()) {
        problems.push("Password must contain a symbol".into());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn policy_accepts_conforming_password() {
        let policy = PasswordPolicy::default();
        assert!(validate(&policy, "Abcd1234!").is_empty());
    }

    #[test]
    fn policy_flags_each_missing_class() {
        let policy = PasswordPolicy::default();
        assert_eq!(validate(&policy, "Abcdefg!").len(), 1); // no digit
        assert_eq!(validate(&policy, "ABCD1234!").len(), 1); // no lowercase
        assert_eq!(validate(&policy, "abcd1234!").len(), 1); // no uppercase
        assert_eq!(validate(&policy, "Abcd12345").len(), 1); // no symbol
        assert_eq!(validate(&policy, "Ab1!").len(), 1); // too short
    }

    #[test]
    fn policy_reports_all_problems_at_once() {
        let policy = PasswordPolicy::default();
        let problems = validate(&policy, "abc");
        assert_eq!(problems.len(), 4);
    }
}
