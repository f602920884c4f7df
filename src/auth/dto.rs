use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query string of the confirmation link sent by email.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailQuery {
    pub user_id: Uuid,
    pub token: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_uses_camel_case_fields() {
        let parsed: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@x.com","fullName":"Ada","password":"p","confirmPassword":"p"}"#,
        )
        .expect("deserialize");
        assert_eq!(parsed.full_name, "Ada");
        assert_eq!(parsed.confirm_password, "p");
    }

    #[test]
    fn confirm_query_uses_camel_case_user_id() {
        let id = Uuid::new_v4();
        let parsed: ConfirmEmailQuery =
            serde_json::from_str(&format!(r#"{{"userId":"{}","token":"abc"}}"#, id))
                .expect("deserialize");
        assert_eq!(parsed.user_id, id);
        assert_eq!(parsed.token, "abc");
    }
}
