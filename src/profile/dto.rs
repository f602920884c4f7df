use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_response_serialization() {
        let response = ProfileResponse {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            full_name: "Test User".to_string(),
            profile_picture_url: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("fullName"));
        assert!(json.contains("profilePictureUrl"));
    }

    #[test]
    fn change_password_request_uses_camel_case() {
        let parsed: ChangePasswordRequest = serde_json::from_str(
            r#"{"currentPassword":"old","newPassword":"new","confirmPassword":"new"}"#,
        )
        .expect("deserialize");
        assert_eq!(parsed.current_password, "old");
        assert_eq!(parsed.new_password, "new");
    }
}
