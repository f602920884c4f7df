use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Category;

/// Request body for creating a category. Unknown fields (an attempted
/// `owner`, for instance) are dropped by serde.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for updating a category. The id must match the URL and the
/// row version must match the stored row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub row_version: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: Uuid,
    pub row_version: i64,
    pub created_at: OffsetDateTime,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            owner: c.user_id,
            row_version: c.row_version,
            created_at: c.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_supplied_owner_is_dropped() {
        let parsed: CreateCategoryRequest = serde_json::from_str(
            r#"{"name":"Tools","owner":"other-user","userId":"other-user"}"#,
        )
        .expect("unknown fields are ignored");
        assert_eq!(parsed.name, "Tools");
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn response_exposes_owner() {
        let category = Category {
            id: Uuid::new_v4(),
            name: "Tools".into(),
            description: None,
            user_id: Uuid::new_v4(),
            is_deleted: false,
            row_version: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        let owner = category.user_id;
        let response = CategoryResponse::from(category);
        assert_eq!(response.owner, owner);
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(json.contains("rowVersion"));
        assert!(json.contains("owner"));
    }
}
