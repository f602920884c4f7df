use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::ProductWithCategory;

fn default_true() -> bool {
    true
}

/// Request body for creating a product. A client-supplied owner field is
/// dropped by serde; the caller id is stamped server-side.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub category_id: Uuid,
}

/// Request body for updating a product: the full record minus owner and
/// creation time, plus the expected row version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub category_id: Uuid,
    pub row_version: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub owner: Uuid,
    pub row_version: i64,
    pub created_at: OffsetDateTime,
    pub category_id: Uuid,
    pub category: Option<CategorySummary>,
}

impl From<ProductWithCategory> for ProductResponse {
    fn from(p: ProductWithCategory) -> Self {
        let category = p.category_name.map(|name| CategorySummary {
            id: p.category_id,
            name,
            description: p.category_description,
        });
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            image_url: p.image_url,
            is_active: p.is_active,
            owner: p.user_id,
            row_version: p.row_version,
            created_at: p.created_at,
            category_id: p.category_id,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults_and_ignores_owner() {
        let parsed: CreateProductRequest = serde_json::from_str(&format!(
            r#"{{"name":"Hammer","price":"9.99","categoryId":"{}","owner":"other-user"}}"#,
            Uuid::new_v4()
        ))
        .expect("deserialize");
        assert_eq!(parsed.name, "Hammer");
        assert!(parsed.is_active);
        assert_eq!(parsed.description, None);
        assert_eq!(parsed.price.to_string(), "9.99");
    }

    #[test]
    fn deleted_category_serializes_as_null() {
        let row = ProductWithCategory {
            id: Uuid::new_v4(),
            name: "Hammer".into(),
            description: None,
            price: Decimal::new(999, 2),
            image_url: None,
            is_active: true,
            is_deleted: false,
            row_version: 0,
            created_at: OffsetDateTime::now_utc(),
            category_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category_name: None,
            category_description: None,
        };
        let response = ProductResponse::from(row);
        assert!(response.category.is_none());
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(json.contains("\"category\":null"));
    }

    #[test]
    fn live_category_is_embedded() {
        let category_id = Uuid::new_v4();
        let row = ProductWithCategory {
            id: Uuid::new_v4(),
            name: "Hammer".into(),
            description: Some("claw".into()),
            price: Decimal::new(999, 2),
            image_url: None,
            is_active: true,
            is_deleted: false,
            row_version: 3,
            created_at: OffsetDateTime::now_utc(),
            category_id,
            user_id: Uuid::new_v4(),
            category_name: Some("Tools".into()),
            category_description: None,
        };
        let response = ProductResponse::from(row);
        let category = response.category.expect("category embedded");
        assert_eq!(category.id, category_id);
        assert_eq!(category.name, "Tools");
    }
}
