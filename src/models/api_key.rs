use crate::entities::api_key_entity as api_keys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    #[schema(example = "CI pipeline")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: i64,
    pub name: String,
    pub key_preview: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<api_keys::Model> for ApiKeyResponse {
    fn from(model: api_keys::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            key_preview: model.key_preview,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
        }
    }
}

/// 创建响应是唯一一次返回完整密钥的地方
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedApiKeyResponse {
    pub id: i64,
    pub name: String,
    pub key_preview: String,
    pub created_at: Option<DateTime<Utc>>,
    pub key: String,
}
