use crate::database::DbPool;
use crate::entities::api_key_entity as api_keys;
use crate::error::{AppError, AppResult};
use crate::models::{ApiKeyResponse, CreateApiKeyRequest, CreatedApiKeyResponse};
use crate::utils::{generate_api_key, preview_api_key};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};

#[derive(Clone)]
pub struct ApiKeyService {
    pool: DbPool,
}

impl ApiKeyService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, account_id: i64) -> AppResult<Vec<ApiKeyResponse>> {
        let keys = api_keys::Entity::find()
            .filter(api_keys::Column::AccountId.eq(account_id))
            .filter(api_keys::Column::IsActive.eq(true))
            .order_by_desc(api_keys::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        Ok(keys.into_iter().map(ApiKeyResponse::from).collect())
    }

    /// 创建新密钥。完整密钥只在这里返回一次，库里只存哈希
    pub async fn create(
        &self,
        account_id: i64,
        request: CreateApiKeyRequest,
    ) -> AppResult<CreatedApiKeyResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "API key name is required".to_string(),
            ));
        }

        let key = generate_api_key();
        let key_hash = crate::utils::hash_password(&key)?;
        let key_preview = preview_api_key(&key);

        let created = api_keys::ActiveModel {
            account_id: Set(account_id),
            name: Set(request.name.trim().to_string()),
            key_hash: Set(key_hash),
            key_preview: Set(key_preview),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(CreatedApiKeyResponse {
            id: created.id,
            name: created.name,
            key_preview: created.key_preview,
            created_at: created.created_at,
            key,
        })
    }

    /// 软删除：仅置 is_active=false，保留审计痕迹
    pub async fn deactivate(&self, account_id: i64, key_id: i64) -> AppResult<()> {
        let key = api_keys::Entity::find_by_id(key_id)
            .filter(api_keys::Column::AccountId.eq(account_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("API key not found".to_string()))?;

        let mut model = key.into_active_model();
        model.is_active = Set(false);
        model.update(&self.pool).await?;

        Ok(())
    }
}
