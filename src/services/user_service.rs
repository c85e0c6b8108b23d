use crate::database::DbPool;
use crate::entities::account_entity as accounts;
use crate::error::{AppError, AppResult};
use crate::models::{UpdateProfileRequest, UsageResponse, UserResponse};
use crate::services::usage_service::UsageService;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
    usage_service: UsageService,
}

impl UserService {
    pub fn new(pool: DbPool) -> Self {
        let usage_service = UsageService::new(pool.clone());
        Self {
            pool,
            usage_service,
        }
    }

    pub async fn get_profile(&self, account_id: i64) -> AppResult<UserResponse> {
        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
        Ok(UserResponse::from(account))
    }

    pub async fn update_profile(
        &self,
        account_id: i64,
        request: UpdateProfileRequest,
    ) -> AppResult<UserResponse> {
        if request.name.is_none() && request.company.is_none() && request.timezone.is_none() {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }

        if let Some(name) = &request.name
            && name.trim().is_empty()
        {
            return Err(AppError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }

        let mut model = accounts::Entity::find_by_id(account_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?
            .into_active_model();

        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(company) = request.company {
            model.company = Set(Some(company));
        }
        if let Some(timezone) = request.timezone {
            model.timezone = Set(Some(timezone));
        }
        model.updated_at = Set(Some(chrono::Utc::now()));

        let updated = model.update(&self.pool).await?;
        Ok(UserResponse::from(updated))
    }

    pub async fn get_usage(&self, account_id: i64) -> AppResult<UsageResponse> {
        self.usage_service.get_usage(account_id).await
    }
}
