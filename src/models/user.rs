use crate::entities::account_entity as accounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "dev@example.com")]
    pub email: String,
    #[schema(example = "Password123")]
    pub password: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "dev@example.com")]
    pub email: String,
    #[schema(example = "Password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub timezone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<accounts::Model> for UserResponse {
    fn from(account: accounts::Model) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
            company: account.company,
            timezone: account.timezone,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub company: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageSnapshot {
    pub month: String,
    pub commits_generated: i64,
    pub tokens_used: i64,
}

impl From<crate::entities::usage_stats::Model> for UsageSnapshot {
    fn from(model: crate::entities::usage_stats::Model) -> Self {
        Self {
            month: model.month,
            commits_generated: model.commits_generated,
            tokens_used: model.tokens_used,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    pub current: UsageSnapshot,
    pub history: Vec<UsageSnapshot>,
}
