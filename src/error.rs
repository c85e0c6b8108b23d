use crate::entities::PlanTier;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Active subscription required")]
    SubscriptionRequired,

    #[error("Upgrade required")]
    UpgradeRequired(Vec<PlanTier>),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Failed to generate commit message")]
    GenerationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Stripe error: {0}")]
    StripeError(#[from] stripe::StripeError),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                HttpResponse::BadRequest().json(json!({ "error": msg }))
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                HttpResponse::Unauthorized().json(json!({ "error": msg }))
            }
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "error": msg })),
            AppError::SubscriptionRequired => {
                log::warn!("Request rejected: no active subscription");
                HttpResponse::Forbidden().json(json!({
                    "error": "Active subscription required"
                }))
            }
            // 403 带上可满足要求的套餐列表，前端据此渲染升级引导
            AppError::UpgradeRequired(plans) => {
                log::warn!("Request rejected: plan upgrade required");
                HttpResponse::Forbidden().json(json!({
                    "error": "Upgrade required",
                    "requiredPlans": plans
                }))
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                HttpResponse::BadGateway().json(json!({ "error": "Upstream provider error" }))
            }
            AppError::GenerationError(msg) => {
                log::error!("Commit generation failed: {msg}");
                HttpResponse::InternalServerError().json(json!({
                    "error": "Failed to generate commit message"
                }))
            }
            AppError::StripeError(err) => {
                log::error!("Stripe API error: {err}");
                HttpResponse::InternalServerError().json(json!({ "error": "Billing provider error" }))
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                HttpResponse::InternalServerError().json(json!({ "error": "Database error" }))
            }
            _ => {
                log::error!("Internal error: {self}");
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}
