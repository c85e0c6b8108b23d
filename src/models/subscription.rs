use crate::entities::{PlanTier, SubscriptionStatus, subscription_entity as subscriptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[schema(example = "team")]
    pub plan: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    #[schema(example = "enterprise")]
    pub new_plan: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePlanResponse {
    pub message: String,
    pub subscription: SubscriptionSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

impl From<subscriptions::Model> for SubscriptionSummary {
    fn from(model: subscriptions::Model) -> Self {
        Self {
            plan: model.plan,
            status: model.status,
            current_period_end: model.current_period_end,
            cancel_at_period_end: model.cancel_at_period_end,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub message: String,
    pub cancel_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalResponse {
    pub portal_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub has_subscription: bool,
    pub status: String,
    pub plan: Option<PlanTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_at_period_end: Option<bool>,
}

impl SubscriptionStatusResponse {
    pub fn none() -> Self {
        Self {
            has_subscription: false,
            status: "none".to_string(),
            plan: None,
            current_period_end: None,
            cancel_at_period_end: None,
        }
    }
}

impl From<subscriptions::Model> for SubscriptionStatusResponse {
    fn from(model: subscriptions::Model) -> Self {
        Self {
            has_subscription: true,
            status: model.status.to_string(),
            plan: Some(model.plan),
            current_period_end: Some(model.current_period_end),
            cancel_at_period_end: Some(model.cancel_at_period_end),
        }
    }
}
