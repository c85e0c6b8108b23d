use crate::database::DbPool;
use crate::entities::{
    PlanTier, SubscriptionStatus, account_entity as accounts, subscription_entity as subscriptions,
};
use crate::error::{AppError, AppResult};
use crate::external::StripeService;
use crate::models::{
    CancelResponse, CheckoutResponse, PortalResponse, SubscriptionStatusResponse,
    SubscriptionSummary, UpdatePlanResponse,
};
use crate::services::lifecycle_service::{map_subscription_status, timestamp_to_utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};

pub const ALL_PLANS: &[PlanTier] = &[PlanTier::Individual, PlanTier::Team, PlanTier::Enterprise];
pub const TEAM_PLANS: &[PlanTier] = &[PlanTier::Team, PlanTier::Enterprise];
pub const ENTERPRISE_PLANS: &[PlanTier] = &[PlanTier::Enterprise];

/// 套餐准入判定。只有 active 放行（trialing 不放行，与现行产品口径一致），
/// 档位不在允许集合内时把可满足的档位带回给前端
pub fn check_plan_access(
    subscription: Option<&subscriptions::Model>,
    allowed: &[PlanTier],
) -> AppResult<()> {
    let subscription = subscription.ok_or(AppError::SubscriptionRequired)?;

    if subscription.status != SubscriptionStatus::Active {
        return Err(AppError::SubscriptionRequired);
    }

    if !allowed.contains(&subscription.plan) {
        return Err(AppError::UpgradeRequired(allowed.to_vec()));
    }

    Ok(())
}

#[derive(Clone)]
pub struct SubscriptionService {
    pool: DbPool,
    stripe_service: StripeService,
    frontend_url: String,
}

impl SubscriptionService {
    pub fn new(pool: DbPool, stripe_service: StripeService, frontend_url: String) -> Self {
        Self {
            pool,
            stripe_service,
            frontend_url,
        }
    }

    /// 账号当前订阅快照（最新一条），网关判定与 status 接口共用
    pub async fn current_subscription(
        &self,
        account_id: i64,
    ) -> AppResult<Option<subscriptions::Model>> {
        let subscription = subscriptions::Entity::find()
            .filter(subscriptions::Column::AccountId.eq(account_id))
            .order_by_desc(subscriptions::Column::CreatedAt)
            .one(&self.pool)
            .await?;
        Ok(subscription)
    }

    /// 入口网关：解析当前订阅并做套餐准入判定，通过时返回快照。
    /// 只读，不产生任何写入
    pub async fn require_subscription(
        &self,
        account_id: i64,
        allowed: &[PlanTier],
    ) -> AppResult<subscriptions::Model> {
        let subscription = self
            .current_subscription(account_id)
            .await?
            .ok_or(AppError::SubscriptionRequired)?;
        check_plan_access(Some(&subscription), allowed)?;
        Ok(subscription)
    }

    pub async fn require_any_plan(&self, account_id: i64) -> AppResult<subscriptions::Model> {
        self.require_subscription(account_id, ALL_PLANS).await
    }

    pub async fn require_team_plan(&self, account_id: i64) -> AppResult<subscriptions::Model> {
        self.require_subscription(account_id, TEAM_PLANS).await
    }

    pub async fn require_enterprise_plan(
        &self,
        account_id: i64,
    ) -> AppResult<subscriptions::Model> {
        self.require_subscription(account_id, ENTERPRISE_PLANS).await
    }

    /// 新订阅走 hosted checkout；已有 active 订阅时拒绝
    pub async fn create_checkout(
        &self,
        account: &accounts::Model,
        plan: &str,
    ) -> AppResult<CheckoutResponse> {
        let plan = PlanTier::parse(plan)
            .ok_or_else(|| AppError::ValidationError("Invalid plan".to_string()))?;

        if let Some(subscription) = self.current_subscription(account.id).await?
            && subscription.status == SubscriptionStatus::Active
        {
            return Err(AppError::ValidationError(
                "Already have an active subscription".to_string(),
            ));
        }

        let customer_id = self.ensure_stripe_customer(account).await?;

        let success_url = format!("{}/dashboard?success=true", self.frontend_url);
        let cancel_url = format!("{}/pricing?cancelled=true", self.frontend_url);

        let session = self
            .stripe_service
            .create_checkout_session(
                &customer_id,
                self.stripe_service.price_for_plan(&plan),
                &success_url,
                &cancel_url,
            )
            .await?;

        let checkout_url = session.url.ok_or_else(|| {
            AppError::ExternalApiError("Checkout session has no URL".to_string())
        })?;

        Ok(CheckoutResponse { checkout_url })
    }

    /// 换档；本地记录由随后的 subscription.updated webhook 收敛
    pub async fn update_plan(
        &self,
        account_id: i64,
        new_plan: &str,
    ) -> AppResult<UpdatePlanResponse> {
        let new_plan = PlanTier::parse(new_plan)
            .ok_or_else(|| AppError::ValidationError("Invalid plan".to_string()))?;

        let subscription = self
            .current_active_subscription(account_id)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError("No active subscription found".to_string())
            })?;

        let updated = self
            .stripe_service
            .update_subscription_price(
                &subscription.stripe_subscription_id,
                self.stripe_service.price_for_plan(&new_plan),
            )
            .await?;

        Ok(UpdatePlanResponse {
            message: "Subscription updated successfully".to_string(),
            subscription: SubscriptionSummary {
                plan: new_plan,
                status: map_subscription_status(updated.status),
                current_period_end: timestamp_to_utc(updated.current_period_end),
                cancel_at_period_end: updated.cancel_at_period_end,
            },
        })
    }

    /// 取消到期生效，立即在本地标记 cancel_at_period_end 以便 status 接口反映
    pub async fn cancel(&self, account_id: i64) -> AppResult<CancelResponse> {
        let subscription = self
            .current_active_subscription(account_id)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError("No active subscription found".to_string())
            })?;

        let updated = self
            .stripe_service
            .cancel_at_period_end(&subscription.stripe_subscription_id)
            .await?;

        let cancel_at = updated
            .cancel_at
            .map(timestamp_to_utc)
            .or(Some(timestamp_to_utc(updated.current_period_end)));

        let mut model = subscription.into_active_model();
        model.cancel_at_period_end = Set(true);
        model.updated_at = Set(Some(chrono::Utc::now()));
        model.update(&self.pool).await?;

        Ok(CancelResponse {
            message: "Subscription will be cancelled at the end of the billing period".to_string(),
            cancel_at,
        })
    }

    pub async fn create_portal(&self, account: &accounts::Model) -> AppResult<PortalResponse> {
        let customer_id = account.stripe_customer_id.clone().ok_or_else(|| {
            AppError::ValidationError("Account has no billing profile".to_string())
        })?;

        let return_url = format!("{}/dashboard", self.frontend_url);
        let session = self
            .stripe_service
            .create_portal_session(&customer_id, &return_url)
            .await?;

        Ok(PortalResponse {
            portal_url: session.url,
        })
    }

    pub async fn status(&self, account_id: i64) -> AppResult<SubscriptionStatusResponse> {
        let subscription = self.current_subscription(account_id).await?;
        Ok(subscription
            .map(SubscriptionStatusResponse::from)
            .unwrap_or_else(SubscriptionStatusResponse::none))
    }

    async fn current_active_subscription(
        &self,
        account_id: i64,
    ) -> AppResult<Option<subscriptions::Model>> {
        let subscription = self
            .current_subscription(account_id)
            .await?
            .filter(|sub| sub.status == SubscriptionStatus::Active);
        Ok(subscription)
    }

    /// 注册时创建失败的账号可能没有 customer，这里补建
    async fn ensure_stripe_customer(&self, account: &accounts::Model) -> AppResult<String> {
        if let Some(customer_id) = &account.stripe_customer_id {
            return Ok(customer_id.clone());
        }

        let customer = self
            .stripe_service
            .create_customer(&account.email, &account.name, account.id)
            .await?;
        let customer_id = customer.id.to_string();

        let mut model = account.clone().into_active_model();
        model.stripe_customer_id = Set(Some(customer_id.clone()));
        model.updated_at = Set(Some(chrono::Utc::now()));
        model.update(&self.pool).await?;

        Ok(customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn subscription_with(plan: PlanTier, status: SubscriptionStatus) -> subscriptions::Model {
        subscriptions::Model {
            id: 1,
            account_id: 1,
            stripe_subscription_id: "sub_test_123".to_string(),
            stripe_customer_id: "cus_test_123".to_string(),
            plan,
            status,
            current_period_start: Utc::now(),
            current_period_end: Utc::now(),
            cancel_at_period_end: false,
            trial_end: None,
            canceled_at: None,
            payment_failed_at: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_no_subscription_is_rejected() {
        let result = check_plan_access(None, ALL_PLANS);
        assert!(matches!(result, Err(AppError::SubscriptionRequired)));
    }

    #[test]
    fn test_trialing_is_rejected_for_any_tier() {
        // 现行口径：只有 active 放行，试用期不放行
        let sub = subscription_with(PlanTier::Enterprise, SubscriptionStatus::Trialing);
        let result = check_plan_access(Some(&sub), ALL_PLANS);
        assert!(matches!(result, Err(AppError::SubscriptionRequired)));
    }

    #[test]
    fn test_past_due_and_canceled_are_rejected() {
        let sub = subscription_with(PlanTier::Team, SubscriptionStatus::PastDue);
        assert!(matches!(
            check_plan_access(Some(&sub), ALL_PLANS),
            Err(AppError::SubscriptionRequired)
        ));

        let sub = subscription_with(PlanTier::Team, SubscriptionStatus::Canceled);
        assert!(matches!(
            check_plan_access(Some(&sub), ALL_PLANS),
            Err(AppError::SubscriptionRequired)
        ));
    }

    #[test]
    fn test_active_individual_passes_default_gate() {
        let sub = subscription_with(PlanTier::Individual, SubscriptionStatus::Active);
        assert!(check_plan_access(Some(&sub), ALL_PLANS).is_ok());
    }

    #[test]
    fn test_individual_fails_team_gate_with_required_plans() {
        let sub = subscription_with(PlanTier::Individual, SubscriptionStatus::Active);
        match check_plan_access(Some(&sub), TEAM_PLANS) {
            Err(AppError::UpgradeRequired(plans)) => {
                assert_eq!(plans, vec![PlanTier::Team, PlanTier::Enterprise]);
            }
            other => panic!("expected UpgradeRequired, got {other:?}"),
        }
    }

    #[test]
    fn test_team_and_enterprise_pass_team_gate() {
        let sub = subscription_with(PlanTier::Team, SubscriptionStatus::Active);
        assert!(check_plan_access(Some(&sub), TEAM_PLANS).is_ok());

        let sub = subscription_with(PlanTier::Enterprise, SubscriptionStatus::Active);
        assert!(check_plan_access(Some(&sub), TEAM_PLANS).is_ok());
    }

    #[test]
    fn test_enterprise_gate_excludes_team() {
        let sub = subscription_with(PlanTier::Team, SubscriptionStatus::Active);
        assert!(matches!(
            check_plan_access(Some(&sub), ENTERPRISE_PLANS),
            Err(AppError::UpgradeRequired(_))
        ));

        let sub = subscription_with(PlanTier::Enterprise, SubscriptionStatus::Active);
        assert!(check_plan_access(Some(&sub), ENTERPRISE_PLANS).is_ok());
    }
}
