use crate::config::StripeConfig;
use crate::entities::PlanTier;
use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionMode, Client, CreateBillingPortalSession,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentMethodTypes,
    CreateCheckoutSessionSubscriptionData, CreateCustomer, Customer, CustomerId, Event,
    Subscription, SubscriptionId, SubscriptionProrationBehavior, UpdateSubscription,
    UpdateSubscriptionItems, Webhook,
};

#[derive(Clone)]
pub struct StripeService {
    client: Client,
    config: StripeConfig,
}

impl StripeService {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(config.secret_key.clone()),
            config,
        }
    }

    /// price ID -> 套餐档位。未知 price 不允许让事件失败，
    /// 回落到 individual 并告警
    pub fn plan_for_price(&self, price_id: &str) -> PlanTier {
        if price_id == self.config.price_individual {
            PlanTier::Individual
        } else if price_id == self.config.price_team {
            PlanTier::Team
        } else if price_id == self.config.price_enterprise {
            PlanTier::Enterprise
        } else {
            log::warn!("Unknown Stripe price ID {price_id}, falling back to individual plan");
            PlanTier::Individual
        }
    }

    pub fn price_for_plan(&self, plan: &PlanTier) -> &str {
        match plan {
            PlanTier::Individual => &self.config.price_individual,
            PlanTier::Team => &self.config.price_team,
            PlanTier::Enterprise => &self.config.price_enterprise,
        }
    }

    /// 注册时为账号创建对应的 Stripe customer
    pub async fn create_customer(
        &self,
        email: &str,
        name: &str,
        account_id: i64,
    ) -> AppResult<Customer> {
        let mut params = CreateCustomer::new();
        params.email = Some(email);
        params.name = Some(name);
        params.metadata = Some(HashMap::from([(
            "account_id".to_string(),
            account_id.to_string(),
        )]));

        let customer = Customer::create(&self.client, params).await?;
        log::info!("Created Stripe customer {} for account {account_id}", customer.id);
        Ok(customer)
    }

    /// 订阅模式的 hosted checkout，默认带试用期
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> AppResult<CheckoutSession> {
        let customer_id: CustomerId = customer_id
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid Stripe customer ID".to_string()))?;

        let mut params = CreateCheckoutSession::new();
        params.customer = Some(customer_id);
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]);
        params.success_url = Some(success_url);
        params.cancel_url = Some(cancel_url);
        params.allow_promotion_codes = Some(true);
        params.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
            trial_period_days: Some(self.config.trial_period_days),
            ..Default::default()
        });

        let session = CheckoutSession::create(&self.client, params).await?;
        log::info!("Created checkout session {}", session.id);
        Ok(session)
    }

    /// 客户自助账单门户
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<BillingPortalSession> {
        let customer_id: CustomerId = customer_id
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid Stripe customer ID".to_string()))?;

        let mut params = CreateBillingPortalSession::new(customer_id);
        params.return_url = Some(return_url);

        let session = BillingPortalSession::create(&self.client, params).await?;
        Ok(session)
    }

    /// 换档：替换订阅条目的 price 并按比例分摊
    pub async fn update_subscription_price(
        &self,
        subscription_id: &str,
        new_price_id: &str,
    ) -> AppResult<Subscription> {
        let sub_id: SubscriptionId = subscription_id
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid Stripe subscription ID".to_string()))?;

        let current = Subscription::retrieve(&self.client, &sub_id, &[]).await?;
        let item_id = current
            .items
            .data
            .first()
            .map(|item| item.id.to_string())
            .ok_or_else(|| {
                AppError::ExternalApiError("Subscription has no line items".to_string())
            })?;

        let mut params = UpdateSubscription::new();
        params.items = Some(vec![UpdateSubscriptionItems {
            id: Some(item_id),
            price: Some(new_price_id.to_string()),
            ..Default::default()
        }]);
        params.proration_behavior = Some(SubscriptionProrationBehavior::CreateProrations);

        let updated = Subscription::update(&self.client, &sub_id, params).await?;
        log::info!("Updated subscription {subscription_id} to price {new_price_id}");
        Ok(updated)
    }

    /// 取消采用 cancel_at_period_end，当前周期结束前保留权益
    pub async fn cancel_at_period_end(&self, subscription_id: &str) -> AppResult<Subscription> {
        let sub_id: SubscriptionId = subscription_id
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid Stripe subscription ID".to_string()))?;

        let mut params = UpdateSubscription::new();
        params.cancel_at_period_end = Some(true);

        let updated = Subscription::update(&self.client, &sub_id, params).await?;
        log::info!("Scheduled cancellation for subscription {subscription_id}");
        Ok(updated)
    }

    /// 基于原始请求体与签名头校验 webhook 真实性。
    /// construct_event 会校验 HMAC 与时间戳容差，过旧的签名会被拒绝
    pub fn verify_webhook_signature(&self, payload: &str, signature: &str) -> AppResult<Event> {
        Webhook::construct_event(payload, signature, &self.config.webhook_secret)
            .map_err(|e| AppError::AuthError(format!("Invalid webhook signature: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: "whsec_123".to_string(),
            price_individual: "price_individual_123".to_string(),
            price_team: "price_team_123".to_string(),
            price_enterprise: "price_enterprise_123".to_string(),
            trial_period_days: 14,
        }
    }

    #[test]
    fn test_plan_for_price_mapping() {
        let service = StripeService::new(test_config());
        assert_eq!(
            service.plan_for_price("price_individual_123"),
            PlanTier::Individual
        );
        assert_eq!(service.plan_for_price("price_team_123"), PlanTier::Team);
        assert_eq!(
            service.plan_for_price("price_enterprise_123"),
            PlanTier::Enterprise
        );
    }

    #[test]
    fn test_unknown_price_falls_back_to_individual() {
        let service = StripeService::new(test_config());
        assert_eq!(
            service.plan_for_price("price_does_not_exist"),
            PlanTier::Individual
        );
    }

    #[test]
    fn test_price_for_plan_round_trip() {
        let service = StripeService::new(test_config());
        for plan in [PlanTier::Individual, PlanTier::Team, PlanTier::Enterprise] {
            let price = service.price_for_plan(&plan).to_string();
            assert_eq!(service.plan_for_price(&price), plan);
        }
    }

    #[test]
    fn test_invalid_webhook_signature_rejected() {
        let service = StripeService::new(test_config());
        let result =
            service.verify_webhook_signature(r#"{"id": "evt_123"}"#, "t=0,v1=deadbeef");
        assert!(matches!(result, Err(AppError::AuthError(_))));
    }
}
