use crate::database::DbPool;
use crate::entities::{
    PaymentStatus, PlanTier, SubscriptionStatus, account_entity as accounts,
    payment_entity as payments, subscription_entity as subscriptions,
    webhook_event_entity as webhook_events,
};
use crate::error::{AppError, AppResult};
use crate::external::StripeService;
use crate::models::lifecycle::{LifecycleEvent, transition};
use crate::services::usage_service::{UsageService, current_month};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use stripe::{Event, EventObject, EventType, Expandable, Invoice, Subscription};

/// 把 Stripe 时间戳转成带时区时间
pub(crate) fn timestamp_to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

/// Stripe 上报的订阅状态映射到本地四态
pub fn map_subscription_status(status: stripe::SubscriptionStatus) -> SubscriptionStatus {
    use stripe::SubscriptionStatus as S;
    match status {
        S::Trialing => SubscriptionStatus::Trialing,
        S::Active => SubscriptionStatus::Active,
        S::PastDue | S::Unpaid | S::Incomplete | S::Paused => SubscriptionStatus::PastDue,
        S::Canceled | S::IncompleteExpired => SubscriptionStatus::Canceled,
    }
}

/// 订阅生命周期管理：把乱序、可能重复投递的 billing 事件
/// 收敛为一致的本地订阅记录
#[derive(Clone)]
pub struct SubscriptionLifecycleService {
    pool: DbPool,
    stripe_service: StripeService,
    usage_service: UsageService,
}

impl SubscriptionLifecycleService {
    pub fn new(pool: DbPool, stripe_service: StripeService) -> Self {
        let usage_service = UsageService::new(pool.clone());
        Self {
            pool,
            stripe_service,
            usage_service,
        }
    }

    /// 处理一条已验证签名的 Stripe 事件。
    /// 持久化失败会向上传播，由 webhook 端点返回非 2xx 触发 Stripe 重投，
    /// 因此每个分支都必须可安全重放
    pub async fn handle_event(&self, event: Event) -> AppResult<()> {
        let event_id = event.id.to_string();
        let event_type = event.type_.to_string();

        // 精确去重：同一事件 ID 重复投递直接吞掉
        if self.is_event_processed(&event_id).await? {
            log::info!("Skipping already processed webhook event {event_id}");
            return Ok(());
        }

        match event.type_ {
            EventType::CustomerSubscriptionCreated => {
                if let EventObject::Subscription(sub) = event.data.object {
                    self.apply_subscription_upsert(&sub, true).await?;
                }
            }
            EventType::CustomerSubscriptionUpdated => {
                if let EventObject::Subscription(sub) = event.data.object {
                    self.apply_subscription_upsert(&sub, false).await?;
                }
            }
            EventType::CustomerSubscriptionDeleted => {
                if let EventObject::Subscription(sub) = event.data.object {
                    self.apply_subscription_deleted(&sub).await?;
                }
            }
            EventType::InvoicePaymentSucceeded => {
                if let EventObject::Invoice(invoice) = event.data.object {
                    self.apply_payment_succeeded(&invoice).await?;
                }
            }
            EventType::InvoicePaymentFailed => {
                if let EventObject::Invoice(invoice) = event.data.object {
                    self.apply_payment_failed(&invoice).await?;
                }
            }
            other => {
                log::info!("Unhandled event type: {other}");
                return Ok(());
            }
        }

        self.mark_event_processed(&event_id, &event_type).await?;
        Ok(())
    }

    /// created/updated 共用的 upsert，以 stripe_subscription_id 为键，
    /// 两类事件乱序到达时谁先到谁建行
    async fn apply_subscription_upsert(
        &self,
        subscription: &Subscription,
        is_created: bool,
    ) -> AppResult<()> {
        let sub_id = subscription.id.to_string();
        let customer_id = expandable_customer_id(&subscription.customer);

        let price_id = subscription
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string());
        let plan = match price_id {
            Some(price_id) => self.stripe_service.plan_for_price(&price_id),
            None => {
                log::warn!("Subscription {sub_id} has no price, falling back to individual plan");
                PlanTier::Individual
            }
        };

        let reported = map_subscription_status(subscription.status);
        let event = if is_created {
            LifecycleEvent::Created {
                status: reported.clone(),
            }
        } else {
            LifecycleEvent::Updated {
                status: reported.clone(),
            }
        };

        let period_start = timestamp_to_utc(subscription.current_period_start);
        let period_end = timestamp_to_utc(subscription.current_period_end);
        let trial_end = subscription.trial_end.map(timestamp_to_utc);

        let existing = subscriptions::Entity::find()
            .filter(subscriptions::Column::StripeSubscriptionId.eq(sub_id.as_str()))
            .one(&self.pool)
            .await?;

        match existing {
            Some(row) => {
                // 过期事件守卫：比当前账期更旧的 update 直接忽略，不允许回退
                if period_start < row.current_period_start {
                    log::warn!(
                        "Ignoring stale webhook for subscription {sub_id}: period_start predates stored period"
                    );
                    return Ok(());
                }

                let next = match transition(Some(&row.status), &event) {
                    Ok(next) => next,
                    Err(e) => {
                        // 非法迁移说明事件乱序且已被更新的状态覆盖，重投无法修复
                        log::warn!("Ignoring webhook for subscription {sub_id}: {e}");
                        return Ok(());
                    }
                };

                let mut model = row.into_active_model();
                model.plan = Set(plan.clone());
                model.status = Set(next);
                model.current_period_start = Set(period_start);
                model.current_period_end = Set(period_end);
                model.cancel_at_period_end = Set(subscription.cancel_at_period_end);
                model.trial_end = Set(trial_end);
                model.updated_at = Set(Some(Utc::now()));
                model.update(&self.pool).await?;

                log::info!("Subscription {sub_id} updated (plan={plan}, status={reported})");
            }
            None => {
                let account = accounts::Entity::find()
                    .filter(accounts::Column::StripeCustomerId.eq(customer_id.as_str()))
                    .one(&self.pool)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("No account found for customer {customer_id}"))
                    })?;

                let status = match transition(None, &event) {
                    Ok(status) => status,
                    Err(e) => {
                        log::warn!("Ignoring webhook for subscription {sub_id}: {e}");
                        return Ok(());
                    }
                };

                subscriptions::ActiveModel {
                    account_id: Set(account.id),
                    stripe_subscription_id: Set(sub_id.clone()),
                    stripe_customer_id: Set(customer_id.clone()),
                    plan: Set(plan.clone()),
                    status: Set(status),
                    current_period_start: Set(period_start),
                    current_period_end: Set(period_end),
                    cancel_at_period_end: Set(subscription.cancel_at_period_end),
                    trial_end: Set(trial_end),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?;

                // 首次订阅时惰性建立当月用量行
                self.usage_service
                    .ensure_month_row(account.id, &current_month())
                    .await?;

                log::info!(
                    "Subscription {sub_id} created for account {} (plan={plan}, status={reported})",
                    account.id
                );
            }
        }

        Ok(())
    }

    async fn apply_subscription_deleted(&self, subscription: &Subscription) -> AppResult<()> {
        let sub_id = subscription.id.to_string();

        let existing = subscriptions::Entity::find()
            .filter(subscriptions::Column::StripeSubscriptionId.eq(sub_id.as_str()))
            .one(&self.pool)
            .await?;

        let Some(row) = existing else {
            log::warn!("Received subscription.deleted for unknown subscription {sub_id}");
            return Ok(());
        };

        let next = match transition(Some(&row.status), &LifecycleEvent::Deleted) {
            Ok(next) => next,
            Err(e) => {
                log::warn!("Ignoring subscription.deleted for {sub_id}: {e}");
                return Ok(());
            }
        };

        let mut model = row.into_active_model();
        model.status = Set(next);
        model.canceled_at = Set(Some(Utc::now()));
        model.updated_at = Set(Some(Utc::now()));
        model.update(&self.pool).await?;

        log::info!("Subscription {sub_id} canceled");
        Ok(())
    }

    /// 付款成功只追加审计记录，订阅状态由随后的 subscription.updated 恢复
    async fn apply_payment_succeeded(&self, invoice: &Invoice) -> AppResult<()> {
        let Some(sub_id) = invoice_subscription_id(invoice) else {
            log::info!(
                "Invoice {} has no subscription reference, skipping",
                invoice.id
            );
            return Ok(());
        };

        let paid_at = invoice
            .status_transitions
            .as_ref()
            .and_then(|transitions| transitions.paid_at)
            .map(timestamp_to_utc);

        payments::ActiveModel {
            stripe_invoice_id: Set(invoice.id.to_string()),
            stripe_subscription_id: Set(sub_id),
            amount_cents: Set(invoice.amount_paid.unwrap_or(0)),
            currency: Set(invoice
                .currency
                .map(|c| c.to_string())
                .unwrap_or_else(|| "usd".to_string())),
            status: Set(PaymentStatus::Succeeded),
            paid_at: Set(paid_at),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Payment succeeded for invoice {} (amount={})",
            invoice.id,
            invoice.amount_paid.unwrap_or(0)
        );
        Ok(())
    }

    async fn apply_payment_failed(&self, invoice: &Invoice) -> AppResult<()> {
        let Some(sub_id) = invoice_subscription_id(invoice) else {
            log::warn!(
                "invoice.payment_failed {} carries no subscription reference, skipping",
                invoice.id
            );
            return Ok(());
        };

        let failure_reason = invoice
            .last_finalization_error
            .as_ref()
            .and_then(|error| error.message.clone());

        payments::ActiveModel {
            stripe_invoice_id: Set(invoice.id.to_string()),
            stripe_subscription_id: Set(sub_id.clone()),
            amount_cents: Set(invoice.amount_due.unwrap_or(0)),
            currency: Set(invoice
                .currency
                .map(|c| c.to_string())
                .unwrap_or_else(|| "usd".to_string())),
            status: Set(PaymentStatus::Failed),
            failure_reason: Set(failure_reason),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        let existing = subscriptions::Entity::find()
            .filter(subscriptions::Column::StripeSubscriptionId.eq(sub_id.as_str()))
            .one(&self.pool)
            .await?;

        let Some(row) = existing else {
            log::warn!("Payment failed for unknown subscription {sub_id}");
            return Ok(());
        };

        match transition(Some(&row.status), &LifecycleEvent::PaymentFailed) {
            Ok(next) => {
                let mut model = row.into_active_model();
                model.status = Set(next);
                model.payment_failed_at = Set(Some(Utc::now()));
                model.updated_at = Set(Some(Utc::now()));
                model.update(&self.pool).await?;
                log::warn!("Subscription {sub_id} marked past_due after failed payment");
            }
            Err(e) => {
                log::warn!("Not updating subscription {sub_id} after failed payment: {e}");
            }
        }

        Ok(())
    }

    async fn is_event_processed(&self, event_id: &str) -> AppResult<bool> {
        let found = webhook_events::Entity::find()
            .filter(webhook_events::Column::StripeEventId.eq(event_id))
            .one(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> AppResult<()> {
        let result = webhook_events::Entity::insert(webhook_events::ActiveModel {
            stripe_event_id: Set(event_id.to_string()),
            event_type: Set(event_type.to_string()),
            processed_at: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(webhook_events::Column::StripeEventId)
                .do_nothing()
                .to_owned(),
        )
        .exec(&self.pool)
        .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 清理留存窗口之外的事件台账，由后台任务周期调用
    pub async fn prune_processed_events(&self, retention_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let result = webhook_events::Entity::delete_many()
            .filter(webhook_events::Column::ProcessedAt.lt(cutoff))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected)
    }
}

fn expandable_customer_id(customer: &Expandable<stripe::Customer>) -> String {
    match customer {
        Expandable::Id(id) => id.to_string(),
        Expandable::Object(customer) => customer.id.to_string(),
    }
}

fn invoice_subscription_id(invoice: &Invoice) -> Option<String> {
    invoice.subscription.as_ref().map(|sub| match sub {
        Expandable::Id(id) => id.to_string(),
        Expandable::Object(sub) => sub.id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_subscription_status() {
        assert_eq!(
            map_subscription_status(stripe::SubscriptionStatus::Trialing),
            SubscriptionStatus::Trialing
        );
        assert_eq!(
            map_subscription_status(stripe::SubscriptionStatus::Active),
            SubscriptionStatus::Active
        );
        assert_eq!(
            map_subscription_status(stripe::SubscriptionStatus::PastDue),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            map_subscription_status(stripe::SubscriptionStatus::Canceled),
            SubscriptionStatus::Canceled
        );
        // 边缘状态收敛到保守值
        assert_eq!(
            map_subscription_status(stripe::SubscriptionStatus::Unpaid),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            map_subscription_status(stripe::SubscriptionStatus::IncompleteExpired),
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn test_timestamp_to_utc() {
        let dt = timestamp_to_utc(1_700_000_000);
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
