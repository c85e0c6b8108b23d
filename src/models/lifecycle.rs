//! 订阅生命周期状态机
//!
//! 订阅状态只允许沿下列边迁移，所有 webhook 处理都必须经过 `transition`，
//! 不允许任何代码直接写任意状态：
//!
//! ```text
//! (none) ──created──> trialing ──> active <──> past_due
//!                        │            │            │
//!                        └────────────┴────────────┴──> canceled (终态)
//! ```
//!
//! 同状态自环视为合法（billing 方会重复投递同一事件）。

use crate::entities::SubscriptionStatus;
use thiserror::Error;

/// 入站 billing 事件在状态机上的投影
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// customer.subscription.created，携带 Stripe 上报的初始状态
    Created { status: SubscriptionStatus },
    /// customer.subscription.updated，携带 Stripe 上报的目标状态
    Updated { status: SubscriptionStatus },
    /// customer.subscription.deleted
    Deleted,
    /// invoice.payment_failed
    PaymentFailed,
    /// invoice.payment_succeeded，本身不改变订阅状态
    PaymentSucceeded,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("event {event} requires an existing subscription")]
    MissingSubscription { event: &'static str },

    #[error("invalid initial status {status} for subscription creation")]
    InvalidInitialStatus { status: SubscriptionStatus },

    #[error("invalid status transition {from} -> {to}")]
    InvalidEdge {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },
}

/// 判断 from -> to 是否是状态机允许的边
fn is_valid_edge(from: &SubscriptionStatus, to: &SubscriptionStatus) -> bool {
    use SubscriptionStatus::*;
    if from == to {
        // 重复投递的自环
        return true;
    }
    match (from, to) {
        (Trialing, Active) | (Trialing, PastDue) | (Trialing, Canceled) => true,
        (Active, PastDue) | (Active, Canceled) => true,
        (PastDue, Active) | (PastDue, Canceled) => true,
        // canceled 为终态；active/past_due 不允许回退到 trialing
        _ => false,
    }
}

/// 唯一的状态迁移入口：给定当前持久化状态（无记录时为 None）和入站事件，
/// 返回迁移后的状态，非法迁移返回错误而不是静默写入。
pub fn transition(
    current: Option<&SubscriptionStatus>,
    event: &LifecycleEvent,
) -> Result<SubscriptionStatus, TransitionError> {
    use SubscriptionStatus::*;

    match (current, event) {
        (None, LifecycleEvent::Created { status }) => match status {
            Trialing | Active => Ok(status.clone()),
            other => Err(TransitionError::InvalidInitialStatus {
                status: other.clone(),
            }),
        },
        // created 与 updated 可能乱序到达：updated 先到时按 upsert 建行
        (None, LifecycleEvent::Updated { status }) => Ok(status.clone()),
        (None, LifecycleEvent::Deleted) => Err(TransitionError::MissingSubscription {
            event: "subscription.deleted",
        }),
        (None, LifecycleEvent::PaymentFailed) => Err(TransitionError::MissingSubscription {
            event: "invoice.payment_failed",
        }),
        (None, LifecycleEvent::PaymentSucceeded) => Err(TransitionError::MissingSubscription {
            event: "invoice.payment_succeeded",
        }),

        // created 重复投递（或 created 晚于 updated 到达）按 updated 处理
        (Some(from), LifecycleEvent::Created { status })
        | (Some(from), LifecycleEvent::Updated { status }) => {
            if is_valid_edge(from, status) {
                Ok(status.clone())
            } else {
                Err(TransitionError::InvalidEdge {
                    from: from.clone(),
                    to: status.clone(),
                })
            }
        }

        (Some(_), LifecycleEvent::Deleted) => Ok(Canceled),

        (Some(Canceled), LifecycleEvent::PaymentFailed) => Err(TransitionError::InvalidEdge {
            from: Canceled,
            to: PastDue,
        }),
        (Some(_), LifecycleEvent::PaymentFailed) => Ok(PastDue),

        // 付款成功不直接改状态，随后的 subscription.updated 会恢复 active
        (Some(status), LifecycleEvent::PaymentSucceeded) => Ok(status.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    #[test]
    fn test_created_enters_trialing_or_active() {
        let next = transition(None, &LifecycleEvent::Created { status: Trialing }).unwrap();
        assert_eq!(next, Trialing);

        let next = transition(None, &LifecycleEvent::Created { status: Active }).unwrap();
        assert_eq!(next, Active);
    }

    #[test]
    fn test_created_rejects_invalid_initial_status() {
        let err = transition(None, &LifecycleEvent::Created { status: PastDue }).unwrap_err();
        assert_eq!(err, TransitionError::InvalidInitialStatus { status: PastDue });

        let err = transition(None, &LifecycleEvent::Created { status: Canceled }).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidInitialStatus { status: Canceled }
        );
    }

    #[test]
    fn test_repeated_identical_updates_are_idempotent() {
        // created 之后重复应用同一 updated，结果与应用一次相同
        let mut status = transition(None, &LifecycleEvent::Created { status: Trialing }).unwrap();
        let update = LifecycleEvent::Updated { status: Active };
        for _ in 0..5 {
            status = transition(Some(&status), &update).unwrap();
        }
        assert_eq!(status, Active);
    }

    #[test]
    fn test_payment_failed_moves_to_past_due() {
        let next = transition(Some(&Active), &LifecycleEvent::PaymentFailed).unwrap();
        assert_eq!(next, PastDue);

        // 试用期内付款失败同样进入 past_due
        let next = transition(Some(&Trialing), &LifecycleEvent::PaymentFailed).unwrap();
        assert_eq!(next, PastDue);
    }

    #[test]
    fn test_past_due_recovers_to_active() {
        let next = transition(Some(&PastDue), &LifecycleEvent::Updated { status: Active }).unwrap();
        assert_eq!(next, Active);
    }

    #[test]
    fn test_canceled_is_terminal() {
        let err =
            transition(Some(&Canceled), &LifecycleEvent::Updated { status: Active }).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidEdge {
                from: Canceled,
                to: Active
            }
        );

        let err = transition(Some(&Canceled), &LifecycleEvent::PaymentFailed).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidEdge {
                from: Canceled,
                to: PastDue
            }
        );
    }

    #[test]
    fn test_deleted_is_idempotent() {
        let next = transition(Some(&Active), &LifecycleEvent::Deleted).unwrap();
        assert_eq!(next, Canceled);

        // 重复投递 deleted 仍停留在 canceled
        let next = transition(Some(&Canceled), &LifecycleEvent::Deleted).unwrap();
        assert_eq!(next, Canceled);
    }

    #[test]
    fn test_update_arriving_before_create_upserts() {
        // 网络重试下 updated 可能先于 created 到达
        let next = transition(None, &LifecycleEvent::Updated { status: Active }).unwrap();
        assert_eq!(next, Active);

        // 其后迟到的 created(trialing) 会被边校验拒绝回退
        let err =
            transition(Some(&Active), &LifecycleEvent::Created { status: Trialing }).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidEdge {
                from: Active,
                to: Trialing
            }
        );
    }

    #[test]
    fn test_payment_succeeded_keeps_status() {
        let next = transition(Some(&PastDue), &LifecycleEvent::PaymentSucceeded).unwrap();
        assert_eq!(next, PastDue);

        let next = transition(Some(&Active), &LifecycleEvent::PaymentSucceeded).unwrap();
        assert_eq!(next, Active);
    }

    #[test]
    fn test_events_requiring_existing_row() {
        assert!(matches!(
            transition(None, &LifecycleEvent::Deleted),
            Err(TransitionError::MissingSubscription { .. })
        ));
        assert!(matches!(
            transition(None, &LifecycleEvent::PaymentFailed),
            Err(TransitionError::MissingSubscription { .. })
        ));
    }

    #[test]
    fn test_full_lifecycle_scenario() {
        // created(team, trialing) -> payment_failed -> updated(active)
        let s = transition(None, &LifecycleEvent::Created { status: Trialing }).unwrap();
        let s = transition(Some(&s), &LifecycleEvent::PaymentFailed).unwrap();
        assert_eq!(s, PastDue);
        let s = transition(Some(&s), &LifecycleEvent::Updated { status: Active }).unwrap();
        assert_eq!(s, Active);
        let s = transition(Some(&s), &LifecycleEvent::Deleted).unwrap();
        assert_eq!(s, Canceled);
    }
}
