use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 已处理的 Stripe 事件台账，用于重复投递去重，定期清理
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub stripe_event_id: String,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
