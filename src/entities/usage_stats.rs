use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 按账号 + 自然月 ("YYYY-MM") 的用量计数，只增不减
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "usage_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    pub month: String,
    pub commits_generated: i64,
    pub tokens_used: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
