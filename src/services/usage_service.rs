use crate::database::DbPool;
use crate::entities::usage_stats_entity as usage_stats;
use crate::error::AppResult;
use crate::models::{UsageResponse, UsageSnapshot};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

/// 当前自然月，"YYYY-MM"
pub fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

#[derive(Clone)]
pub struct UsageService {
    pool: DbPool,
}

impl UsageService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// 惰性建立某账号某月的用量行；已存在时为无操作
    pub async fn ensure_month_row(&self, account_id: i64, month: &str) -> AppResult<()> {
        let result = usage_stats::Entity::insert(usage_stats::ActiveModel {
            account_id: Set(account_id),
            month: Set(month.to_string()),
            commits_generated: Set(0),
            tokens_used: Set(0),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([usage_stats::Column::AccountId, usage_stats::Column::Month])
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

    /// 原子累加当月的提交数与 token 消耗；计数只增不减
    pub async fn record_generation(&self, account_id: i64, tokens_used: i64) -> AppResult<()> {
        let month = current_month();
        self.ensure_month_row(account_id, &month).await?;

        usage_stats::Entity::update_many()
            .col_expr(
                usage_stats::Column::CommitsGenerated,
                Expr::col(usage_stats::Column::CommitsGenerated).add(1),
            )
            .col_expr(
                usage_stats::Column::TokensUsed,
                Expr::col(usage_stats::Column::TokensUsed).add(tokens_used),
            )
            .col_expr(
                usage_stats::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(usage_stats::Column::AccountId.eq(account_id))
            .filter(usage_stats::Column::Month.eq(month.as_str()))
            .exec(&self.pool)
            .await?;

        Ok(())
    }

    /// 当月快照 + 最近 6 个月历史
    pub async fn get_usage(&self, account_id: i64) -> AppResult<UsageResponse> {
        let month = current_month();

        let current = usage_stats::Entity::find()
            .filter(usage_stats::Column::AccountId.eq(account_id))
            .filter(usage_stats::Column::Month.eq(month.as_str()))
            .one(&self.pool)
            .await?
            .map(UsageSnapshot::from)
            .unwrap_or(UsageSnapshot {
                month,
                commits_generated: 0,
                tokens_used: 0,
            });

        let history = usage_stats::Entity::find()
            .filter(usage_stats::Column::AccountId.eq(account_id))
            .order_by_desc(usage_stats::Column::Month)
            .limit(6)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(UsageSnapshot::from)
            .collect();

        Ok(UsageResponse { current, history })
    }
}
