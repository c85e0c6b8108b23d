use sea_orm_migration::prelude::*;
use sea_orm_migration::prelude::extension::postgres::Type;

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    StripeCustomerId,
    Company,
    Timezone,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    AccountId,
    StripeSubscriptionId,
    StripeCustomerId,
    Plan,
    Status,
    CurrentPeriodStart,
    CurrentPeriodEnd,
    CancelAtPeriodEnd,
    TrialEnd,
    CanceledAt,
    PaymentFailedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UsageStats {
    Table,
    Id,
    AccountId,
    Month,
    CommitsGenerated,
    TokensUsed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    StripeInvoiceId,
    StripeSubscriptionId,
    AmountCents,
    Currency,
    Status,
    FailureReason,
    PaidAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CommitHistory {
    Table,
    Id,
    AccountId,
    Message,
    Style,
    DiffPreview,
    TokensUsed,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 枚举类型
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("plan_tier"))
                    .values(vec![
                        Alias::new("individual"),
                        Alias::new("team"),
                        Alias::new("enterprise"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("subscription_status"))
                    .values(vec![
                        Alias::new("trialing"),
                        Alias::new("active"),
                        Alias::new("past_due"),
                        Alias::new("canceled"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("payment_status"))
                    .values(vec![Alias::new("succeeded"), Alias::new("failed")])
                    .to_owned(),
            )
            .await?;

        // accounts 表
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Accounts::StripeCustomerId).string().null())
                    .col(ColumnDef::new(Accounts::Company).string().null())
                    .col(ColumnDef::new(Accounts::Timezone).string().null())
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_stripe_customer_id")
                    .table(Accounts::Table)
                    .col(Accounts::StripeCustomerId)
                    .to_owned(),
            )
            .await?;

        // subscriptions 表 (stripe_subscription_id 为 upsert 键)
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StripeSubscriptionId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StripeCustomerId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Plan)
                            .custom(Alias::new("plan_tier"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .custom(Alias::new("subscription_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CurrentPeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CurrentPeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CancelAtPeriodEnd)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::TrialEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CanceledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PaymentFailedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_account_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::AccountId)
                    .to_owned(),
            )
            .await?;

        // usage_stats 表 (按账号+自然月唯一)
        manager
            .create_table(
                Table::create()
                    .table(UsageStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageStats::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsageStats::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsageStats::Month).string().not_null())
                    .col(
                        ColumnDef::new(UsageStats::CommitsGenerated)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UsageStats::TokensUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UsageStats::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UsageStats::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_stats_account_month")
                    .table(UsageStats::Table)
                    .col(UsageStats::AccountId)
                    .col(UsageStats::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // payments 表 (只追加的账单审计记录)
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::StripeInvoiceId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::StripeSubscriptionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Payments::Status)
                            .custom(Alias::new("payment_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::FailureReason).string().null())
                    .col(
                        ColumnDef::new(Payments::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_stripe_subscription_id")
                    .table(Payments::Table)
                    .col(Payments::StripeSubscriptionId)
                    .to_owned(),
            )
            .await?;

        // commit_history 表
        manager
            .create_table(
                Table::create()
                    .table(CommitHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommitHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommitHistory::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommitHistory::Message).text().not_null())
                    .col(ColumnDef::new(CommitHistory::Style).string().not_null())
                    .col(ColumnDef::new(CommitHistory::DiffPreview).text().not_null())
                    .col(
                        ColumnDef::new(CommitHistory::TokensUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CommitHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_commit_history_account_id")
                    .table(CommitHistory::Table)
                    .col(CommitHistory::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommitHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsageStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("payment_status")).to_owned())
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .name(Alias::new("subscription_status"))
                    .to_owned(),
            )
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("plan_tier")).to_owned())
            .await
    }
}
