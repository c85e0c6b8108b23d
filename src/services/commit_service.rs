use crate::database::DbPool;
use crate::entities::commit_history_entity as commit_history;
use crate::error::{AppError, AppResult};
use crate::external::OpenAiService;
use crate::models::{
    AnalyzeCommitsResponse, CommitHistoryItem, GenerateCommitRequest, GenerateCommitResponse,
    PaginatedResponse, PaginationParams, StylesResponse, truncate_diff_preview,
};
use crate::models::commit::CommitStyle;
use crate::services::usage_service::UsageService;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

const DEFAULT_ANALYZE_LIMIT: u64 = 100;

/// diff 必填且不能是纯空白；校验在任何副作用之前执行
fn validate_diff(diff: &str) -> AppResult<()> {
    if diff.trim().is_empty() {
        return Err(AppError::ValidationError("Git diff is required".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CommitService {
    pool: DbPool,
    openai_service: OpenAiService,
    usage_service: UsageService,
}

impl CommitService {
    pub fn new(pool: DbPool, openai_service: OpenAiService) -> Self {
        let usage_service = UsageService::new(pool.clone());
        Self {
            pool,
            openai_service,
            usage_service,
        }
    }

    /// 单次生成的编排：校验 -> 生成 -> 落历史 -> 记用量。
    /// 校验失败在任何副作用之前返回
    pub async fn generate(
        &self,
        account_id: i64,
        request: GenerateCommitRequest,
    ) -> AppResult<GenerateCommitResponse> {
        validate_diff(&request.diff)?;

        let custom_instructions = request.custom_instructions.unwrap_or_default();
        let generated = self
            .openai_service
            .generate_commit_message(&request.diff, request.style, &custom_instructions)
            .await?;

        commit_history::ActiveModel {
            account_id: Set(account_id),
            message: Set(generated.message.clone()),
            style: Set(generated.style.to_string()),
            diff_preview: Set(truncate_diff_preview(&request.diff)),
            tokens_used: Set(generated.tokens_used),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        self.usage_service
            .record_generation(account_id, generated.tokens_used)
            .await?;

        Ok(GenerateCommitResponse {
            message: generated.message,
            style: generated.style,
            tokens_used: generated.tokens_used,
        })
    }

    pub async fn get_history(
        &self,
        account_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<CommitHistoryItem>> {
        let total = commit_history::Entity::find()
            .filter(commit_history::Column::AccountId.eq(account_id))
            .count(&self.pool)
            .await? as i64;

        let records = commit_history::Entity::find()
            .filter(commit_history::Column::AccountId.eq(account_id))
            .order_by_desc(commit_history::Column::CreatedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<CommitHistoryItem> =
            records.into_iter().map(CommitHistoryItem::from).collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.get_limit(),
            total,
        ))
    }

    /// 对最近的提交信息做风格与一致性分析（team/enterprise 功能）
    pub async fn analyze(
        &self,
        account_id: i64,
        limit: Option<u64>,
    ) -> AppResult<AnalyzeCommitsResponse> {
        let limit = limit.unwrap_or(DEFAULT_ANALYZE_LIMIT).clamp(1, 500);

        let messages: Vec<String> = commit_history::Entity::find()
            .filter(commit_history::Column::AccountId.eq(account_id))
            .order_by_desc(commit_history::Column::CreatedAt)
            .limit(limit)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|record| record.message)
            .collect();

        if messages.is_empty() {
            return Err(AppError::ValidationError(
                "No commits found to analyze".to_string(),
            ));
        }

        let commit_count = messages.len();
        let analysis = self.openai_service.analyze_commit_history(&messages).await?;

        Ok(AnalyzeCommitsResponse {
            analysis: analysis.analysis,
            commit_count,
            generated_at: Utc::now(),
        })
    }

    pub fn styles(&self) -> StylesResponse {
        StylesResponse {
            default: CommitStyle::ALL
                .iter()
                .map(|style| style.as_str().to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_diff_is_rejected() {
        assert!(matches!(
            validate_diff(""),
            Err(AppError::ValidationError(_))
        ));
        // 纯空白等同于缺失
        assert!(matches!(
            validate_diff("  \n\t "),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_non_empty_diff_passes() {
        assert!(validate_diff("diff --git a/src/lib.rs b/src/lib.rs").is_ok());
    }
}
