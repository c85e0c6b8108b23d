use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// diff 预览入库前的截断上限，限制存储占用
pub const DIFF_PREVIEW_MAX_LEN: usize = 500;

/// 提交信息风格，每种风格对应一套 system prompt 与示例
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommitStyle {
    #[default]
    Conventional,
    Descriptive,
    Emoji,
    Semantic,
    Ticket,
}

impl CommitStyle {
    pub const ALL: [CommitStyle; 5] = [
        CommitStyle::Conventional,
        CommitStyle::Descriptive,
        CommitStyle::Emoji,
        CommitStyle::Semantic,
        CommitStyle::Ticket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStyle::Conventional => "conventional",
            CommitStyle::Descriptive => "descriptive",
            CommitStyle::Emoji => "emoji",
            CommitStyle::Semantic => "semantic",
            CommitStyle::Ticket => "ticket",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            CommitStyle::Conventional => "Generate a conventional commit message",
            CommitStyle::Descriptive => {
                "Generate a descriptive commit message that explains what and why"
            }
            CommitStyle::Emoji => "Generate a commit message with relevant emojis",
            CommitStyle::Semantic => {
                "Generate a semantic commit message following Angular conventions"
            }
            CommitStyle::Ticket => "Generate a commit message with ticket/issue reference",
        }
    }

    pub fn examples(&self) -> &'static str {
        match self {
            CommitStyle::Conventional => {
                "feat: add user authentication\nfix: resolve memory leak in cache\ndocs: update API documentation"
            }
            CommitStyle::Descriptive => {
                "Add user authentication system with JWT tokens\nFix memory leak in Redis cache by properly closing connections"
            }
            CommitStyle::Emoji => {
                "✨ Add new user dashboard\n🐛 Fix login redirect issue\n📚 Update installation guide"
            }
            CommitStyle::Semantic => {
                "feat(auth): implement JWT authentication\nfix(cache): resolve memory leak\nchore(deps): update dependencies"
            }
            CommitStyle::Ticket => {
                "[FEAT-123] Add user authentication\n[BUG-456] Fix memory leak in cache\n[DOC-789] Update API docs"
            }
        }
    }
}

impl std::fmt::Display for CommitStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// diff 预览截断，保证不落在多字节字符中间
pub fn truncate_diff_preview(diff: &str) -> String {
    if diff.len() <= DIFF_PREVIEW_MAX_LEN {
        return diff.to_string();
    }
    let mut end = DIFF_PREVIEW_MAX_LEN;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    diff[..end].to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCommitRequest {
    /// 待生成提交信息的 git diff 文本，必填
    pub diff: String,
    #[serde(default)]
    pub style: CommitStyle,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCommitResponse {
    pub message: String,
    pub style: CommitStyle,
    pub tokens_used: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommitHistoryItem {
    pub id: i64,
    pub message: String,
    pub style: String,
    pub diff_preview: String,
    pub tokens_used: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<crate::entities::commit_history::Model> for CommitHistoryItem {
    fn from(model: crate::entities::commit_history::Model) -> Self {
        Self {
            id: model.id,
            message: model.message,
            style: model.style,
            diff_preview: model.diff_preview,
            tokens_used: model.tokens_used,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeCommitsRequest {
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCommitsResponse {
    pub analysis: String,
    pub commit_count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StylesResponse {
    pub default: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_conventional() {
        assert_eq!(CommitStyle::default(), CommitStyle::Conventional);

        // style 缺省时反序列化回落到 conventional
        let req: GenerateCommitRequest =
            serde_json::from_str(r#"{"diff": "diff --git a/x b/x"}"#).unwrap();
        assert_eq!(req.style, CommitStyle::Conventional);
    }

    #[test]
    fn test_unknown_style_is_rejected() {
        let result =
            serde_json::from_str::<GenerateCommitRequest>(r#"{"diff": "x", "style": "haiku"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_every_style_has_prompt_and_examples() {
        for style in CommitStyle::ALL {
            assert!(!style.prompt().is_empty());
            assert!(!style.examples().is_empty());
        }
    }

    #[test]
    fn test_truncate_short_diff_unchanged() {
        let diff = "diff --git a/src/main.rs b/src/main.rs";
        assert_eq!(truncate_diff_preview(diff), diff);
    }

    #[test]
    fn test_truncate_long_diff_bounded() {
        let diff = "x".repeat(2000);
        let preview = truncate_diff_preview(&diff);
        assert_eq!(preview.len(), DIFF_PREVIEW_MAX_LEN);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 在截断点附近填充多字节字符，不允许 panic
        let diff = "变".repeat(400);
        let preview = truncate_diff_preview(&diff);
        assert!(preview.len() <= DIFF_PREVIEW_MAX_LEN);
        assert!(diff.starts_with(&preview));
    }
}
