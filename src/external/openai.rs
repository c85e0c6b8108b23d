use crate::config::OpenAiConfig;
use crate::error::{AppError, AppResult};
use crate::models::CommitStyle;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: i64,
}

#[derive(Debug)]
pub struct GeneratedCommit {
    pub message: String,
    pub style: CommitStyle,
    pub tokens_used: i64,
}

#[derive(Debug)]
pub struct CommitAnalysis {
    pub analysis: String,
    pub tokens_used: i64,
}

/// 为所选风格构造 system prompt，附带风格示例与可选的自定义指令
pub fn build_system_prompt(style: CommitStyle, custom_instructions: &str) -> String {
    let mut prompt = format!(
        "You are a Git commit message generator. {}.\n\n\
         Examples of good commit messages in this style:\n{}\n\n\
         Guidelines:\n\
         - Keep the subject line under 72 characters\n\
         - Use present tense (\"add\" not \"added\")\n\
         - Be concise but descriptive\n\
         - Focus on what and why, not how",
        style.prompt(),
        style.examples()
    );
    if !custom_instructions.is_empty() {
        prompt.push_str("\n\nAdditional instructions: ");
        prompt.push_str(custom_instructions);
    }
    prompt
}

#[derive(Clone)]
pub struct OpenAiService {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiService {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn chat_completion(
        &self,
        system_prompt: String,
        user_prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> AppResult<(String, i64)> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::GenerationError(format!(
                "Chat completion request failed: {error_text}"
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| {
                AppError::GenerationError("Chat completion returned no choices".to_string())
            })?;
        let tokens_used = completion.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok((content, tokens_used))
    }

    /// 根据 diff 生成指定风格的提交信息
    pub async fn generate_commit_message(
        &self,
        diff: &str,
        style: CommitStyle,
        custom_instructions: &str,
    ) -> AppResult<GeneratedCommit> {
        let system_prompt = build_system_prompt(style, custom_instructions);
        let user_prompt = format!("Generate a commit message for the following git diff:\n\n{diff}");

        let (message, tokens_used) = self
            .chat_completion(system_prompt, user_prompt, 0.7, 200)
            .await?;

        log::info!(
            "Generated commit message (style={style}, length={})",
            message.len()
        );

        Ok(GeneratedCommit {
            message,
            style,
            tokens_used,
        })
    }

    /// 分析历史提交信息的风格与一致性
    pub async fn analyze_commit_history(&self, messages: &[String]) -> AppResult<CommitAnalysis> {
        let system_prompt = "Analyze the git commit history and provide insights about commit \
                             patterns, style consistency, and suggestions for improvement."
            .to_string();
        let user_prompt = format!("Analyze these commit messages:\n\n{}", messages.join("\n"));

        let (analysis, tokens_used) = self
            .chat_completion(system_prompt, user_prompt, 0.5, 500)
            .await?;

        Ok(CommitAnalysis {
            analysis,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_contains_style_examples() {
        for style in CommitStyle::ALL {
            let prompt = build_system_prompt(style, "");
            assert!(prompt.contains(style.prompt()));
            assert!(prompt.contains(style.examples()));
        }
    }

    #[test]
    fn test_system_prompt_appends_custom_instructions() {
        let prompt = build_system_prompt(CommitStyle::Conventional, "Mention the ticket number");
        assert!(prompt.contains("Additional instructions: Mention the ticket number"));

        // 未提供自定义指令时不出现附加段落
        let prompt = build_system_prompt(CommitStyle::Conventional, "");
        assert!(!prompt.contains("Additional instructions"));
    }
}
