//! Chat-completions text judge.
//!
//! Talks to any OpenAI-compatible chat endpoint. The judge is asked to reply
//! with a bare JSON array; models still wrap it in markdown fences often
//! enough that extraction tolerates both shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use linguaforge_core::model::Language;
use linguaforge_core::traits::{JudgeCorrection, TextJudge};

use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const GRAMMAR_SYSTEM_PROMPT: &str = "You are a strict grammar checker for language learners. \
Respond ONLY with a JSON array of corrections, no prose. Each element has the fields \
\"incorrect\" (the exact wrong phrase from the text), \"corrected\" (the fixed phrase), \
\"explanation\" (one short sentence), and \"category\" (a short kebab-case error category). \
Return [] if the text is grammatically correct.";

const NATURALNESS_SYSTEM_PROMPT: &str = "You judge whether learner text sounds natural to a \
native speaker. Respond ONLY with a JSON array of strings, each a short description of one \
unnatural phrasing. Return [] if the text reads naturally.";

/// `TextJudge` backed by an OpenAI-compatible chat-completions API.
pub struct ChatJudge {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl ChatJudge {
    pub fn new(api_key: &str, base_url: Option<String>, model: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
        }
    }

    async fn chat(&self, system_prompt: &str, user_prompt: String) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;

        Ok(api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl TextJudge for ChatJudge {
    fn name(&self) -> &str {
        "chat"
    }

    #[instrument(skip(self, text), fields(model = %self.model, language = %language))]
    async fn grammar_check(
        &self,
        text: &str,
        language: Language,
    ) -> anyhow::Result<Vec<JudgeCorrection>> {
        let prompt = format!("Language: {language}\nLearner text:\n{text}");
        let content = self.chat(GRAMMAR_SYSTEM_PROMPT, prompt).await?;
        let json = extract_json_from_markdown(&content);
        serde_json::from_str(json).map_err(|e| {
            ProviderError::MalformedResponse(format!("grammar judge returned non-JSON: {e}")).into()
        })
    }

    #[instrument(skip(self, text), fields(model = %self.model, language = %language))]
    async fn naturalness(&self, text: &str, language: Language) -> anyhow::Result<Vec<String>> {
        let prompt = format!("Language: {language}\nLearner text:\n{text}");
        let content = self.chat(NATURALNESS_SYSTEM_PROMPT, prompt).await?;
        let json = extract_json_from_markdown(&content);
        serde_json::from_str(json).map_err(|e| {
            ProviderError::MalformedResponse(format!("naturalness judge returned non-JSON: {e}"))
                .into()
        })
    }
}

/// Strip a markdown code fence around a JSON payload, if present.
pub fn extract_json_from_markdown(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence ("json", usually).
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}
