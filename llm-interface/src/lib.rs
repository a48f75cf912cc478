use replyflow_core::{Candidate, LlmError, LlmSettings, ReplyContext};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub mod prompt;

pub use prompt::MAX_REPLY_CHARS;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const MAX_COMPLETION_TOKENS: u32 = 150;
const TEMPERATURE: f64 = 0.8;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Seam between the pipeline driver and the hosted completion API, so runs
/// can be exercised without network access.
pub trait ReplyGenerator {
    async fn generate(
        &self,
        settings: &LlmSettings,
        candidate: &Candidate,
        context: &ReplyContext,
    ) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat-completion client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    api_base: String,
}

impl LlmClient {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            http: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyGenerator for LlmClient {
    async fn generate(
        &self,
        settings: &LlmSettings,
        candidate: &Candidate,
        context: &ReplyContext,
    ) -> Result<String, LlmError> {
        let messages = [
            ChatMessage {
                role: "system".to_string(),
                content: prompt::build_system_prompt(settings, context),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt::build_user_prompt(candidate, context),
            },
        ];

        debug!("Requesting completion from model {}", settings.model);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&settings.api_key)
            .json(&ChatCompletionRequest {
                model: &settings.model,
                messages: &messages,
                max_tokens: MAX_COMPLETION_TOKENS,
                temperature: TEMPERATURE,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse {
                    details: e.to_string(),
                })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        // Length ceiling is enforced here, not just asked for in the prompt;
        // the model's instruction-following is not trusted.
        let reply = prompt::truncate_reply(&content);
        info!("Generated {} character reply", reply.chars().count());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Nice post!"}, "finish_reason": "stop"}
            ],
            "usage": {"total_tokens": 20}
        }"#;

        let completion: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let content = completion.choices[0].message.content.as_deref();
        assert_eq!(content, Some("Nice post!"));
    }

    #[test]
    fn empty_choices_parse_to_no_content() {
        let completion: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(completion.choices.is_empty());
    }

    #[test]
    fn request_serializes_fixed_sampling_parameters() {
        let messages = [ChatMessage {
            role: "system".to_string(),
            content: "be nice".to_string(),
        }];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 150);
        assert_eq!(json["temperature"], 0.8);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn api_base_trailing_slash_is_normalized() {
        let client = LlmClient::with_api_base("https://example.test/v1/");
        assert_eq!(client.api_base, "https://example.test/v1");
    }
}
