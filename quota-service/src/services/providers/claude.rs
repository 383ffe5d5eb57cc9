//! Claude provider implementation.
//!
//! Generates content through the Anthropic Messages API. Each category gets
//! its own system prompt that pins the output to a strict JSON shape; the
//! response text is parsed into the typed body for that category.

use super::{ContentGenerator, ContentRequest, ProviderError};
use crate::models::{CalendarDay, Category, ContentBody, Scene};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Anthropic API base URL.
const CLAUDE_API_BASE: &str = "https://api.anthropic.com/v1";

const API_VERSION: &str = "2023-06-01";

/// Claude provider configuration.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: i32,
}

/// Claude content generator.
pub struct ClaudeContentGenerator {
    config: ClaudeConfig,
    client: Client,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: i32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct HookPayload {
    hooks: Vec<String>,
}

#[derive(Deserialize)]
struct ScriptPayload {
    scenes: Vec<Scene>,
    cta: String,
    total_duration: i64,
}

#[derive(Deserialize)]
struct ShotlistPayload {
    shots: Vec<String>,
}

#[derive(Deserialize)]
struct VoiceoverPayload {
    text: String,
    estimated_duration: i64,
}

#[derive(Deserialize)]
struct CaptionPayload {
    caption: String,
    hashtags: Vec<String>,
}

#[derive(Deserialize)]
struct BrollPayload {
    ideas: Vec<String>,
}

#[derive(Deserialize)]
struct CalendarPayload {
    days: Vec<CalendarDay>,
}

fn system_prompt(category: Category) -> Result<&'static str, ProviderError> {
    let prompt = match category {
        Category::Hook => {
            "You write viral short-video hooks. Generate exactly 10 hooks of 5-10 words each \
             for the given topic. Respond ONLY with JSON: {\"hooks\": [\"...\", ...]}"
        }
        Category::Script => {
            "You write short-video scripts of 2-4 scenes totalling 10-20 seconds. Each scene \
             has scene_number, kind (facecam, broll or overlay), text, duration_seconds and \
             visual_description. Respond ONLY with JSON: {\"scenes\": [...], \"cta\": \"...\", \
             \"total_duration\": <seconds>}"
        }
        Category::Shotlist => {
            "You plan short-video shoots. Generate 3-4 concrete shot descriptions for the \
             given topic. Respond ONLY with JSON: {\"shots\": [\"...\", ...]}"
        }
        Category::Voiceover => {
            "You write voiceover copy for 10-20 second short videos. Respond ONLY with JSON: \
             {\"text\": \"...\", \"estimated_duration\": <seconds>}"
        }
        Category::Caption => {
            "You write social captions. Generate one caption plus exactly 15 hashtags, each \
             starting with '#'. Respond ONLY with JSON: {\"caption\": \"...\", \"hashtags\": \
             [\"#...\", ...]}"
        }
        Category::Broll => {
            "You plan b-roll footage. Generate exactly 10 ideas of 3-5 words each. Respond \
             ONLY with JSON: {\"ideas\": [\"...\", ...]}"
        }
        Category::Calendar => {
            "You plan 30-day content calendars. Generate one entry per day 1-30, each with \
             day, hook and theme. Respond ONLY with JSON: {\"days\": [{\"day\": 1, \"hook\": \
             \"...\", \"theme\": \"...\"}, ...]}"
        }
        Category::Export => {
            return Err(ProviderError::InvalidRequest(
                "export is not a generation category".to_string(),
            ));
        }
    };
    Ok(prompt)
}

impl ClaudeContentGenerator {
    pub fn new(config: ClaudeConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn user_message(request: &ContentRequest) -> String {
        let mut message = format!("Topic: {}", request.topic);
        if let Some(audience) = &request.target_audience {
            message.push_str(&format!("\nTarget audience: {}", audience));
        }
        if let Some(tone) = &request.tone {
            message.push_str(&format!("\nTone: {}", tone));
        }
        message
    }

    fn parse_body(
        category: Category,
        topic: &str,
        text: &str,
    ) -> Result<ContentBody, ProviderError> {
        // Claude occasionally wraps the JSON in a code fence.
        let text = text
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let malformed = |e: serde_json::Error| ProviderError::MalformedOutput(e.to_string());

        let body = match category {
            Category::Hook => {
                let payload: HookPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Hook {
                    hooks: payload.hooks,
                }
            }
            Category::Script => {
                let payload: ScriptPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Script {
                    scenes: payload.scenes,
                    cta: payload.cta,
                    total_duration: payload.total_duration,
                }
            }
            Category::Shotlist => {
                let payload: ShotlistPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Shotlist {
                    shots: payload.shots,
                }
            }
            Category::Voiceover => {
                let payload: VoiceoverPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Voiceover {
                    text: payload.text,
                    estimated_duration: payload.estimated_duration,
                }
            }
            Category::Caption => {
                let payload: CaptionPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Caption {
                    caption: payload.caption,
                    hashtags: payload.hashtags,
                }
            }
            Category::Broll => {
                let payload: BrollPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Broll {
                    ideas: payload.ideas,
                }
            }
            Category::Calendar => {
                let payload: CalendarPayload = serde_json::from_str(text).map_err(malformed)?;
                ContentBody::Calendar {
                    niche: topic.to_string(),
                    days: payload.days,
                }
            }
            Category::Export => {
                return Err(ProviderError::InvalidRequest(
                    "export is not a generation category".to_string(),
                ));
            }
        };
        Ok(body)
    }
}

#[async_trait]
impl ContentGenerator for ClaudeContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<ContentBody, ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Claude API key not set".to_string(),
            ));
        }

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: 0.8,
            system: system_prompt(request.category)?,
            messages: vec![Message {
                role: "user",
                content: Self::user_message(request),
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", CLAUDE_API_BASE))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .content
            .iter()
            .find_map(|block| block.text.as_deref())
            .ok_or_else(|| {
                ProviderError::MalformedOutput("response carried no text block".to_string())
            })?;

        Self::parse_body(request.category, &request.topic, text)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Claude API key not set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_hook_json() {
        let text = "```json\n{\"hooks\": [\"a b c d e\"]}\n```";
        let body = ClaudeContentGenerator::parse_body(Category::Hook, "topic", text).unwrap();
        assert_eq!(body.category(), Category::Hook);
    }

    #[test]
    fn rejects_non_json_output() {
        let err =
            ClaudeContentGenerator::parse_body(Category::Caption, "topic", "sorry, no").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));
    }
}
