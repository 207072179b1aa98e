//! Anthropic Messages API generator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use prepnest_shared::{
    CurriculumAlignment, LessonDocument, LessonRewrite, PrepnestError, Result, WorkerConfig,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::ContentGenerator;
use crate::prompts::{build_curriculum_prompt, build_rewrite_prompt};
use crate::response::parse_reply;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Messages API version header value.
const API_VERSION: &str = "2023-06-01";

/// Token ceiling for the alignment stage.
const ALIGN_MAX_TOKENS: u32 = 2_000;

/// Token ceiling for the rewrite stage.
const REWRITE_MAX_TOKENS: u32 = 8_000;

/// Long rewrites can take minutes.
const REQUEST_TIMEOUT_SECS: u64 = 300;

const USER_AGENT: &str = concat!("Prepnest/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Generator backed by the Anthropic Messages API.
pub struct AnthropicGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, model)
    }

    /// Build a generator from the resolved worker config.
    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        let api_key = config.generator_api_key.clone().ok_or_else(|| {
            PrepnestError::config(format!("{} is not set", config.api_key_env))
        })?;
        let base_url = config
            .generator_base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        Self::with_base_url(base_url, api_key, config.model.clone())
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PrepnestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Send one user prompt and return the text of the first content block.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| PrepnestError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PrepnestError::Network(format!("{url}: failed to read body: {e}")))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(500).collect();
            return Err(PrepnestError::Generation(format!("HTTP {status}: {snippet}")));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            PrepnestError::Generation(format!("invalid Messages API response: {e}"))
        })?;

        if let Some(usage) = &parsed.usage {
            info!(
                tokens_in = usage.input_tokens,
                tokens_out = usage.output_tokens,
                latency_ms = started.elapsed().as_millis() as u64,
                "generation complete"
            );
        }
        debug!(stop_reason = ?parsed.stop_reason, "messages response");

        match parsed.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => Ok(text),
            _ => Err(PrepnestError::Generation("unexpected response type".into())),
        }
    }
}

#[async_trait]
impl ContentGenerator for AnthropicGenerator {
    #[instrument(skip_all, fields(lesson = %lesson.id))]
    async fn align_document(&self, lesson: &LessonDocument) -> Result<CurriculumAlignment> {
        // No syllabus source is wired in yet.
        let prompt = build_curriculum_prompt(
            lesson.subject_name(),
            lesson.topic_title(),
            "",
            lesson.raw_content(),
        );
        let text = self.complete(&prompt, ALIGN_MAX_TOKENS).await?;
        parse_reply(&text)
    }

    #[instrument(skip_all, fields(lesson = %lesson.id))]
    async fn rewrite_document(&self, lesson: &LessonDocument) -> Result<LessonRewrite> {
        let prompt = build_rewrite_prompt(
            lesson.subject_name(),
            lesson.topic_title(),
            lesson.exam_level(),
            lesson.raw_content(),
        );
        let text = self.complete(&prompt, REWRITE_MAX_TOKENS).await?;
        parse_reply(&text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use prepnest_shared::{IpRiskLevel, TopicRef};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn lesson() -> LessonDocument {
        LessonDocument {
            id: "lesson-7".into(),
            title: Some("Simple Interest".into()),
            raw_content: Some("Interest is the charge for borrowing money.".into()),
            topic: Some(TopicRef {
                title: Some("Commercial Arithmetic".into()),
                education_level: Some("WASSCE".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-test",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 812, "output_tokens": 240 }
        }))
    }

    #[tokio::test]
    async fn align_sends_prompt_and_parses_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 2000,
                "messages": [{ "role": "user" }]
            })))
            .respond_with(text_reply(
                r#"{"curriculumObjectives":["2.1"],"curriculumCompetencies":["Recall"],"curriculumCurrencyRules":"GHS","canonicalTerms":[]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::with_base_url(&server.uri(), "sk-ant-test", "claude-test").unwrap();
        let alignment = generator.align_document(&lesson()).await.unwrap();
        assert_eq!(alignment.curriculum_objectives, vec!["2.1"]);
        assert_eq!(generator.model_id(), "claude-test");
    }

    #[tokio::test]
    async fn rewrite_unwraps_fenced_json() {
        let server = MockServer::start().await;

        let reply = "```json\n{\"learningObjectives\":[\"Calculate simple interest\"],\"coreContent\":[],\"workedExamples\":[],\"summary\":[],\"examTips\":[],\"keyTerms\":[],\"changeLog\":\"Rewritten\",\"ipRiskLevel\":\"low\",\"similarityWarning\":null}\n```";

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({ "max_tokens": 8000 })))
            .respond_with(text_reply(reply))
            .expect(1)
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::with_base_url(&server.uri(), "sk-ant-test", "claude-test").unwrap();
        let rewrite = generator.rewrite_document(&lesson()).await.unwrap();
        assert_eq!(rewrite.learning_objectives, vec!["Calculate simple interest"]);
        assert_eq!(rewrite.ip_risk_level, IpRiskLevel::Low);
    }

    #[tokio::test]
    async fn non_text_block_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "tool_use", "id": "t1", "name": "x", "input": {} }]
            })))
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::with_base_url(&server.uri(), "k", "claude-test").unwrap();
        let err = generator.align_document(&lesson()).await.unwrap_err();
        assert_eq!(err.to_string(), "generation error: unexpected response type");
    }

    #[tokio::test]
    async fn api_error_is_generation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string(
                r#"{"type":"error","error":{"type":"rate_limit_error","message":"Rate limited"}}"#,
            ))
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::with_base_url(&server.uri(), "k", "claude-test").unwrap();
        let err = generator.rewrite_document(&lesson()).await.unwrap_err();
        assert!(matches!(err, PrepnestError::Generation(_)));
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn from_config_requires_key() {
        let config = WorkerConfig::default();
        assert!(AnthropicGenerator::from_config(&config).is_err());

        let config = WorkerConfig {
            generator_api_key: Some("sk-ant".into()),
            ..WorkerConfig::default()
        };
        let generator = AnthropicGenerator::from_config(&config).unwrap();
        assert_eq!(generator.model_id(), "claude-sonnet-4-20250514");
    }
}
