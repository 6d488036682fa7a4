//! Direct OpenAI chat-completions backend.

use async_trait::async_trait;
use lifewheel_core::{Category, WheelScores, format_score};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{AiBackend, AiError, FeedbackInput, RawScores};
use crate::decode;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Sampling parameters for one capability.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tuning {
    temperature: f32,
    max_tokens: u32,
}

const CLASSIFY: Tuning = Tuning { temperature: 0.3, max_tokens: 150 };
const TRANSLATE: Tuning = Tuning { temperature: 0.3, max_tokens: 500 };
const UPDATE: Tuning = Tuning { temperature: 0.4, max_tokens: 300 };
const ANALYZE: Tuning = Tuning { temperature: 0.7, max_tokens: 350 };

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn system(content: String) -> Self {
        Self { role: "system".into(), content }
    }

    fn user(content: String) -> Self {
        Self { role: "user".into(), content }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Prompts ──

fn category_list() -> String {
    Category::labels().join(", ")
}

fn score_lines(scores: &WheelScores) -> String {
    scores
        .iter()
        .map(|(c, v)| format!("{c}: {}", format_score(v)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn classify_prompt() -> String {
    format!(
        "You are a classifier for Wheel of Life feedback. The categories are: {}. \
         Return ONLY an array of relevant category names from that list, as a JSON array of strings. \
         If no categories are relevant, return an empty array.",
        category_list()
    )
}

fn translate_prompt() -> String {
    "You are a translator that translates any text to English. \
     Only return the translated text with no additional commentary."
        .to_string()
}

fn update_prompt(baseline: &WheelScores, affected: &[Category]) -> String {
    let affected: Vec<&str> = affected.iter().map(|c| c.label()).collect();
    format!(
        "You update Wheel of Life scores based on feedback. The categories are: {}.\n\n\
         Current scores:\n{}\n\n\
         Analyze only the following categories: {}.\n\
         Return ONLY a JSON object mapping each affected category name to its updated score. \
         Scores must stay between 1 and 10 and change by 0.5 to 2 points depending on the feedback. \
         Do not include categories that are not affected.",
        category_list(),
        score_lines(baseline),
        affected.join(", ")
    )
}

fn update_message(feedback: &FeedbackInput) -> String {
    format!("Feedback from {}: \"{}\"", feedback.from, feedback.text)
}

fn analysis_prompt() -> String {
    "You are a life coach assistant that provides insightful analysis of a user's Wheel of Life. \
     You'll be given scores for various life categories. Identify areas of strength (highest scores), \
     identify areas that need improvement (lowest scores), provide a brief encouraging analysis \
     and suggest one simple action to improve the lowest scoring area. \
     Keep your response concise, positive, and action-oriented. Maximum 4 short paragraphs."
        .to_string()
}

fn analysis_message(scores: &WheelScores, username: &str) -> String {
    format!(
        "Here is {username}'s Wheel of Life scores (out of 10):\n{}",
        score_lines(scores)
    )
}

// ── Client ──

/// [`AiBackend`] that talks to `{base_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(mut config: OpenAiConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        info!(model = %config.model, base_url = %config.base_url, "using OpenAI backend");
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn chat(&self, system: String, user: String, tuning: Tuning) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![Message::system(system), Message::user(user)],
            temperature: tuning.temperature,
            max_tokens: tuning.max_tokens,
        };

        debug!(url = %url, max_tokens = tuning.max_tokens, "chat completion request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::Decode("no completion choices".into()))?;
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl AiBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, text: &str) -> Result<Vec<String>, AiError> {
        let content = self
            .chat(classify_prompt(), text.to_string(), CLASSIFY)
            .await?;
        decode::labels(&content)
    }

    async fn translate(&self, text: &str) -> Result<String, AiError> {
        self.chat(translate_prompt(), text.to_string(), TRANSLATE)
            .await
    }

    async fn update_scores(
        &self,
        baseline: &WheelScores,
        feedback: &FeedbackInput,
    ) -> Result<RawScores, AiError> {
        let content = self
            .chat(
                update_prompt(baseline, &feedback.categories),
                update_message(feedback),
                UPDATE,
            )
            .await?;
        decode::scores(&content)
    }

    async fn analyze(&self, scores: &WheelScores, username: &str) -> Result<String, AiError> {
        self.chat(analysis_prompt(), analysis_message(scores, username), ANALYZE)
            .await
    }
}
