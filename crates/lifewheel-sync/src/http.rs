//! Client for the hosted functions at `{base}/functions/v1/{name}`.
//!
//! Each function wraps one language-model capability and answers either
//! with its result object or with `{"error": "..."}`.

use async_trait::async_trait;
use lifewheel_ai::backend::{AiBackend, AiError, FeedbackInput, RawScores};
use lifewheel_ai::decode;
use lifewheel_core::WheelScores;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

pub const CLASSIFY_FEEDBACK: &str = "classify-feedback";
pub const TRANSLATE_TEXT: &str = "translate-text";
pub const UPDATE_WHEEL: &str = "update-wheel-from-feedback";
pub const GENERATE_ANALYSIS: &str = "generate-wheel-analysis";

#[derive(Error, Debug)]
pub enum FunctionsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{function} returned {status}: {body}")]
    Server {
        function: &'static str,
        status: u16,
        body: String,
    },
    #[error("{function} reported: {message}")]
    Function {
        function: &'static str,
        message: String,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<FunctionsError> for AiError {
    fn from(e: FunctionsError) -> Self {
        AiError::Backend(Box::new(e))
    }
}

// ── Wire types ──

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    base_wheel_data: &'a WheelScores,
    feedback: &'a FeedbackInput,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    wheel_data: &'a WheelScores,
    username: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    categories: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    updated_wheel_data: Value,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    analysis: String,
}

/// Pull the `error` field out of a function's JSON body, if it has one.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// HTTP client for the hosted functions, usable as an [`AiBackend`].
pub struct FunctionsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FunctionsClient {
    /// `base_url` is the project URL, e.g. `https://abc.supabase.co`.
    /// A trailing slash is ignored.
    pub fn new(base_url: String, api_key: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        info!(base_url = %base_url, "using hosted functions backend");
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{name}", self.base_url)
    }

    /// POST `body` to the named function and decode its answer as `T`.
    pub async fn invoke<B, T>(&self, function: &'static str, body: &B) -> Result<T, FunctionsError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.function_url(function);
        debug!(url = %url, "invoking hosted function");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(FunctionsError::Server {
                function,
                status: status.as_u16(),
                body: error_message(&text).unwrap_or(text),
            });
        }
        if let Some(message) = error_message(&text) {
            return Err(FunctionsError::Function { function, message });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl AiBackend for FunctionsClient {
    fn name(&self) -> &str {
        "functions"
    }

    async fn classify(&self, text: &str) -> Result<Vec<String>, AiError> {
        let resp: ClassifyResponse = self
            .invoke(CLASSIFY_FEEDBACK, &TextRequest { text })
            .await?;
        decode::labels_from_value(resp.categories)
    }

    async fn translate(&self, text: &str) -> Result<String, AiError> {
        let resp: TranslateResponse = self.invoke(TRANSLATE_TEXT, &TextRequest { text }).await?;
        Ok(resp.translated_text)
    }

    async fn update_scores(
        &self,
        baseline: &WheelScores,
        feedback: &FeedbackInput,
    ) -> Result<RawScores, AiError> {
        let request = UpdateRequest {
            base_wheel_data: baseline,
            feedback,
        };
        let resp: UpdateResponse = self.invoke(UPDATE_WHEEL, &request).await?;
        decode::scores_from_value(resp.updated_wheel_data)
    }

    async fn analyze(&self, scores: &WheelScores, username: &str) -> Result<String, AiError> {
        let request = AnalysisRequest {
            wheel_data: scores,
            username,
        };
        let resp: AnalysisResponse = self.invoke(GENERATE_ANALYSIS, &request).await?;
        Ok(resp.analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifewheel_core::Category;

    #[test]
    fn trailing_slash_trimmed() {
        let client = FunctionsClient::new("https://abc.supabase.co/".into(), "key".into());
        assert_eq!(
            client.function_url(CLASSIFY_FEEDBACK),
            "https://abc.supabase.co/functions/v1/classify-feedback"
        );
    }

    #[test]
    fn update_request_wire_shape() {
        let mut scores = WheelScores::neutral();
        scores.set(Category::PersonalGrowth, 6.5);
        let feedback = FeedbackInput {
            from: "Joe".into(),
            text: "Keep learning".into(),
            categories: vec![Category::PersonalGrowth],
        };
        let v = serde_json::to_value(UpdateRequest {
            base_wheel_data: &scores,
            feedback: &feedback,
        })
        .unwrap();
        assert_eq!(v["baseWheelData"]["Personal Growth"], 6.5);
        assert_eq!(v["feedback"]["from"], "Joe");
        assert_eq!(v["feedback"]["categories"][0], "Personal Growth");
    }

    #[test]
    fn analysis_request_wire_shape() {
        let scores = WheelScores::neutral();
        let v = serde_json::to_value(AnalysisRequest {
            wheel_data: &scores,
            username: "Emma",
        })
        .unwrap();
        assert_eq!(v["username"], "Emma");
        assert_eq!(v["wheelData"]["Finance"], 5.0);
    }

    #[test]
    fn response_shapes() {
        let t: TranslateResponse =
            serde_json::from_str(r#"{"translatedText":"Good work"}"#).unwrap();
        assert_eq!(t.translated_text, "Good work");

        let u: UpdateResponse =
            serde_json::from_str(r#"{"updatedWheelData":{"Career":6,"Finance":"4.5"}}"#).unwrap();
        let raw = decode::scores_from_value(u.updated_wheel_data).unwrap();
        assert_eq!(raw["Career"], 6.0);
        assert_eq!(raw["Finance"], 4.5);

        let c: ClassifyResponse =
            serde_json::from_str(r#"{"categories":["Career","Mental Health"]}"#).unwrap();
        assert_eq!(
            decode::labels_from_value(c.categories).unwrap(),
            vec!["Career", "Mental Health"]
        );
    }

    #[test]
    fn malformed_update_fails_closed() {
        let u: UpdateResponse =
            serde_json::from_str(r#"{"updatedWheelData":{"Career":[6]}}"#).unwrap();
        assert!(decode::scores_from_value(u.updated_wheel_data).is_err());
    }

    #[test]
    fn error_body_detected() {
        assert_eq!(
            error_message(r#"{"error":"OPENAI_API_KEY is not configured"}"#).as_deref(),
            Some("OPENAI_API_KEY is not configured")
        );
        assert_eq!(error_message(r#"{"analysis":"fine"}"#), None);
        assert_eq!(error_message("not json"), None);
    }
}
