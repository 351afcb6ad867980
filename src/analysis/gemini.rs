//! Gemini (Google) vision analyzer.

use crate::analysis::analyzer::PromptAnalyzer;
use crate::analysis::types::{AnalysisResult, ImagePayload};
use crate::error::{sanitize_error_message, RepromptError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default bound on a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const INSTRUCTION: &str = "Analyze this AI-generated image. Based on its style, artifacts, \
and characteristics, determine a detailed, highly probable text prompt that could have been \
used to create it.\nRespond ONLY with a JSON object that adheres to the provided schema.";

const PROMPT_DESCRIPTION: &str = "A detailed, highly probable text prompt that could have been \
used to create the image. Capture the essence, style, and subject matter.";

/// Gemini vision model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash (fast, economical).
    #[default]
    Flash,
    /// Gemini 2.5 Flash-Lite (cheapest).
    FlashLite,
    /// Gemini 2.5 Pro (highest quality).
    Pro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash",
            Self::FlashLite => "gemini-2.5-flash-lite",
            Self::Pro => "gemini-2.5-pro",
        }
    }
}

/// Builder for GeminiAnalyzer.
#[derive(Debug, Clone)]
pub struct GeminiAnalyzerBuilder {
    model: GeminiModel,
    base_url: String,
    timeout: Duration,
}

impl Default for GeminiAnalyzerBuilder {
    fn default() -> Self {
        Self {
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GeminiAnalyzerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API host (for proxies and tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the analyzer.
    pub fn build(self) -> Result<GeminiAnalyzer> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        Ok(GeminiAnalyzer {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            model: self.model,
            timeout: self.timeout,
        })
    }
}

/// Reconstructs image prompts with a Gemini vision model.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    base_url: String,
    model: GeminiModel,
    timeout: Duration,
}

impl GeminiAnalyzer {
    /// Creates a new `GeminiAnalyzerBuilder`.
    pub fn builder() -> GeminiAnalyzerBuilder {
        GeminiAnalyzerBuilder::new()
    }

    /// The model this analyzer calls.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    async fn analyze_impl(&self, credential: &str, image: &ImagePayload) -> Result<AnalysisResult> {
        if credential.is_empty() {
            return Err(RepromptError::MissingCredential);
        }
        if image.is_empty() {
            return Err(RepromptError::MissingImage);
        }

        let start = Instant::now();
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );
        let body = GeminiRequest::for_image(image);

        tracing::debug!(
            model = self.model.as_str(),
            format = %image.format(),
            size = image.size(),
            "submitting analysis request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &text));
        }

        let result = parse_analysis(&text);
        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "analysis request finished"
        );
        result
    }

    /// Checks that the API accepts the given key, without analyzing anything.
    pub async fn verify_credential(&self, credential: &str) -> Result<()> {
        if credential.is_empty() {
            return Err(RepromptError::MissingCredential);
        }

        let url = format!("{}/v1beta/models/{}", self.base_url, self.model.as_str());
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", credential)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        match response.status().as_u16() {
            401 | 403 => Err(RepromptError::RequestFailed(
                "API key rejected by Gemini".into(),
            )),
            s if !(200..300).contains(&s) => {
                let text = response.text().await.unwrap_or_default();
                Err(parse_error(s, &text))
            }
            _ => Ok(()),
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> RepromptError {
        if err.is_timeout() {
            return RepromptError::RequestFailed(format!(
                "request timed out after {:?}",
                self.timeout
            ));
        }
        err.into()
    }
}

#[async_trait]
impl PromptAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, credential: &str, image: &ImagePayload) -> Result<AnalysisResult> {
        self.analyze_impl(credential, image).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

/// Maps a non-success response to a `RequestFailed` error.
fn parse_error(status: u16, text: &str) -> RepromptError {
    let detail = serde_json::from_str::<GeminiErrorResponse>(text)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| text.to_string());
    let detail = sanitize_error_message(&detail);

    let message = match status {
        401 | 403 => format!("API key rejected (HTTP {status})"),
        404 => "model not found (HTTP 404)".to_string(),
        429 => "rate limit or quota exceeded (HTTP 429)".to_string(),
        _ => format!("HTTP {status}"),
    };

    if detail.is_empty() {
        RepromptError::RequestFailed(message)
    } else {
        RepromptError::RequestFailed(format!("{message}: {detail}"))
    }
}

/// Turns a successful `generateContent` body into a validated result.
///
/// The structured-output schema is requested but not trusted: the model text
/// is parsed and checked locally.
fn parse_analysis(body: &str) -> Result<AnalysisResult> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| RepromptError::MalformedResponse(format!("invalid response envelope: {e}")))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(RepromptError::MalformedResponse(format!(
            "request blocked by Gemini: {reason}"
        )));
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        RepromptError::MalformedResponse("no candidates in Gemini response".into())
    })?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if matches!(
            reason,
            "SAFETY" | "RECITATION" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII"
        ) {
            return Err(RepromptError::MalformedResponse(format!(
                "response blocked by Gemini safety filter: {reason}"
            )));
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(RepromptError::MalformedResponse(
            "no text in Gemini response".into(),
        ));
    }

    extract_prompt(&text)
}

/// Validates the model's JSON text: an object with a string `prompt`.
fn extract_prompt(text: &str) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| RepromptError::MalformedResponse(format!("response is not JSON: {e}")))?;

    match value.get("prompt") {
        Some(Value::String(prompt)) => Ok(AnalysisResult::new(prompt.clone())),
        Some(_) => Err(RepromptError::MalformedResponse(
            "`prompt` is not a string".into(),
        )),
        None => Err(RepromptError::MalformedResponse(
            "missing required field `prompt`".into(),
        )),
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

impl GeminiRequest {
    fn for_image(image: &ImagePayload) -> Self {
        let parts = vec![
            GeminiRequestPart::Text {
                text: INSTRUCTION.to_string(),
            },
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: image.format().mime_type().to_string(),
                    data: image.to_base64(),
                },
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "prompt": {
                "type": "STRING",
                "description": PROMPT_DESCRIPTION,
            }
        },
        "required": ["prompt"],
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
}
