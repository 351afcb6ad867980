//! Image analysis: payload types, the analyzer trait, and the Gemini client.

mod analyzer;
#[cfg(feature = "gemini")]
mod gemini;
mod types;

pub use analyzer::PromptAnalyzer;
#[cfg(feature = "gemini")]
pub use gemini::{
    GeminiAnalyzer, GeminiAnalyzerBuilder, GeminiModel, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};
pub use types::{AnalysisResult, ImageFormat, ImagePayload};
