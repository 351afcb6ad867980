#![warn(missing_docs)]
//! Reprompt - recover the likely generation prompt behind an AI-generated image.
//!
//! An image is sent to a Gemini vision model together with a fixed instruction
//! and a structured-output schema; the model's JSON answer is validated locally
//! and reduced to a single `prompt` string.
//!
//! # Quick Start
//!
//! ```no_run
//! use reprompt::{GeminiAnalyzer, ImagePayload, PromptAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> reprompt::Result<()> {
//!     let analyzer = GeminiAnalyzer::builder().build()?;
//!     let image = ImagePayload::from_path("render.png")?;
//!     let result = analyzer.analyze("my-api-key", &image).await?;
//!     println!("{}", result.prompt);
//!     Ok(())
//! }
//! ```
//!
//! # Driving a UI
//!
//! [`App`] wires a [`CredentialStore`] and a [`PromptAnalyzer`] to a
//! [`Session`], the upload/analysis state machine a front end renders.
//!
//! # Features
//!
//! - `gemini`: the Gemini analyzer (default)
//! - `cli`: the `reprompt` command-line binary (default)

pub mod analysis;
mod app;
pub mod credential;
mod error;
pub mod session;

pub use analysis::{AnalysisResult, ImageFormat, ImagePayload, PromptAnalyzer};
pub use app::App;
pub use credential::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{RepromptError, Result};
pub use session::{AnalysisTicket, Session, SessionState};

#[cfg(feature = "gemini")]
pub use analysis::{GeminiAnalyzer, GeminiAnalyzerBuilder, GeminiModel};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::analysis::{AnalysisResult, ImagePayload, PromptAnalyzer};
    pub use crate::credential::{CredentialStore, FileCredentialStore};
    pub use crate::error::{RepromptError, Result};
    pub use crate::App;

    #[cfg(feature = "gemini")]
    pub use crate::analysis::GeminiAnalyzer;
}
