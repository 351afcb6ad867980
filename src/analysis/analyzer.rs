//! Analyzer trait.

use crate::analysis::types::{AnalysisResult, ImagePayload};
use crate::error::Result;
use async_trait::async_trait;

/// Something that can reconstruct the generation prompt of an image.
///
/// Implementations perform at most one outbound call per invocation and never
/// retry. An empty credential must fail with
/// [`RepromptError::MissingCredential`](crate::RepromptError::MissingCredential)
/// before any network activity.
#[async_trait]
pub trait PromptAnalyzer: Send + Sync {
    /// Analyzes one image using the given API key.
    async fn analyze(&self, credential: &str, image: &ImagePayload) -> Result<AnalysisResult>;

    /// Returns the name of this analyzer for display.
    fn name(&self) -> &str;
}
