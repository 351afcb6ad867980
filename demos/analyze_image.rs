//! Reconstructs the prompt of one image.
//!
//! Run with: `cargo run --example analyze_image -- <image.png>`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use reprompt::{GeminiAnalyzer, ImagePayload, PromptAnalyzer};

#[tokio::main]
async fn main() -> reprompt::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("Usage: analyze_image <image>");
    let api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();

    let image = ImagePayload::from_path(&path)?;
    let analyzer = GeminiAnalyzer::builder().build()?;

    let result = analyzer.analyze(&api_key, &image).await?;
    println!("{}", result.prompt);

    Ok(())
}
