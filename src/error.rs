//! Error types for image analysis.

/// Maximum length of an upstream error body carried in an error message.
const MAX_ERROR_BODY_LEN: usize = 300;

/// Errors that can occur while analyzing an image.
#[derive(Debug, thiserror::Error)]
pub enum RepromptError {
    /// No API key is configured.
    #[error("API key is missing")]
    MissingCredential,

    /// No image was selected, or the image is empty.
    #[error("no image selected")]
    MissingImage,

    /// The image is not one of the supported formats (PNG, JPEG, WebP).
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The outbound call failed (transport, timeout, non-success status).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The call succeeded but the body could not be turned into a result.
    #[error("could not parse the analysis result, the response might be malformed: {0}")]
    MalformedResponse(String),

    /// An analysis is already running for this session.
    #[error("an analysis is already in progress")]
    AnalysisInFlight,

    /// I/O error (e.g., reading an image file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RepromptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::RequestFailed("request timed out".into());
        }
        if err.is_connect() {
            return Self::RequestFailed(format!("connection failed: {err}"));
        }
        Self::RequestFailed(err.to_string())
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, RepromptError>;

/// Trims an upstream error body to something safe to show the user.
///
/// Anything that looks like an API key query parameter is redacted and the
/// text is capped at a fixed length on a char boundary.
#[cfg_attr(not(feature = "gemini"), allow(dead_code))]
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let text = text.trim();
    let redacted = match text.find("key=") {
        Some(pos) => {
            let rest = &text[pos + 4..];
            let end = rest
                .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
                .unwrap_or(rest.len());
            format!("{}key=[REDACTED]{}", &text[..pos], &rest[end..])
        }
        None => text.to_string(),
    };

    if redacted.chars().count() <= MAX_ERROR_BODY_LEN {
        return redacted;
    }
    let cut: String = redacted.chars().take(MAX_ERROR_BODY_LEN).collect();
    format!("{cut}...")
}
