pub use reqwest::StatusCode;

/// The response body could not be decoded into a weather report.
///
/// Displays as the decoder's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// The request never produced a usable response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Weather request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl TransportError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Request(err) => err.status(),
            TransportError::Status { status, .. } => Some(*status),
        }
    }
}
