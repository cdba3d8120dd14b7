//! Error taxonomy for a single generation request

use thiserror::Error;

/// Shown when the backend cannot be reached or returns something unreadable
pub const SERVER_ERROR_MESSAGE: &str = "⚠️ Server error — check your backend.";

/// Stands in for a successful response that carried no reply
pub const NO_RESPONSE_MESSAGE: &str = "⚠️ No response received.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Transport failure or an undecodable response body
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status
    #[error("Error {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response without a usable `reply`
    #[error("no reply in response")]
    EmptyReply,
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        GenerateError::Network(err.to_string())
    }
}

impl GenerateError {
    /// Text that replaces the pending reply in the transcript
    pub fn transcript_text(&self) -> String {
        match self {
            GenerateError::Status { .. } => format!("⚠️ {}", self),
            GenerateError::Network(_) => SERVER_ERROR_MESSAGE.to_string(),
            GenerateError::EmptyReply => NO_RESPONSE_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_carries_code_and_body() {
        let err = GenerateError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.transcript_text(), "⚠️ Error 500: boom");
    }

    #[test]
    fn test_network_text_is_generic() {
        let err = GenerateError::Network("connection refused".to_string());
        assert_eq!(err.transcript_text(), SERVER_ERROR_MESSAGE);
    }
}
