pub mod api;

pub use api::{SlackApiClient, DEFAULT_SLACK_API_BASE};

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("missing required env var `{0}`")]
    MissingEnvVar(String),
    #[error("slack api request failed: {0}")]
    ApiRequest(String),
    #[error("slack api `{method}` responded with error `{code}`")]
    ApiResponse { method: String, code: String },
}

impl SlackError {
    pub fn api(method: &str, code: &str) -> Self {
        Self::ApiResponse {
            method: method.to_string(),
            code: code.to_string(),
        }
    }

    /// Remote error code, when the failure came back from the Slack API itself.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::ApiResponse { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}
