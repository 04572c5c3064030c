use thiserror::Error;

/// Sum type representing every possible unexceptional fail state of a call
/// against the WeCom API. Nothing is retried; every variant is terminal for
/// the call that produced it.
#[derive(Debug, Error)]
pub enum WeComError {
    /// The operation name isn't in the registry.
    #[error("Unknown WeCom operation: {0}")]
    UnknownOperation(String),

    /// The request URL couldn't be built from the base URL and operation.
    #[error("Invalid WeCom request URL: {0}")]
    Template(#[from] url::ParseError),

    #[error("Failed to encode WeCom request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("WeCom API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode WeCom API response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The API answered with a non-zero `errcode`.
    #[error("WeCom API returned error: code:{code} error:{message}")]
    Api { code: i64, message: String },
}

impl WeComError {
    /// The remote error code, if the API itself rejected the call.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            WeComError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
