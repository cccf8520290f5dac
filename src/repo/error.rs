use thiserror::Error;

/// Failures talking to the code host or interpreting what it returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// GitHub answered with an error response.
    #[error("GitHub API error during {context}: {message}")]
    Api { context: String, message: String },

    /// The request never got a usable response.
    #[error("network error during {context}: {message}")]
    Network { context: String, message: String },

    /// The response body did not have the expected shape.
    #[error("malformed payload during {context}: {message}")]
    MalformedPayload { context: String, message: String },

    /// No `owner/repo` could be derived from the pull request URL.
    #[error("cannot derive repository from {url:?}")]
    UnparseableRepository { url: String },
}

impl FetchError {
    pub fn api(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn network(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            context: context.into(),
            message: message.into(),
        }
    }
}
