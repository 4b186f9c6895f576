use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesignError>;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("No image provided")]
    MissingImage,
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("{0}")]
    Service(ServiceFailure),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    InvalidCredentials,
    InvalidRequest,
    Unknown,
}

/// A failure reported by the external image service, classified from its
/// human-readable failure text.
#[derive(Debug)]
pub struct ServiceFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl std::fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ServiceFailure {}

const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded or insufficient credits. \
    Please check your OpenAI account billing status and try again later.";
const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid API key. Please check your OpenAI API key configuration.";
const INVALID_REQUEST_MESSAGE: &str =
    "Invalid request. Please try again with different parameters.";

// Ordered: the first rule whose substring appears in the failure text wins.
const CLASSIFICATION_RULES: &[(&str, FailureKind, &str)] = &[
    ("rate_limit", FailureKind::RateLimited, RATE_LIMITED_MESSAGE),
    (
        "invalid_api_key",
        FailureKind::InvalidCredentials,
        INVALID_CREDENTIALS_MESSAGE,
    ),
    (
        "invalid_request_error",
        FailureKind::InvalidRequest,
        INVALID_REQUEST_MESSAGE,
    ),
];

impl ServiceFailure {
    pub fn classify(detail: &str) -> Self {
        let lowered = detail.to_lowercase();
        let kind = CLASSIFICATION_RULES
            .iter()
            .find(|(needle, _, _)| lowered.contains(needle))
            .map(|(_, kind, _)| *kind)
            .unwrap_or(FailureKind::Unknown);
        Self {
            kind,
            detail: detail.to_string(),
        }
    }

    /// Fixed user-facing message per class; unclassified failures surface the
    /// raw service text.
    pub fn message(&self) -> &str {
        CLASSIFICATION_RULES
            .iter()
            .find(|(_, kind, _)| *kind == self.kind)
            .map(|(_, _, message)| *message)
            .unwrap_or(&self.detail)
    }
}

impl DesignError {
    pub fn user_message(&self) -> String {
        match self {
            DesignError::Service(failure) => format!("API Error: {}", failure.message()),
            other => other.to_string(),
        }
    }
}
