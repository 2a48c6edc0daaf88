use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    /// The raw response is kept so the caller can see what the model returned.
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Error::MalformedResponse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    /// Raw model output attached to a malformed-response error.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
