//! Error types for batch verification
//!
//! Only two outcomes ever leave a verification task: a resolved record or a
//! failed record carrying a [`LookupError`]. Retryable conditions are handled
//! inside the verifier and never surface as errors of their own.

use thiserror::Error;

/// Terminal failure detail attached to a `Failed` record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Network error after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Registry returned HTTP {status}")]
    Http { status: u16 },

    #[error("Invalid registry payload: {message}")]
    Payload { message: String },

    #[error("Verification task failed: {message}")]
    Internal { message: String },
}

impl LookupError {
    /// Short human-readable label for display next to a record
    pub fn tag(&self) -> String {
        match self {
            LookupError::Transport { .. } => "Network error".to_string(),
            LookupError::RateLimited { .. } => "Rate limited".to_string(),
            LookupError::Http { status } => format!("HTTP {}", status),
            LookupError::Payload { .. } => "Invalid response".to_string(),
            LookupError::Internal { .. } => "Internal error".to_string(),
        }
    }

    /// Whether the failure came from exhausting the retry budget
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            LookupError::Transport { .. } | LookupError::RateLimited { .. }
        )
    }
}

/// Raw transport failure reported by a registry implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else if error.is_body() || error.is_decode() {
            TransportError::Body(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_workers must be at least 1")]
    ZeroWorkers,

    #[error("max_retries must be at least 1")]
    ZeroRetries,

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Credential storage failures
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential must not be blank")]
    Blank,

    #[error("Failed to access token file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output sink failures (e.g. the client went away)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink closed")]
    Closed,

    #[error("Sink write failed: {0}")]
    Write(String),
}

/// Template rendering failures
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template registration failed for '{name}': {message}")]
    Registration { name: String, message: String },

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_short() {
        assert_eq!(
            LookupError::Transport {
                attempts: 3,
                message: "refused".into()
            }
            .tag(),
            "Network error"
        );
        assert_eq!(LookupError::RateLimited { attempts: 3 }.tag(), "Rate limited");
        assert_eq!(LookupError::Http { status: 404 }.tag(), "HTTP 404");
        assert_eq!(
            LookupError::Payload {
                message: "eof".into()
            }
            .tag(),
            "Invalid response"
        );
    }

    #[test]
    fn test_exhausted_classification() {
        assert!(LookupError::RateLimited { attempts: 3 }.is_exhausted());
        assert!(!LookupError::Http { status: 500 }.is_exhausted());
    }

    #[test]
    fn test_display_includes_context() {
        let err = LookupError::Transport {
            attempts: 2,
            message: "timed out".into(),
        };
        assert!(err.to_string().contains("2 attempts"));
        assert!(err.to_string().contains("timed out"));
    }
}
