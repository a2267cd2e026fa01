//! Error types for shellkeep
//!
//! All modules use `ShellkeepResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellkeep operations
pub type ShellkeepResult<T> = Result<T, ShellkeepError>;

/// All errors that can occur in shellkeep
#[derive(Error, Debug)]
pub enum ShellkeepError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid worker configuration: {0}")]
    WorkerConfig(String),

    // Request model errors
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Invalid cache namespace '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidNamespace(String),

    // Network errors
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Network request timed out after {secs}s: {url}")]
    NetworkTimeout { url: String, secs: u64 },

    #[error("Response body of {url} exceeds {limit} bytes")]
    ResponseTooLarge { url: String, limit: u64 },

    // Install errors
    #[error("Precache failed for {resource}: {reason}")]
    InstallFailed { resource: String, reason: String },

    #[error("Precache failed for {resource}: server answered {status}")]
    PrecacheStatus { resource: String, status: u16 },

    // Lifecycle errors
    #[error("Cannot {action} a worker in state {state}")]
    InvalidState { action: &'static str, state: String },

    #[error("Namespace {0} is not fully installed")]
    NotInstalled(String),

    // Store errors
    #[error("Cache store error: {0}")]
    Store(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShellkeepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error means no network was available for the request
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Network(_) | Self::NetworkTimeout { .. })
    }

    /// Whether the error aborted an install attempt
    pub fn is_install_failure(&self) -> bool {
        matches!(
            self,
            Self::InstallFailed { .. } | Self::PrecacheStatus { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Run: shellkeep config show"),
            Self::InvalidNamespace(_) => Some("Set worker.namespace to something like app-cache-v3"),
            Self::InstallFailed { .. } | Self::PrecacheStatus { .. } => {
                Some("Check that every worker.precache entry is served by the origin")
            }
            Self::NotInstalled(_) => Some("Run: shellkeep install"),
            Self::ResponseTooLarge { .. } => Some("Raise network.max_body_bytes"),
            Self::Network(_) | Self::NetworkTimeout { .. } => {
                Some("Retry with --offline to see what the cache can serve")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ShellkeepError::PrecacheStatus {
            resource: "/static/icons/icon.svg".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "Precache failed for /static/icons/icon.svg: server answered 404"
        );
    }

    #[test]
    fn error_hint() {
        let err = ShellkeepError::ConfigInvalid {
            path: PathBuf::from("/etc/shellkeep.toml"),
            reason: "bad".to_string(),
        };
        assert_eq!(err.hint(), Some("Run: shellkeep config show"));
        assert_eq!(ShellkeepError::Internal("x".to_string()).hint(), None);
    }

    #[test]
    fn offline_classification() {
        assert!(ShellkeepError::Network("dns".to_string()).is_offline());
        assert!(ShellkeepError::NetworkTimeout {
            url: "http://a/".to_string(),
            secs: 3
        }
        .is_offline());
        assert!(!ShellkeepError::Store("disk full".to_string()).is_offline());
        assert!(!ShellkeepError::ResponseTooLarge {
            url: "http://a/big".to_string(),
            limit: 10
        }
        .is_offline());
    }

    #[test]
    fn install_failure_classification() {
        assert!(ShellkeepError::InstallFailed {
            resource: "/".to_string(),
            reason: "offline".to_string()
        }
        .is_install_failure());
        assert!(!ShellkeepError::Network("x".to_string()).is_install_failure());
    }
}
