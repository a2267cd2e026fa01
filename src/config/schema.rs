//! Configuration schema for shellkeep
//!
//! Configuration is stored at `~/.config/shellkeep/config.toml`. A project-local
//! `.shellkeep.toml` may override any subset of it.

use crate::error::{ShellkeepError, ShellkeepResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::{Origin, Url};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Worker build settings (namespace, origin, precache manifest)
    pub worker: WorkerConfig,

    /// Network transport settings
    pub network: NetworkConfig,

    /// Cache store settings
    pub store: StoreConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append lifecycle events to the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Configuration of one worker build
///
/// The namespace and manifest are fixed for a build; shipping a new build
/// means bumping `namespace` so activation can drop the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Cache namespace owned by this build
    pub namespace: String,

    /// Origin of the application the worker sits in front of
    pub origin: String,

    /// Path prefix of API calls (never cached)
    pub api_prefix: String,

    /// Document served as the offline shell on static misses
    pub shell_document: String,

    /// Resources that must be available offline after install
    pub precache: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            namespace: "opsiyon-cache-v2".to_string(),
            origin: "http://127.0.0.1:8000".to_string(),
            api_prefix: "/api/".to_string(),
            shell_document: "/".to_string(),
            precache: vec![
                "/".to_string(),
                "/manifest.webmanifest".to_string(),
                "/static/app.js?v=3".to_string(),
                "/static/icons/icon.svg".to_string(),
            ],
        }
    }
}

impl WorkerConfig {
    /// Build a config for `origin` with the given namespace and manifest
    pub fn new(
        namespace: impl Into<String>,
        origin: impl Into<String>,
        precache: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            origin: origin.into(),
            precache: precache.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Check every field, returning the first problem found
    pub fn validate(&self) -> ShellkeepResult<()> {
        validate_namespace(&self.namespace)?;

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ShellkeepError::WorkerConfig(format!(
                "origin must be http or https, got '{}'",
                origin.scheme()
            )));
        }

        if !self.api_prefix.starts_with('/') {
            return Err(ShellkeepError::WorkerConfig(format!(
                "api_prefix must start with '/', got '{}'",
                self.api_prefix
            )));
        }

        self.resolve(&self.shell_document)?;
        self.manifest_urls()?;
        Ok(())
    }

    /// Parsed origin URL
    pub fn origin_url(&self) -> ShellkeepResult<Url> {
        Url::parse(&self.origin).map_err(|e| ShellkeepError::invalid_url(&self.origin, e))
    }

    /// Origin tuple used for same-origin checks
    pub fn origin(&self) -> ShellkeepResult<Origin> {
        Ok(self.origin_url()?.origin())
    }

    /// Resolve a path or absolute URL against the origin, rejecting cross-origin results
    pub fn resolve(&self, resource: &str) -> ShellkeepResult<Url> {
        let base = self.origin_url()?;
        let url = base
            .join(resource)
            .map_err(|e| ShellkeepError::invalid_url(resource, e))?;
        if url.origin() != base.origin() {
            return Err(ShellkeepError::WorkerConfig(format!(
                "'{}' resolves outside the origin {}",
                resource, self.origin
            )));
        }
        Ok(url)
    }

    /// The precache manifest resolved to absolute URLs, in manifest order
    pub fn manifest_urls(&self) -> ShellkeepResult<Vec<Url>> {
        self.precache.iter().map(|r| self.resolve(r)).collect()
    }
}

/// Check that a namespace identifier is usable as a store partition name
pub fn validate_namespace(namespace: &str) -> ShellkeepResult<()> {
    let valid = !namespace.is_empty()
        && !namespace.starts_with('.')
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ShellkeepError::InvalidNamespace(namespace.to_string()))
    }
}

/// Network transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds; unset waits as long as the transport does
    pub timeout_secs: Option<u64>,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Largest response body read from the network, in bytes
    pub max_body_bytes: u64,
}

/// Default response body cap (256 MiB)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: format!("shellkeep/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Cache store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding cache namespaces (defaults to the state directory)
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.worker.validate().unwrap();
        assert_eq!(config.worker.precache.len(), 4);
        assert!(config.network.timeout_secs.is_none());
        assert_eq!(config.network.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn body_limit_is_configurable() {
        let config: Config = toml::from_str("[network]\nmax_body_bytes = 1024\n").unwrap();
        assert_eq!(config.network.max_body_bytes, 1024);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.worker.namespace, "opsiyon-cache-v2");
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn partial_worker_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [worker]
            namespace = "calc-v7"
            "#,
        )
        .unwrap();
        assert_eq!(config.worker.namespace, "calc-v7");
        assert_eq!(config.worker.api_prefix, "/api/");
    }

    #[test]
    fn manifest_resolves_in_order() {
        let worker = WorkerConfig::default();
        let urls = worker.manifest_urls().unwrap();
        assert_eq!(urls[0].as_str(), "http://127.0.0.1:8000/");
        assert_eq!(urls[2].as_str(), "http://127.0.0.1:8000/static/app.js?v=3");
    }

    #[test]
    fn rejects_cross_origin_precache_entry() {
        let worker = WorkerConfig::new(
            "v1",
            "https://app.example",
            ["/", "https://cdn.example/lib.js"],
        );
        assert!(matches!(
            worker.validate(),
            Err(ShellkeepError::WorkerConfig(_))
        ));
    }

    #[test]
    fn rejects_bad_namespace() {
        for bad in ["", "../escape", "has space", ".hidden"] {
            assert!(
                validate_namespace(bad).is_err(),
                "namespace {bad:?} should be rejected"
            );
        }
        validate_namespace("opsiyon-cache-v2").unwrap();
    }

    #[test]
    fn rejects_non_http_origin() {
        let worker = WorkerConfig::new("v1", "file:///srv/app", ["/"]);
        assert!(worker.validate().is_err());
    }

    #[test]
    fn rejects_relative_api_prefix() {
        let mut worker = WorkerConfig::default();
        worker.api_prefix = "api/".to_string();
        assert!(worker.validate().is_err());
    }
}
