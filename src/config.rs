//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/docstore/config.toml` (XDG) or platform config dir
//! 2. Project config: `.docstore.toml`
//! 3. Environment variables: `DOCSTORE_*`, nested keys separated by `__`
//!    (e.g. `DOCSTORE_ELASTICSEARCH__USERNAME=elastic`)
//!
//! # Example
//!
//! ```toml
//! [elasticsearch]
//! addresses = ["https://es-1:9200", "https://es-2:9200"]
//! username = "elastic"
//! password = "changeme"
//! ca_cert = """
//! -----BEGIN CERTIFICATE-----
//! ...
//! -----END CERTIFICATE-----
//! """
//! ```
//!
//! Every key has a default, so an empty configuration connects to
//! `http://localhost:9200` without credentials.

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
}

/// Search engine transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ElasticsearchConfig {
    /// Node URLs. A single address uses a single-node pool, several addresses
    /// are load balanced round-robin.
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,
    /// Basic auth username. Only used together with `password`.
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password.
    #[serde(default)]
    pub password: Option<String>,
    /// PEM encoded CA certificate used to validate the cluster.
    #[serde(default)]
    pub ca_cert: Option<String>,
    /// Skip certificate validation entirely. Development only.
    #[serde(default)]
    pub disable_certificate_validation: bool,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Primary shards for indices created by `ensure_index`.
    #[serde(default = "default_shards")]
    pub number_of_shards: u32,
    /// Replica shards for indices created by `ensure_index`.
    #[serde(default = "default_replicas")]
    pub number_of_replicas: u32,
}

fn default_addresses() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    1
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            addresses: default_addresses(),
            username: None,
            password: None,
            ca_cert: None,
            disable_certificate_validation: false,
            request_timeout_ms: default_request_timeout_ms(),
            number_of_shards: default_shards(),
            number_of_replicas: default_replicas(),
        }
    }
}

impl ElasticsearchConfig {
    /// Returns the basic auth pair when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    fn figment() -> Figment {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(".docstore.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("DOCSTORE_").split("__"))
    }

    /// User config path: ~/.config/docstore/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("docstore").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("docstore").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: Config = Figment::new()
            .merge(Toml::string(""))
            .extract()
            .unwrap();

        assert_eq!(config.elasticsearch.addresses, vec!["http://localhost:9200"]);
        assert_eq!(config.elasticsearch.request_timeout_ms, 30_000);
        assert!(config.elasticsearch.credentials().is_none());
    }

    #[test]
    fn test_project_values_override_defaults() {
        let config: Config = Figment::new()
            .merge(Toml::string(
                r#"
                [elasticsearch]
                addresses = ["https://a:9200", "https://b:9200"]
                username = "elastic"
                password = "secret"
                number_of_replicas = 0
                "#,
            ))
            .extract()
            .unwrap();

        let es = &config.elasticsearch;
        assert_eq!(es.addresses.len(), 2);
        assert_eq!(es.credentials(), Some(("elastic", "secret")));
        assert_eq!(es.number_of_replicas, 0);
        assert_eq!(es.number_of_shards, 1);
    }

    #[test]
    fn test_username_without_password_is_ignored() {
        let config = ElasticsearchConfig {
            username: Some("elastic".to_string()),
            ..Default::default()
        };
        assert!(config.credentials().is_none());
    }
}
