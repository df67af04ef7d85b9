//! Runtime configuration models.
//!
//! Composed by [`loader::ConfigLoader`] from an optional TOML file, an
//! optional `.env` file and `FRAMEWALL_*` environment overrides. TLS and
//! datasource certificate material arrives as in-memory PEM strings, never
//! as file paths.

pub mod loader;

use std::{fmt, path::PathBuf};

use serde::Deserialize;

pub use framewall_core::bus::SubscriptionConfig;
pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub relay: RelayConfig,
    /// Ordered subscription list; position drives panel layout and port
    /// sharding.
    pub subscriptions: Vec<SubscriptionConfig>,
    pub dashboard: DashboardConfig,
    pub provisioning: Option<ProvisioningConfig>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind host for every shard listener.
    pub host: String,
    /// First shard port; shard `n` listens on `base_port + n`.
    pub base_port: u16,
    /// Fan-out limit per listener. Downstream dashboard clients keep only a
    /// handful of concurrent long-lived connections per origin, so topics
    /// beyond this count spill onto the next port.
    pub streams_per_port: usize,
    /// Development mode: plain HTTP, no scheme upgrade in panel URLs.
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            base_port: 5000,
            streams_per_port: 6,
            dev_mode: true,
        }
    }
}

/// TLS material and response-header policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// In-memory certificate and key; required outside development mode.
    pub tls: Option<TlsMaterial>,
    pub hsts: HstsSettings,
}

/// Server certificate and private key, PEM-encoded, held in memory.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsMaterial {
    pub cert_pem: String,
    pub key_pem: String,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_pem", &format_args!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &format_args!("<redacted>"))
            .finish()
    }
}

/// Strict-Transport-Security directives, applied when serving TLS.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HstsSettings {
    pub max_age: u64,
    pub include_subdomains: bool,
    pub preload: bool,
}

impl Default for HstsSettings {
    fn default() -> Self {
        Self {
            max_age: 31_536_000, // 1 year
            include_subdomains: false,
            preload: false,
        }
    }
}

/// What a stream emits before its topic delivers a first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstFramePolicy {
    /// Emit the synthetic placeholder frame until a real frame arrives.
    #[default]
    Placeholder,
    /// Emit nothing and keep polling until the first frame exists.
    Wait,
}

/// Relay tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Frames buffered per topic before the newest is dropped.
    pub buffer_capacity: usize,
    /// Pacing delay between stream generator iterations.
    pub poll_interval_ms: u64,
    pub first_frame_policy: FirstFramePolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 10,
            poll_interval_ms: 100,
            first_frame_policy: FirstFramePolicy::default(),
        }
    }
}

/// Dashboard template rewriting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Dashboard JSON carrying the template panel; generation is skipped
    /// when unset.
    pub template_path: Option<PathBuf>,
    /// Where the rewritten dashboard is persisted.
    pub output_path: Option<PathBuf>,
    /// Host embedded in generated panel URLs.
    pub public_host: String,
    /// Topic token the template panel's title and URL carry.
    pub template_token: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            output_path: None,
            public_host: "localhost".to_string(),
            template_token: "cam_template".to_string(),
        }
    }
}

/// Datasource and INI provisioning for the external dashboard stack.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisioningConfig {
    pub datasource_template: PathBuf,
    pub datasource_output: PathBuf,
    pub ini_template: PathBuf,
    pub ini_output: PathBuf,
    /// Static assets copied verbatim next to the generated files.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
    #[serde(default)]
    pub assets_output: Option<PathBuf>,
    pub datasource: DatasourceCredentials,
    /// Datasource client TLS material, PEM strings; enables the production
    /// substitutions when present.
    #[serde(default)]
    pub datasource_tls: Option<DatasourceTlsMaterial>,
}

/// Credentials substituted into the datasource template.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasourceCredentials {
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for DatasourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceCredentials")
            .field("user", &self.user)
            .field("password", &format_args!("<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

/// CA, client certificate and key for the production datasource.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasourceTlsMaterial {
    pub ca_pem: String,
    pub cert_pem: String,
    pub key_pem: String,
}

impl fmt::Debug for DatasourceTlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceTlsMaterial")
            .field("ca_pem", &format_args!("<{} bytes>", self.ca_pem.len()))
            .field("cert_pem", &format_args!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &format_args!("<redacted>"))
            .finish()
    }
}

impl Config {
    /// Topic names in subscription order.
    pub fn topics(&self) -> Vec<String> {
        self.subscriptions
            .iter()
            .map(|sub| sub.topic.clone())
            .collect()
    }
}
