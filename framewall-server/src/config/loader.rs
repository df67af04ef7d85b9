//! Configuration composition.
//!
//! Precedence, lowest to highest: built-in defaults, the first TOML file
//! found (or an explicit `--config` path), then `FRAMEWALL_*` environment
//! variables. A `.env` file is loaded first when present; a missing one is
//! not an error.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Config, SubscriptionConfig, TlsMaterial};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["framewall.toml", "config/framewall.toml"];

/// A successfully composed configuration plus non-fatal findings.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// One non-fatal configuration finding, logged at startup.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

impl ConfigWarning {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}

/// Fatal configuration failures.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("invalid value in {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Composes [`Config`] from file and environment.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| ()).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(()),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| ()).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(()),
                    _ => Err(err),
                })?;
            }
        }

        let mut warnings = Vec::new();
        let mut config = self.load_file_config()?;
        apply_env_overrides(&mut config, &mut warnings)?;
        validate(&config, &mut warnings);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(&self) -> Result<Config, ConfigLoadError> {
        let path = match &self.options.config_path {
            Some(path) => Some(path.clone()),
            None => DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(Path::new)
                .find(|candidate| candidate.exists())
                .map(Path::to_path_buf),
        };

        let Some(path) = path else {
            return Ok(Config::default());
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
            path,
            source: Box::new(source),
        })
    }
}

fn apply_env_overrides(
    config: &mut Config,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigLoadError> {
    if let Ok(host) = std::env::var("FRAMEWALL_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("FRAMEWALL_PORT") {
        config.server.base_port =
            port.parse().map_err(|_| ConfigLoadError::InvalidEnv {
                key: "FRAMEWALL_PORT",
                reason: format!("{port:?} is not a port number"),
            })?;
    }
    if let Ok(limit) = std::env::var("FRAMEWALL_STREAMS_PER_PORT") {
        config.server.streams_per_port =
            limit.parse().map_err(|_| ConfigLoadError::InvalidEnv {
                key: "FRAMEWALL_STREAMS_PER_PORT",
                reason: format!("{limit:?} is not a count"),
            })?;
    }
    if let Ok(flag) = std::env::var("FRAMEWALL_DEV_MODE") {
        config.server.dev_mode = parse_bool("FRAMEWALL_DEV_MODE", &flag)?;
    }
    if let Ok(host) = std::env::var("FRAMEWALL_PUBLIC_HOST") {
        config.dashboard.public_host = host;
    }
    if let Ok(topics) = std::env::var("FRAMEWALL_TOPICS") {
        config.subscriptions = parse_topics(&topics, warnings)?;
    }

    let cert = std::env::var("FRAMEWALL_TLS_CERT_PEM").ok();
    let key = std::env::var("FRAMEWALL_TLS_KEY_PEM").ok();
    match (cert, key) {
        (Some(cert_pem), Some(key_pem)) => {
            config.security.tls = Some(TlsMaterial { cert_pem, key_pem });
        }
        (None, None) => {}
        _ => warnings.push(ConfigWarning::with_hint(
            "only one of FRAMEWALL_TLS_CERT_PEM / FRAMEWALL_TLS_KEY_PEM is set",
            "both are required to enable TLS; ignoring the partial pair",
        )),
    }

    Ok(())
}

/// `FRAMEWALL_TOPICS` is a comma-separated list of `topic=endpoint` pairs,
/// in display order, e.g. `cam1=127.0.0.1:5568,cam2=127.0.0.1:5569`.
fn parse_topics(
    raw: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<Vec<SubscriptionConfig>, ConfigLoadError> {
    let mut subscriptions = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('=') {
            Some((topic, endpoint)) if !topic.is_empty() && !endpoint.is_empty() => {
                subscriptions.push(SubscriptionConfig {
                    topic: topic.trim().to_string(),
                    endpoint: endpoint.trim().to_string(),
                });
            }
            _ => {
                return Err(ConfigLoadError::InvalidEnv {
                    key: "FRAMEWALL_TOPICS",
                    reason: format!(
                        "expected topic=endpoint pairs, got {entry:?}"
                    ),
                });
            }
        }
    }
    if subscriptions.is_empty() {
        warnings.push(ConfigWarning::new(
            "FRAMEWALL_TOPICS is set but contains no subscriptions",
        ));
    }
    Ok(subscriptions)
}

fn parse_bool(
    key: &'static str,
    raw: &str,
) -> Result<bool, ConfigLoadError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigLoadError::InvalidEnv {
            key,
            reason: format!("{other:?} is not a boolean"),
        }),
    }
}

fn validate(config: &Config, warnings: &mut Vec<ConfigWarning>) {
    if config.subscriptions.is_empty() {
        warnings.push(ConfigWarning::with_hint(
            "no subscriptions configured; the relay will serve no topics",
            "set [[subscriptions]] in framewall.toml or FRAMEWALL_TOPICS",
        ));
    }
    if !config.server.dev_mode && config.security.tls.is_none() {
        warnings.push(ConfigWarning::with_hint(
            "production mode without TLS material",
            "startup will fail unless security.tls is provided",
        ));
    }
    if config.server.streams_per_port == 0 {
        warnings.push(ConfigWarning::new(
            "server.streams_per_port is 0; treating it as 1",
        ));
    }
}
