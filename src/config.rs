//! Runtime settings for the taxonomy core.
//!
//! Applications load [`TaxonomyConfig`] from `config/config.toml` (section
//! `[taxonomy]`) or `REPERTOIRE__TAXONOMY__*` environment variables using
//! `TaxonomyConfig::load()`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::tree::TreeLimits;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "REPERTOIRE";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TaxonomyConfig {
    /// Deepest nesting any traversal will follow
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Shortest accepted search term
    #[serde(default = "default_search_min_chars")]
    pub search_min_chars: usize,
    /// Grid window size used when a request has no `endRow`
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

fn default_max_depth() -> usize {
    64
}

fn default_search_min_chars() -> usize {
    2
}

fn default_page_size() -> usize {
    100
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            search_min_chars: default_search_min_chars(),
            default_page_size: default_page_size(),
        }
    }
}

impl TaxonomyConfig {
    /// Load the taxonomy configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An existing but unreadable file is worth a warning; retry with env only
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!(
                        "Failed to load {}, falling back to env. Error: {}",
                        CONFIG_FILE,
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Extract the `taxonomy` section, defaulting every missing key
    pub fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<TaxonomyConfig>("taxonomy") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Taxonomy configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }

    pub fn limits(&self) -> TreeLimits {
        TreeLimits {
            max_depth: self.max_depth,
        }
    }
}
