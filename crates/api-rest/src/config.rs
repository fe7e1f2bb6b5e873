//! Server configuration.
//!
//! Resolved once at startup from, in increasing priority:
//! 1. built-in defaults
//! 2. an optional YAML file (`blocks.yaml`, or the file named by `BLOCKS_CONFIG`)
//! 3. `BLOCKS_`-prefixed environment variables, `__` separating nested keys
//!    (e.g. `BLOCKS_HTTP__PORT=9000`, `BLOCKS_STORAGE__TYPE=filesystem`)

use blocks_core::{StorageConfig, StorageKind};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "blocks.yaml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "BLOCKS_CONFIG";

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "BLOCKS_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_upload_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    /// `host:port`, suitable for binding a listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Loads configuration from the default file location and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment contain values of the wrong type, or
    /// if the merged configuration fails [`ServerConfig::validate`].
    pub fn load() -> anyhow::Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME));
        Self::load_from(&file)
    }

    /// Loads configuration using `file` as the YAML layer. A missing file is skipped.
    pub fn load_from(file: &Path) -> anyhow::Result<Self> {
        let config: ServerConfig = Self::figment(file).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http.port == 0 {
            anyhow::bail!("http.port must be non-zero");
        }
        if self.http.max_upload_size == 0 {
            anyhow::bail!("http.max_upload_size must be non-zero");
        }
        if self.storage.kind == StorageKind::Filesystem && self.storage.path.as_os_str().is_empty()
        {
            anyhow::bail!("storage.path is required for the filesystem backend");
        }
        Ok(())
    }
}
