// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Runtime configuration for cache location, remote host and key layout.
// Author: Lukas Bower

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path::ShardKeyRule;

/// Environment override for [`HawkConfig::data_dir`].
pub const ENV_DATA_DIR: &str = "HAWK_DATA_DIR";
/// Environment override for [`HawkConfig::lookup_table`].
pub const ENV_LOOKUP_TABLE: &str = "HAWK_LOOKUP_TABLE";

/// Remote host layout used to turn lookup table ids into locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Locator template containing `{id}` and `{private_link}` placeholders.
    pub url_template: String,
    /// Private share link appended to every download.
    pub private_link: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url_template: "https://figshare.com/ndownloader/files/{id}?private_link={private_link}"
                .to_string(),
            private_link: "88e34cc543ff5aeeb9f4".to_string(),
        }
    }
}

/// Dataset configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HawkConfig {
    /// Local cache directory holding the header and every materialized shard.
    pub data_dir: PathBuf,
    /// JSON lookup table mapping shard keys to locators and digests.
    pub lookup_table: PathBuf,
    /// Shard key of the header blob opened as the tree root.
    pub header_key: String,
    /// Remote host layout.
    pub remote: RemoteConfig,
    /// Path segment window used for shard keys.
    pub shard_key: ShardKeyRule,
}

impl Default for HawkConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./hawk_data"),
            lookup_table: PathBuf::from("hawk_lut.json"),
            header_key: "SBW_header".to_string(),
            remote: RemoteConfig::default(),
            shard_key: ShardKeyRule::default(),
        }
    }
}

impl HawkConfig {
    /// Load a TOML config file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_toml_str(&text)?.with_env_overrides())
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse TOML text; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Replace the cache directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Apply `HAWK_DATA_DIR` / `HAWK_LOOKUP_TABLE` when set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(table) = std::env::var(ENV_LOOKUP_TABLE) {
            self.lookup_table = PathBuf::from(table);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = HawkConfig::from_toml_str(
            r#"
            data_dir = "/var/cache/hawk"

            [shard_key]
            offset = 0
            width = 3
            strip_prefix = "SBW"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.data_dir, PathBuf::from("/var/cache/hawk"));
        assert_eq!(cfg.header_key, "SBW_header");
        assert_eq!(cfg.remote, RemoteConfig::default());
        assert_eq!(cfg.shard_key.width, 3);
        assert_eq!(cfg.shard_key.strip_prefix.as_deref(), Some("SBW"));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(HawkConfig::from_toml_str("header_key = 7").is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_file_values() {
        std::env::set_var(ENV_DATA_DIR, "/tmp/hawk-env");
        std::env::remove_var(ENV_LOOKUP_TABLE);
        let cfg = HawkConfig::from_env();
        std::env::remove_var(ENV_DATA_DIR);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/hawk-env"));
        assert_eq!(cfg.lookup_table, PathBuf::from("hawk_lut.json"));
    }
}
