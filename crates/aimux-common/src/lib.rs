mod cooldown;
mod slots;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use cooldown::CooldownPolicy;
pub use slots::{MAX_SLOTS, ProvidersConfig, SlotRecord, slot_env_key};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_STATE_FILE_NAME: &str = "provider_usage.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Final, merged process configuration.
///
/// Merge order: CLI > ENV > config file > defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub data_dir: PathBuf,
    /// Usage state document; defaults to `<data_dir>/provider_usage.json`.
    pub state_file: PathBuf,
    pub request_timeout_secs: u64,
    /// Hard ceiling for a whole failover scan.
    pub deadline_secs: Option<u64>,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    pub cooldown: CooldownPolicy,
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfigPatch {
    pub data_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub deadline_secs: Option<u64>,
    pub proxy: Option<String>,
    pub cooldown: Option<CooldownPolicy>,
}

impl GlobalConfigPatch {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.state_file.is_some() {
            self.state_file = other.state_file;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.deadline_secs.is_some() {
            self.deadline_secs = other.deadline_secs;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.cooldown.is_some() {
            self.cooldown = other.cooldown;
        }
    }

    pub fn into_config(self) -> GlobalConfig {
        let data_dir = self
            .data_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let state_file = self
            .state_file
            .filter(|file| !file.as_os_str().is_empty())
            .unwrap_or_else(|| data_dir.join(DEFAULT_STATE_FILE_NAME));
        GlobalConfig {
            data_dir,
            state_file,
            request_timeout_secs: self
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            deadline_secs: self.deadline_secs.filter(|secs| *secs > 0),
            proxy: self
                .proxy
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty()),
            cooldown: self.cooldown.unwrap_or_default(),
        }
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            data_dir: Some(value.data_dir),
            state_file: Some(value.state_file),
            request_timeout_secs: Some(value.request_timeout_secs),
            deadline_secs: value.deadline_secs,
            proxy: value.proxy,
            cooldown: Some(value.cooldown),
        }
    }
}
