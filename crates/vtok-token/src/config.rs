use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vtok_store::{StoreConfig, SyncMode};

use crate::error::{TokenError, TokenResult};

/// Token runtime configuration, usually read from a TOML file.
///
/// Every field is optional in the file; missing fields take the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Directory holding one subdirectory per token.
    pub store_root: PathBuf,
    /// Name of the object log inside a token directory.
    pub store_file_name: String,
    /// Directory of per-user isolate credential files.
    pub isolate_dir: PathBuf,
    /// `fsync` after every store mutation.
    pub sync_every_write: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("tokens"),
            store_file_name: "objects.log".to_string(),
            isolate_dir: PathBuf::from("isolates"),
            sync_every_write: true,
        }
    }
}

impl TokenConfig {
    pub fn from_toml_str(text: &str) -> TokenResult<Self> {
        toml::from_str(text).map_err(|e| TokenError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> TokenResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> TokenResult<String> {
        toml::to_string(self).map_err(|e| TokenError::Config(e.to_string()))
    }

    /// Object log location for the token named `token`.
    pub fn store_path(&self, token: &str) -> PathBuf {
        self.store_root.join(token).join(&self.store_file_name)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            sync_mode: if self.sync_every_write {
                SyncMode::EveryWrite
            } else {
                SyncMode::OsDefault
            },
        }
    }
}
