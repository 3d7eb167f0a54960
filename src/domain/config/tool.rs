// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defaults file for the command-line flags.
//!
//! Every value here is only a fallback: an explicit flag always wins, and a
//! missing key falls back to the built-in default.

use crate::infrastructure::constants::{
    DEFAULT_CONTEXT, DEFAULT_K3S_CHANNEL, DEFAULT_LOCAL_PATH, DEFAULT_SSH_KEY, DEFAULT_SSH_PORT,
    DEFAULT_SSH_USER,
};
use crate::shared::error::{K3supError, Result};
use crate::shared::RuntimeContext;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Top level
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConf {
    pub ssh: SshConf,
    pub k3s: K3sConf,
    pub kubeconfig: KubeconfigConf,
}

impl ToolConf {
    /// Load configuration from a TOML file.
    pub fn from<T: AsRef<Path>>(path: T) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|e| {
            K3supError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let conf: Self = toml::from_str(&content)?;
        Ok(conf)
    }

    /// `--config` if given, else `K3SUP_CONFIG`, else built-in defaults.
    pub fn load(explicit: Option<&Path>, ctx: &RuntimeContext) -> Result<Self> {
        let path: Option<PathBuf> = explicit
            .map(|p| ctx.expand_path(&p.to_string_lossy()))
            .or_else(|| {
                ctx.config_env
                    .as_ref()
                    .map(|p| ctx.expand_path(&p.to_string_lossy()))
            });

        match path {
            Some(path) => {
                debug!("Loading defaults from {}", path.display());
                Self::from(path)
            }
            None => Ok(Self::default()),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshConf {
    pub user: String,
    pub port: u16,
    pub key: String,
    pub sudo: bool,
}

impl Default for SshConf {
    fn default() -> Self {
        Self {
            user: DEFAULT_SSH_USER.to_string(),
            port: DEFAULT_SSH_PORT,
            key: DEFAULT_SSH_KEY.to_string(),
            sudo: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct K3sConf {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Default for K3sConf {
    fn default() -> Self {
        Self {
            channel: DEFAULT_K3S_CHANNEL.to_string(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubeconfigConf {
    pub path: String,
    pub context: String,
}

impl Default for KubeconfigConf {
    fn default() -> Self {
        Self {
            path: DEFAULT_LOCAL_PATH.to_string(),
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}
