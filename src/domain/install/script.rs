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

//! Command lines sent to the target host, one builder per command kind.
//!
//! Every builder validates the values it splices in before formatting, so a
//! returned string is always safe to hand to `sh -c`.

use super::validate::{
    validate_data_dir, validate_extra_args, validate_quoted_word, validate_unquoted_args,
    validate_word,
};
use crate::infrastructure::constants::{
    AGENT_UNINSTALL_SCRIPT, API_SERVER_PORT, INSTALL_SCRIPT, JOIN_SCRIPT, K3S_KUBECONFIG_PATH,
    NODE_TOKEN_SUFFIX, UNINSTALL_SCRIPT,
};
use crate::shared::error::Result;

const NO_EXTRAS_FLAGS: &str = "--disable servicelb --disable traefik";

/// Which k3s build the install script should fetch. A pinned version wins
/// over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum K3sRelease {
    Version(String),
    Channel(String),
}

impl K3sRelease {
    pub fn resolve(version: Option<&str>, channel: &str) -> Self {
        match version.filter(|v| !v.is_empty()) {
            Some(v) => K3sRelease::Version(v.to_string()),
            None => K3sRelease::Channel(channel.to_string()),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            K3sRelease::Version(v) => validate_word("k3s version", v),
            K3sRelease::Channel(c) => validate_word("k3s channel", c),
        }
    }

    fn env(&self) -> String {
        match self {
            K3sRelease::Version(v) => format!("INSTALL_K3S_VERSION='{}'", v),
            K3sRelease::Channel(c) => format!("INSTALL_K3S_CHANNEL='{}'", c),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub host: String,
    pub tls_san: Option<String>,
    pub cluster_init: bool,
    pub datastore: Option<String>,
    pub token: Option<String>,
    pub no_extras: bool,
    pub extra_args: String,
    pub release: Option<K3sRelease>,
}

#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub server_host: String,
    pub token: String,
    pub as_server: bool,
    pub extra_args: String,
    pub release: Option<K3sRelease>,
}

fn release_env(release: &Option<K3sRelease>) -> Result<Option<String>> {
    match release {
        Some(r) => {
            r.validate()?;
            Ok(Some(r.env()))
        }
        None => Ok(None),
    }
}

fn server_url(host: &str) -> String {
    if host.contains(':') {
        format!("https://[{}]:{}", host, API_SERVER_PORT)
    } else {
        format!("https://{}:{}", host, API_SERVER_PORT)
    }
}

fn sudo_prefix(sudo: bool) -> &'static str {
    if sudo {
        "sudo "
    } else {
        ""
    }
}

pub fn install_command(opts: &InstallOptions) -> Result<String> {
    validate_word("host", &opts.host)?;
    validate_extra_args(&opts.extra_args)?;

    let mut exec = vec!["server".to_string()];
    if opts.cluster_init {
        exec.push("--cluster-init".to_string());
    }

    let san = opts.tls_san.as_deref().unwrap_or(&opts.host);
    validate_word("tls san", san)?;
    exec.push(format!("--tls-san {}", san));

    if let Some(datastore) = opts.datastore.as_deref() {
        validate_quoted_word("datastore", datastore)?;
        exec.push(format!("--datastore-endpoint {}", datastore));
    }
    if let Some(token) = opts.token.as_deref() {
        validate_word("token", token)?;
        exec.push(format!("--token {}", token));
    }
    if opts.no_extras {
        exec.push(NO_EXTRAS_FLAGS.to_string());
    }
    let extra = opts.extra_args.trim();
    if !extra.is_empty() {
        exec.push(extra.to_string());
    }

    let mut parts = vec![
        INSTALL_SCRIPT.to_string(),
        "|".to_string(),
        format!("INSTALL_K3S_EXEC='{}'", exec.join(" ")),
    ];
    if let Some(env) = release_env(&opts.release)? {
        parts.push(env);
    }
    parts.push("sh -".to_string());

    Ok(parts.join(" "))
}

pub fn join_command(opts: &JoinOptions) -> Result<String> {
    validate_word("server host", &opts.server_host)?;
    validate_word("token", &opts.token)?;
    validate_unquoted_args(&opts.extra_args)?;

    let url = server_url(&opts.server_host);
    let mut parts = vec![JOIN_SCRIPT.to_string(), "|".to_string()];
    if opts.as_server {
        parts.push(format!("INSTALL_K3S_EXEC='server --server {}'", url));
    } else {
        parts.push(format!("K3S_URL='{}'", url));
    }
    parts.push(format!("K3S_TOKEN='{}'", opts.token));
    if let Some(env) = release_env(&opts.release)? {
        parts.push(env);
    }
    parts.push("sh -s -".to_string());

    let extra = opts.extra_args.trim();
    if !extra.is_empty() {
        parts.push(extra.to_string());
    }

    Ok(parts.join(" "))
}

pub fn get_config_command(sudo: bool) -> String {
    format!("{}cat {}", sudo_prefix(sudo), K3S_KUBECONFIG_PATH)
}

pub fn node_token_command(sudo: bool, data_dir: &str) -> Result<String> {
    validate_data_dir(data_dir)?;
    Ok(format!(
        "{}cat {}/{}",
        sudo_prefix(sudo),
        data_dir.trim_end_matches('/'),
        NODE_TOKEN_SUFFIX
    ))
}

pub fn uninstall_command(sudo: bool, agent: bool) -> String {
    let script = if agent {
        AGENT_UNINSTALL_SCRIPT
    } else {
        UNINSTALL_SCRIPT
    };
    format!("{}{}", sudo_prefix(sudo), script)
}
