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

//! How a command reaches its host.

use crate::domain::config::ToolConf;
use crate::domain::install::validate::validate_word;
use crate::infrastructure::constants::DEFAULT_IP;
use crate::infrastructure::operator::{
    AuthConfig, CommandOperator, LocalOperator, RemoteOperator, SshTarget, TerminalPrompt,
};
use crate::shared::RuntimeContext;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Flags shared by every command that talks to a node.
#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// IP address of the node
    #[arg(long, default_value = DEFAULT_IP)]
    pub ip: String,

    /// Public hostname of the node; used instead of --ip when set
    #[arg(long)]
    pub host: Option<String>,

    /// SSH username
    #[arg(long)]
    pub user: Option<String>,

    /// SSH port
    #[arg(long)]
    pub ssh_port: Option<u16>,

    /// SSH private key file
    #[arg(long, value_name = "PATH")]
    pub ssh_key: Option<String>,

    /// Run remote commands through sudo
    #[arg(long, value_name = "BOOL")]
    pub sudo: Option<bool>,

    /// Run commands on this machine instead of over SSH
    #[arg(long)]
    pub local: bool,
}

/// Connection settings after flags, defaults file and built-ins are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: PathBuf,
    pub sudo: bool,
    pub local: bool,
}

impl ConnectionArgs {
    /// `--host` when given, else `--ip`.
    pub fn host(&self) -> &str {
        self.host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.ip)
    }

    pub fn resolve(&self, conf: &ToolConf, ctx: &RuntimeContext) -> Connection {
        Connection {
            host: self.host().to_string(),
            port: self.ssh_port.unwrap_or(conf.ssh.port),
            user: self.user.clone().unwrap_or_else(|| conf.ssh.user.clone()),
            key_path: ctx.expand_path(self.ssh_key.as_deref().unwrap_or(&conf.ssh.key)),
            sudo: self.sudo.unwrap_or(conf.ssh.sudo),
            local: self.local,
        }
    }
}

impl Connection {
    /// Open the operator for this connection: local, or an authenticated
    /// SSH session.
    pub async fn open(&self, ctx: &RuntimeContext) -> anyhow::Result<Arc<dyn CommandOperator>> {
        if self.local {
            return Ok(Arc::new(LocalOperator::new()));
        }

        validate_word("host", &self.host)?;
        let target = SshTarget::new(self.host.clone(), self.port);
        let auth = AuthConfig {
            user: self.user.clone(),
            key_path: self.key_path.clone(),
            agent_socket: ctx.ssh_auth_sock.clone(),
        };

        let operator = RemoteOperator::connect(&target, &auth, &TerminalPrompt).await?;
        Ok(Arc::new(operator))
    }
}

/// Run `f` with `operator` and close the operator afterwards, on success and
/// on failure. A close failure after `f` already failed is only logged.
pub async fn scoped<T, F, Fut>(operator: Arc<dyn CommandOperator>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(Arc<dyn CommandOperator>) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let outcome = f(Arc::clone(&operator)).await;
    let closed = operator.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(anyhow::Error::new(e)
            .context(format!("Failed to close connection to {}", operator.target()))),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(
                "Failed to close connection to {}: {}",
                operator.target(),
                close_err
            );
            Err(e)
        }
    }
}
