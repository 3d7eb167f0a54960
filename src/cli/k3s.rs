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

use super::connection::{scoped, Connection, ConnectionArgs};
use crate::domain::cluster::{wait_for_ready, Readiness};
use crate::domain::config::ToolConf;
use crate::domain::install::{
    get_config_command, install_command, join_command, node_token_command, uninstall_command,
    validate_context_name, InstallOptions, JoinOptions, K3sRelease,
};
use crate::domain::kubeconfig::{rewrite, write_kubeconfig, KubeconfigMerger};
use crate::infrastructure::constants::{
    DEFAULT_DATA_DIR, DEFAULT_IP, READY_ATTEMPTS, READY_PAUSE_SECS,
};
use crate::infrastructure::kubernetes::KubeNodeClient;
use crate::infrastructure::operator::{CommandOperator, ExecOptions};
use crate::shared::RuntimeContext;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Where the fetched kubeconfig goes.
#[derive(clap::Args, Debug, Clone)]
pub struct KubeconfigArgs {
    /// Local path to save the kubeconfig file
    #[arg(long, value_name = "PATH")]
    pub local_path: Option<String>,

    /// Context name to use in the kubeconfig
    #[arg(long)]
    pub context: Option<String>,

    /// Merge into an existing file at --local-path instead of replacing it
    #[arg(long)]
    pub merge: bool,

    /// Print the kubeconfig to stdout after saving it
    #[arg(long)]
    pub print_config: bool,
}

/// k3s release selection flags.
#[derive(clap::Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// k3s version to install, e.g. v1.30.4+k3s1 (overrides --k3s-channel)
    #[arg(long)]
    pub k3s_version: Option<String>,

    /// k3s release channel, e.g. stable or latest
    #[arg(long)]
    pub k3s_channel: Option<String>,
}

impl ReleaseArgs {
    /// Flags first, each layer preferring a pinned version over a channel.
    pub fn resolve(&self, conf: &ToolConf) -> K3sRelease {
        match (&self.k3s_version, &self.k3s_channel) {
            (Some(version), _) => K3sRelease::Version(version.clone()),
            (None, Some(channel)) => K3sRelease::Channel(channel.clone()),
            (None, None) => K3sRelease::resolve(conf.k3s.version.as_deref(), &conf.k3s.channel),
        }
    }
}

/// A kubeconfig fetch with everything resolved.
struct KubeconfigRequest {
    host: String,
    context: String,
    path: PathBuf,
    merge: bool,
    print_config: bool,
    sudo: bool,
}

impl KubeconfigArgs {
    fn request(
        &self,
        host: &str,
        sudo: bool,
        conf: &ToolConf,
        ctx: &RuntimeContext,
    ) -> anyhow::Result<KubeconfigRequest> {
        let context = self
            .context
            .clone()
            .unwrap_or_else(|| conf.kubeconfig.context.clone());
        validate_context_name(&context)?;

        let path = ctx.expand_path(self.local_path.as_deref().unwrap_or(&conf.kubeconfig.path));

        Ok(KubeconfigRequest {
            host: host.to_string(),
            context,
            path,
            merge: self.merge,
            print_config: self.print_config,
            sudo,
        })
    }
}

/// Fetch `k3s.yaml` from the node, point it at the node and save it.
async fn save_kubeconfig(
    operator: &dyn CommandOperator,
    request: &KubeconfigRequest,
) -> anyhow::Result<()> {
    let command = get_config_command(request.sudo);
    let result = operator
        .execute(&command, ExecOptions::quiet())
        .await?
        .ensure_success(&command)?;

    let raw = result.stdout_lossy();
    if raw.trim().is_empty() {
        anyhow::bail!("❌ {} returned an empty kubeconfig", operator.target());
    }

    let rewritten = rewrite(&raw, &request.host, &request.context);

    let data = if request.merge && request.path.exists() {
        info!("Merging into existing kubeconfig {}", request.path.display());
        KubeconfigMerger::new()?
            .merge(&request.path, &request.context, rewritten.as_bytes())
            .await?
    } else {
        rewritten.into_bytes()
    };

    let saved = write_kubeconfig(&request.path, &data, &request.context)?;

    if request.print_config {
        print!("{}", String::from_utf8_lossy(&data));
    } else {
        println!("✓ Saving file to: {}", saved.path.display());
        println!();
        print!("{}", saved.usage_hint());
    }
    Ok(())
}

async fn fetch_node_token(
    operator: &dyn CommandOperator,
    sudo: bool,
    data_dir: &str,
) -> anyhow::Result<String> {
    let command = node_token_command(sudo, data_dir)?;
    let result = operator
        .execute(&command, ExecOptions::quiet())
        .await?
        .ensure_success(&command)?;

    let token = result.stdout_lossy().trim().to_string();
    if token.is_empty() {
        anyhow::bail!("❌ Node token on {} is empty", operator.target());
    }
    Ok(token)
}

// ============================================================================
// install
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct InstallCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub kubeconfig: KubeconfigArgs,

    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Start this server with --cluster-init for embedded etcd
    #[arg(long)]
    pub cluster: bool,

    /// Extra TLS SAN for the API server certificate (defaults to the host)
    #[arg(long)]
    pub tls_san: Option<String>,

    /// External datastore endpoint
    #[arg(long)]
    pub datastore: Option<String>,

    /// Shared secret used to join servers and agents
    #[arg(long)]
    pub token: Option<String>,

    /// Disable the bundled servicelb and traefik
    #[arg(long)]
    pub no_extras: bool,

    /// Extra arguments passed to the k3s installer
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub k3s_extra_args: String,

    /// Only fetch the kubeconfig; do not run the installer
    #[arg(long)]
    pub skip_install: bool,

    /// Print the installer command before running it
    #[arg(long)]
    pub print_command: bool,
}

impl InstallCommand {
    pub async fn execute(&self, ctx: &RuntimeContext, conf: &ToolConf) -> anyhow::Result<()> {
        let conn = self.connection.resolve(conf, ctx);
        let request = self.kubeconfig.request(&conn.host, conn.sudo, conf, ctx)?;

        let command = install_command(&InstallOptions {
            host: conn.host.clone(),
            tls_san: self.tls_san.clone(),
            cluster_init: self.cluster,
            datastore: self.datastore.clone(),
            token: self.token.clone(),
            no_extras: self.no_extras,
            extra_args: self.k3s_extra_args.clone(),
            release: Some(self.release.resolve(conf)),
        })?;

        if self.print_command {
            println!("ssh: {}", command);
        }

        let skip_install = self.skip_install;
        let operator = conn.open(ctx).await?;
        println!("Installing k3s on {}", operator.target());

        scoped(operator, |op| async move {
            if !skip_install {
                op.execute(&command, ExecOptions::streaming())
                    .await?
                    .ensure_success(&command)?;
            }
            save_kubeconfig(op.as_ref(), &request).await
        })
        .await
    }
}

// ============================================================================
// join
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct JoinCommand {
    /// Connection to the node that joins
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub release: ReleaseArgs,

    /// IP address of an existing server
    #[arg(long, default_value = DEFAULT_IP)]
    pub server_ip: String,

    /// Public hostname of the existing server; used instead of --server-ip
    #[arg(long)]
    pub server_host: Option<String>,

    /// SSH username for the server
    #[arg(long)]
    pub server_user: Option<String>,

    /// SSH port for the server
    #[arg(long)]
    pub server_ssh_port: Option<u16>,

    /// k3s data directory on the server
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub server_data_dir: String,

    /// Join token; skips fetching it from the server
    #[arg(long)]
    pub node_token: Option<String>,

    /// Join as an additional server instead of an agent
    #[arg(long)]
    pub server: bool,

    /// Extra arguments passed to the k3s installer
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub k3s_extra_args: String,

    /// Print the join command before running it
    #[arg(long)]
    pub print_command: bool,
}

impl JoinCommand {
    fn server_host(&self) -> &str {
        self.server_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.server_ip)
    }

    fn server_connection(&self, conf: &ToolConf, ctx: &RuntimeContext) -> Connection {
        let node = self.connection.resolve(conf, ctx);
        Connection {
            host: self.server_host().to_string(),
            port: self.server_ssh_port.unwrap_or(conf.ssh.port),
            user: self
                .server_user
                .clone()
                .unwrap_or_else(|| conf.ssh.user.clone()),
            local: false,
            ..node
        }
    }

    pub async fn execute(&self, ctx: &RuntimeContext, conf: &ToolConf) -> anyhow::Result<()> {
        let node = self.connection.resolve(conf, ctx);

        let token = match self.node_token.clone() {
            Some(token) => token,
            None => {
                let server = self.server_connection(conf, ctx);
                let sudo = server.sudo;
                let data_dir = self.server_data_dir.clone();
                let operator = server.open(ctx).await?;
                println!("Fetching join token from {}", operator.target());
                scoped(operator, |op| async move {
                    fetch_node_token(op.as_ref(), sudo, &data_dir).await
                })
                .await?
            }
        };

        let command = join_command(&JoinOptions {
            server_host: self.server_host().to_string(),
            token,
            as_server: self.server,
            extra_args: self.k3s_extra_args.clone(),
            release: Some(self.release.resolve(conf)),
        })?;

        if self.print_command {
            println!("ssh: {}", command);
        }

        let operator = node.open(ctx).await?;
        println!(
            "Joining {} to {} as {}",
            operator.target(),
            self.server_host(),
            if self.server { "server" } else { "agent" }
        );

        scoped(operator, |op| async move {
            op.execute(&command, ExecOptions::streaming())
                .await?
                .ensure_success(&command)?;
            Ok(())
        })
        .await
    }
}

// ============================================================================
// get-config
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct GetConfigCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub kubeconfig: KubeconfigArgs,
}

impl GetConfigCommand {
    pub async fn execute(&self, ctx: &RuntimeContext, conf: &ToolConf) -> anyhow::Result<()> {
        let conn = self.connection.resolve(conf, ctx);
        let request = self.kubeconfig.request(&conn.host, conn.sudo, conf, ctx)?;

        let operator = conn.open(ctx).await?;
        scoped(operator, |op| async move {
            save_kubeconfig(op.as_ref(), &request).await
        })
        .await
    }
}

// ============================================================================
// node-token
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct NodeTokenCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// k3s data directory on the server
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub server_data_dir: String,
}

impl NodeTokenCommand {
    pub async fn execute(&self, ctx: &RuntimeContext, conf: &ToolConf) -> anyhow::Result<()> {
        let conn = self.connection.resolve(conf, ctx);
        let sudo = conn.sudo;
        let data_dir = self.server_data_dir.clone();

        let operator = conn.open(ctx).await?;
        let token = scoped(operator, |op| async move {
            fetch_node_token(op.as_ref(), sudo, &data_dir).await
        })
        .await?;

        println!("{}", token);
        Ok(())
    }
}

// ============================================================================
// uninstall
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct UninstallCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Remove an agent install instead of a server
    #[arg(long)]
    pub agent: bool,
}

impl UninstallCommand {
    pub async fn execute(&self, ctx: &RuntimeContext, conf: &ToolConf) -> anyhow::Result<()> {
        let conn = self.connection.resolve(conf, ctx);
        let command = uninstall_command(conn.sudo, self.agent);

        let operator = conn.open(ctx).await?;
        let target = operator.target();
        scoped(operator, |op| async move {
            op.execute(&command, ExecOptions::streaming())
                .await?
                .ensure_success(&command)?;
            Ok(())
        })
        .await?;

        println!("✓ k3s removed from {}", target);
        Ok(())
    }
}

// ============================================================================
// ready
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct ReadyCommand {
    /// Kubeconfig to use (defaults to KUBECONFIG or ~/.kube/config)
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<String>,

    /// Kubernetes context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Number of attempts before giving up
    #[arg(long, default_value_t = READY_ATTEMPTS)]
    pub attempts: usize,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = READY_PAUSE_SECS)]
    pub pause: u64,

    /// Only report through the exit code
    #[arg(long)]
    pub quiet: bool,
}

impl ReadyCommand {
    pub async fn execute(&self, ctx: &RuntimeContext) -> anyhow::Result<()> {
        use crate::cli::display::TableRenderer;

        let path = match self.kubeconfig.as_deref() {
            Some(path) => ctx.expand_path(path),
            None => ctx.default_kubeconfig(),
        };

        let client = KubeNodeClient::new_with_config(&path, self.context.clone()).await?;
        let outcome =
            wait_for_ready(&client, self.attempts, Duration::from_secs(self.pause)).await?;

        let renderer = TableRenderer::new();
        match outcome {
            Readiness::Ready(nodes) => {
                if !self.quiet {
                    println!("{}", renderer.render_nodes(&nodes));
                    println!("✓ All nodes are ready");
                }
                Ok(())
            }
            Readiness::TimedOut(last_seen) => {
                if let (false, Some(nodes)) = (self.quiet, last_seen.as_ref()) {
                    println!("{}", renderer.render_nodes(nodes));
                }
                anyhow::bail!(
                    "❌ Nodes not ready after {} attempts",
                    self.attempts
                )
            }
        }
    }
}

// ============================================================================
// version
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct VersionCommand {}

impl VersionCommand {
    pub fn execute(&self, ctx: &RuntimeContext) -> anyhow::Result<()> {
        println!("k3sup {}", env!("CARGO_PKG_VERSION"));
        println!("Platform: {}", ctx.platform());
        Ok(())
    }
}
