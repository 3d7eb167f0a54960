// CLI command definitions

use super::k3s::{
    GetConfigCommand, InstallCommand, JoinCommand, NodeTokenCommand, ReadyCommand,
    UninstallCommand, VersionCommand,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "k3sup",
    version,
    about = "Bootstrap k3s clusters over SSH",
    long_about = "Install k3s on a node, join more nodes to it and fetch a kubeconfig that points at the cluster"
)]
pub struct CliArgs {
    /// Defaults file (TOML); falls back to the K3SUP_CONFIG environment variable
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Install k3s on a server and save its kubeconfig
    Install(InstallCommand),

    /// Join a node to an existing server as an agent or server
    Join(JoinCommand),

    /// Fetch the kubeconfig from an existing server
    GetConfig(GetConfigCommand),

    /// Print the join token of an existing server
    NodeToken(NodeTokenCommand),

    /// Remove k3s from a node
    Uninstall(UninstallCommand),

    /// Wait until every node in the cluster is Ready
    Ready(ReadyCommand),

    /// Print version information
    Version(VersionCommand),
}
