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

use clap::Parser;
use k3sup::cli::{commands::Commands, CliArgs};
use k3sup::{RuntimeContext, ToolConf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays usable for tokens and kubeconfigs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let ctx = RuntimeContext::from_env();
    let conf = ToolConf::load(args.config.as_deref(), &ctx)?;

    match args.command {
        Commands::Install(cmd) => cmd.execute(&ctx, &conf).await,
        Commands::Join(cmd) => cmd.execute(&ctx, &conf).await,
        Commands::GetConfig(cmd) => cmd.execute(&ctx, &conf).await,
        Commands::NodeToken(cmd) => cmd.execute(&ctx, &conf).await,
        Commands::Uninstall(cmd) => cmd.execute(&ctx, &conf).await,
        Commands::Ready(cmd) => cmd.execute(&ctx).await,
        Commands::Version(cmd) => cmd.execute(&ctx),
    }
}
