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

/// Install script sources
pub const INSTALL_SCRIPT: &str = "curl -sfL https://get.k3s.io";
pub const JOIN_SCRIPT: &str = "curl -sfL https://get.k3s.io/";

/// k3s paths on the target host
pub const K3S_KUBECONFIG_PATH: &str = "/etc/rancher/k3s/k3s.yaml";
pub const DEFAULT_DATA_DIR: &str = "/var/lib/rancher/k3s";
pub const NODE_TOKEN_SUFFIX: &str = "server/node-token";
pub const UNINSTALL_SCRIPT: &str = "/usr/local/bin/k3s-uninstall.sh";
pub const AGENT_UNINSTALL_SCRIPT: &str = "/usr/local/bin/k3s-agent-uninstall.sh";

/// Kubernetes API server port
pub const API_SERVER_PORT: u16 = 6443;

/// Context name k3s writes into its kubeconfig
pub const DEFAULT_CONTEXT: &str = "default";

/// Connection defaults
pub const DEFAULT_IP: &str = "127.0.0.1";
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_KEY: &str = "~/.ssh/id_rsa";
pub const DEFAULT_SHELL: &str = "sh";

/// Release defaults
pub const DEFAULT_K3S_CHANNEL: &str = "stable";

/// Local kubeconfig defaults
pub const DEFAULT_LOCAL_PATH: &str = "kubeconfig";
pub const KUBECONFIG_FILE_MODE: u32 = 0o600;
pub const MERGE_STAGING_PREFIX: &str = "k3s-temp-";
pub const KUBECTL_BINARY: &str = "kubectl";

/// Output pipe sizing
pub const DRAIN_CHUNK_SIZE: usize = 8 * 1024;
pub const REMOTE_PIPE_CAPACITY: usize = 64 * 1024;

/// Readiness polling
pub const READY_ATTEMPTS: usize = 25;
pub const READY_PAUSE_SECS: u64 = 2;

/// Defaults file
pub const CONFIG_ENV: &str = "K3SUP_CONFIG";
