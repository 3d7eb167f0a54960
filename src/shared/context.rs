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

//! Process environment captured once at startup.

use crate::infrastructure::constants::CONFIG_ENV;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment and platform facts read once in `main` and passed to
/// whichever command needs them.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub home: Option<PathBuf>,
    pub kubeconfig_env: Option<OsString>,
    pub ssh_auth_sock: Option<PathBuf>,
    pub config_env: Option<PathBuf>,
    pub os: &'static str,
    pub arch: &'static str,
}

impl RuntimeContext {
    pub fn from_env() -> Self {
        Self {
            home: dirs::home_dir(),
            kubeconfig_env: std::env::var_os("KUBECONFIG").filter(|v| !v.is_empty()),
            ssh_auth_sock: std::env::var_os("SSH_AUTH_SOCK")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            config_env: std::env::var_os(CONFIG_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    /// Expand a leading `~` to the home directory.
    pub fn expand_path(&self, path: &str) -> PathBuf {
        match (path.strip_prefix('~'), &self.home) {
            (Some(""), Some(home)) => home.clone(),
            (Some(rest), Some(home)) if rest.starts_with('/') => {
                home.join(rest.trim_start_matches('/'))
            }
            _ => PathBuf::from(path),
        }
    }

    /// First entry of `KUBECONFIG`, else `$HOME/.kube/config`.
    pub fn default_kubeconfig(&self) -> PathBuf {
        self.kubeconfig_env
            .as_ref()
            .and_then(|value| std::env::split_paths(value).find(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| {
                self.home
                    .clone()
                    .unwrap_or_default()
                    .join(".kube")
                    .join("config")
            })
    }

    pub fn platform(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RuntimeContext {
        RuntimeContext {
            home: Some(PathBuf::from("/home/k3s")),
            os: "linux",
            arch: "x86_64",
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_path() {
        let ctx = context();
        assert_eq!(
            ctx.expand_path("~/.ssh/id_rsa"),
            PathBuf::from("/home/k3s/.ssh/id_rsa")
        );
        assert_eq!(ctx.expand_path("~"), PathBuf::from("/home/k3s"));
        assert_eq!(ctx.expand_path("/etc/key"), PathBuf::from("/etc/key"));
        assert_eq!(ctx.expand_path("~other/key"), PathBuf::from("~other/key"));
    }

    #[test]
    fn test_default_kubeconfig_prefers_env() {
        let mut ctx = context();
        assert_eq!(
            ctx.default_kubeconfig(),
            PathBuf::from("/home/k3s/.kube/config")
        );

        ctx.kubeconfig_env = Some(OsString::from("/tmp/a.yaml:/tmp/b.yaml"));
        assert_eq!(ctx.default_kubeconfig(), PathBuf::from("/tmp/a.yaml"));
    }

    #[test]
    fn test_platform() {
        assert_eq!(context().platform(), "linux/x86_64");
    }
}
