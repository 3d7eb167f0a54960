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

//! Fold a freshly fetched kubeconfig into an existing one with
//! `kubectl config view --merge --flatten`.

use crate::domain::install::shell_quote;
use crate::infrastructure::constants::{KUBECTL_BINARY, MERGE_STAGING_PREFIX};
use crate::infrastructure::operator::{CommandOperator, ExecOptions, LocalOperator};
use crate::shared::error::{K3supError, Result};
use kube::config::Kubeconfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parse `data` as a kubeconfig document.
pub fn parse_kubeconfig(data: &[u8]) -> std::result::Result<Kubeconfig, serde_yaml::Error> {
    serde_yaml::from_slice(data)
}

/// Context names defined in `config`.
pub fn context_names(config: &Kubeconfig) -> Vec<&str> {
    config.contexts.iter().map(|c| c.name.as_str()).collect()
}

/// Runs the merge. `kubectl` is looked up once, at construction.
#[derive(Debug, Clone)]
pub struct KubeconfigMerger {
    kubectl: PathBuf,
}

impl KubeconfigMerger {
    pub fn new() -> Result<Self> {
        let kubectl = which::which(KUBECTL_BINARY).map_err(|e| {
            K3supError::merge(format!("unable to locate {}: {}", KUBECTL_BINARY, e))
        })?;
        Ok(Self::with_kubectl(kubectl))
    }

    pub fn with_kubectl(kubectl: impl Into<PathBuf>) -> Self {
        Self {
            kubectl: kubectl.into(),
        }
    }

    /// Merge `new_kubeconfig` into the file at `existing`, returning the
    /// flattened result. Neither source is modified. Definitions in
    /// `new_kubeconfig` win on name collisions.
    pub async fn merge(
        &self,
        existing: &Path,
        context: &str,
        new_kubeconfig: &[u8],
    ) -> Result<Vec<u8>> {
        let current = std::fs::read(existing)?;
        parse_kubeconfig(&current).map_err(|e| {
            K3supError::merge(format!(
                "existing kubeconfig {} is not valid: {}",
                existing.display(),
                e
            ))
        })?;

        // Removed when dropped, whichever way this function returns.
        let mut staged = tempfile::Builder::new()
            .prefix(MERGE_STAGING_PREFIX)
            .tempfile()?;
        staged.write_all(new_kubeconfig)?;
        staged.flush()?;

        // kubectl keeps the first definition it sees for each name, so the
        // new file goes first.
        let command = format!(
            "KUBECONFIG={}:{} {} config view --merge --flatten",
            shell_quote(&staged.path().to_string_lossy()),
            shell_quote(&existing.to_string_lossy()),
            shell_quote(&self.kubectl.to_string_lossy()),
        );
        debug!("Merging kubeconfig via: {}", command);

        let result = LocalOperator::new()
            .execute(&command, ExecOptions::quiet())
            .await
            .map_err(|e| K3supError::merge(format!("unable to run {}: {}", KUBECTL_BINARY, e)))?;

        if !result.success() {
            let outcome = match &result.signal {
                Some(signal) => format!("was killed by signal {}", signal),
                None => format!("exited with {:?}", result.exit_code),
            };
            return Err(K3supError::merge(format!(
                "{} {}: {}",
                KUBECTL_BINARY,
                outcome,
                result.stderr_lossy().trim()
            )));
        }

        let merged = parse_kubeconfig(&result.stdout)
            .map_err(|e| K3supError::merge(format!("merged kubeconfig is not valid: {}", e)))?;
        if !context_names(&merged).contains(&context) {
            return Err(K3supError::merge(format!(
                "merged kubeconfig has no context '{}'",
                context
            )));
        }

        info!(
            "Merged context '{}' into {}",
            context,
            existing.display()
        );
        Ok(result.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_names() {
        let config = parse_kubeconfig(
            b"apiVersion: v1\nkind: Config\nclusters: []\nusers: []\ncontexts:\n- name: a\n  context:\n    cluster: a\n    user: a\n- name: b\n  context:\n    cluster: b\n    user: b\n",
        )
        .unwrap();
        assert_eq!(context_names(&config), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_existing_file_is_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config");
        std::fs::write(&existing, "clusters: [this is : not: valid").unwrap();

        let merger = KubeconfigMerger::with_kubectl("/nonexistent/kubectl");
        let err = merger
            .merge(&existing, "prod", b"apiVersion: v1\nkind: Config\n")
            .await
            .unwrap_err();
        assert!(matches!(err, K3supError::Merge(_)));
    }

    #[tokio::test]
    async fn test_failing_kubectl_is_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config");
        std::fs::write(&existing, "apiVersion: v1\nkind: Config\n").unwrap();

        let merger = KubeconfigMerger::with_kubectl("/nonexistent/kubectl");
        let err = merger
            .merge(&existing, "prod", b"apiVersion: v1\nkind: Config\n")
            .await
            .unwrap_err();
        assert!(matches!(err, K3supError::Merge(_)));
    }
}
