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

#[cfg(test)]
mod tests {
    use k3sup::domain::kubeconfig::{context_names, parse_kubeconfig};
    use k3sup::*;
    use serde_yaml::Value;
    use std::path::{Path, PathBuf};

    const K3S_YAML: &str = include_str!("fixtures/k3s.yaml");

    fn server_of(doc: &Value) -> &str {
        doc["clusters"][0]["cluster"]["server"].as_str().unwrap()
    }

    #[test]
    fn test_rewrite_fixture_for_remote_host() {
        let out = rewrite(K3S_YAML, "192.168.0.20", "prod");

        assert!(out.contains("server: https://192.168.0.20:6443"));
        assert_eq!(out.matches("prod").count(), 6);
        assert!(!out.contains("default"));

        let config = parse_kubeconfig(out.as_bytes()).unwrap();
        assert_eq!(context_names(&config), vec!["prod"]);
        assert_eq!(config.current_context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_rewrite_preserves_structure() {
        let before: Value = serde_yaml::from_str(K3S_YAML).unwrap();
        let after: Value = serde_yaml::from_str(&rewrite(K3S_YAML, "10.0.0.5", "")).unwrap();

        assert_eq!(server_of(&after), "https://10.0.0.5:6443");

        let mut patched = before.clone();
        patched["clusters"][0]["cluster"]["server"] =
            Value::String("https://10.0.0.5:6443".to_string());
        assert_eq!(patched, after);
    }

    #[test]
    fn test_rewrite_preserves_bytes_outside_tokens() {
        let out = rewrite(K3S_YAML, "10.0.0.5", "lab");
        let expected = K3S_YAML
            .replace("127.0.0.1", "10.0.0.5")
            .replace(": default\n", ": lab\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = rewrite(K3S_YAML, "node.example.com", "edge");
        assert_eq!(rewrite(&once, "node.example.com", "edge"), once);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_is_owner_only_even_over_loose_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("kubeconfig");
        std::fs::write(&target, "old").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();

        let saved = write_kubeconfig(&target, K3S_YAML.as_bytes(), "default").unwrap();

        let mode = std::fs::metadata(&saved.path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(std::fs::read_to_string(&saved.path).unwrap(), K3S_YAML);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_new_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let saved = write_kubeconfig(&dir.path().join("fresh"), b"x", "default").unwrap();

        let mode = std::fs::metadata(&saved.path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(saved.path.is_absolute());
    }

    #[tokio::test]
    async fn test_merge_rejects_malformed_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config");
        std::fs::write(&existing, "{ clusters: [unterminated").unwrap();

        let merger = KubeconfigMerger::with_kubectl("kubectl");
        let err = merger
            .merge(&existing, "prod", K3S_YAML.as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, K3supError::Merge(_)));
        assert_eq!(
            std::fs::read_to_string(&existing).unwrap(),
            "{ clusters: [unterminated"
        );
    }

    /// A stand-in `kubectl` that appends `$KUBECONFIG` to `record` and then
    /// runs `body`.
    #[cfg(unix)]
    fn fake_kubectl(dir: &Path, record: &Path, body: &str) -> PathBuf {
        let source = dir.join("kubectl.sh");
        let kubectl = dir.join("kubectl");
        std::fs::write(
            &source,
            format!(
                "#!/bin/sh\necho \"$KUBECONFIG\" >> '{}'\n{}\n",
                record.display(),
                body
            ),
        )
        .unwrap();
        // Installed by a child process so no writable descriptor to the
        // script leaks into a concurrent fork.
        let status = std::process::Command::new("install")
            .arg("-m")
            .arg("755")
            .arg(&source)
            .arg(&kubectl)
            .status()
            .unwrap();
        assert!(status.success());
        kubectl
    }

    /// The `KUBECONFIG` value of the one recorded run, split on `:`.
    #[cfg(unix)]
    fn recorded_kubeconfig(record: &Path) -> Vec<String> {
        let log = std::fs::read_to_string(record).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 1);
        lines[0].split(':').map(str::to_string).collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_merge_stages_new_file_first_and_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config");
        std::fs::write(&existing, rewrite(K3S_YAML, "10.0.0.1", "staging")).unwrap();
        let record = dir.path().join("kubeconfig.log");
        let kubectl = fake_kubectl(dir.path(), &record, "cat \"${KUBECONFIG%%:*}\"");

        let fresh = rewrite(K3S_YAML, "10.0.0.5", "prod");
        let merged = KubeconfigMerger::with_kubectl(&kubectl)
            .merge(&existing, "prod", fresh.as_bytes())
            .await
            .unwrap();
        assert_eq!(merged, fresh.as_bytes());

        let paths = recorded_kubeconfig(&record);
        assert_eq!(paths.len(), 2);
        let staged = Path::new(&paths[0]);
        assert!(staged
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("k3s-temp-"));
        assert_eq!(Path::new(&paths[1]), existing);
        assert!(!staged.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_merge_removes_staged_file_when_kubectl_fails() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config");
        std::fs::write(&existing, rewrite(K3S_YAML, "10.0.0.1", "staging")).unwrap();
        let record = dir.path().join("kubeconfig.log");
        let kubectl = fake_kubectl(dir.path(), &record, "echo 'cannot merge' >&2\nexit 3");

        let err = KubeconfigMerger::with_kubectl(&kubectl)
            .merge(&existing, "prod", K3S_YAML.as_bytes())
            .await
            .unwrap_err();
        match &err {
            K3supError::Merge(message) => {
                assert!(message.contains("Some(3)"));
                assert!(message.contains("cannot merge"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let paths = recorded_kubeconfig(&record);
        assert_eq!(Path::new(&paths[1]), existing);
        let staged = Path::new(&paths[0]);
        assert!(staged
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("k3s-temp-"));
        assert!(!staged.exists());
    }

    #[tokio::test]
    #[ignore] // Requires kubectl on PATH
    async fn test_merge_unions_and_new_definition_wins() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("config");

        let staging = rewrite(K3S_YAML, "10.0.0.1", "staging");
        let stale_prod = rewrite(K3S_YAML, "10.9.9.9", "prod");
        std::fs::write(&existing, &staging).unwrap();
        let seeded = KubeconfigMerger::new()
            .unwrap()
            .merge(&existing, "prod", stale_prod.as_bytes())
            .await
            .unwrap();
        std::fs::write(&existing, &seeded).unwrap();
        let before = std::fs::read(&existing).unwrap();

        let fresh_prod = rewrite(K3S_YAML, "10.0.0.5", "prod");
        let merged = KubeconfigMerger::new()
            .unwrap()
            .merge(&existing, "prod", fresh_prod.as_bytes())
            .await
            .unwrap();

        let config = parse_kubeconfig(&merged).unwrap();
        let mut names = context_names(&config);
        names.sort();
        assert_eq!(names, vec!["prod", "staging"]);

        let prod = config.clusters.iter().find(|c| c.name == "prod").unwrap();
        let server = prod.cluster.as_ref().and_then(|c| c.server.clone());
        assert_eq!(server.as_deref(), Some("https://10.0.0.5:6443"));

        // Sources are untouched.
        assert_eq!(std::fs::read(&existing).unwrap(), before);

        // No staging file left behind.
        let leftovers = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name().to_string_lossy().starts_with("k3s-temp-")
                    && std::fs::read(e.path()).ok().as_deref() == Some(fresh_prod.as_bytes())
            })
            .count();
        assert_eq!(leftovers, 0);
    }
}
