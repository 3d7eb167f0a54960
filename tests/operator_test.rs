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
    use k3sup::infrastructure::operator::SessionTransport;
    use k3sup::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    /// Plays back canned output for each command and records what ran.
    struct FakeTransport {
        log: Arc<Mutex<Vec<String>>>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit: ExitReport,
    }

    impl FakeTransport {
        fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                log,
                stdout: Vec::new(),
                stderr: Vec::new(),
                exit: ExitReport::code(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionTransport for FakeTransport {
        async fn exec(
            &mut self,
            command: &str,
            stdout: &mut (dyn AsyncWrite + Send + Unpin),
            stderr: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<ExitReport> {
            self.log.lock().unwrap().push(command.to_string());

            // Interleave the two streams in small pieces, like a channel.
            let mut out = self.stdout.chunks(4096);
            let mut err = self.stderr.chunks(4096);
            loop {
                let (o, e) = (out.next(), err.next());
                if o.is_none() && e.is_none() {
                    break;
                }
                if let Some(chunk) = e {
                    stderr.write_all(chunk).await?;
                }
                if let Some(chunk) = o {
                    stdout.write_all(chunk).await?;
                }
            }
            Ok(self.exit.clone())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("<disconnect>".to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_local_large_output_is_complete() {
        let op = LocalOperator::new();
        let command = "i=0; while [ $i -lt 2000 ]; do \
                       echo \"out line $i padded to make the pipe fill up quickly\"; \
                       echo \"err line $i padded to make the pipe fill up quickly\" >&2; \
                       i=$((i+1)); done";

        for options in [ExecOptions::quiet(), ExecOptions::streaming()] {
            let result = op.execute(command, options).await.unwrap();
            assert_eq!(result.exit_code, Some(0));

            let stdout = result.stdout_lossy();
            let stderr = result.stderr_lossy();
            assert_eq!(stdout.lines().count(), 2000);
            assert_eq!(stderr.lines().count(), 2000);
            assert!(stdout.ends_with("out line 1999 padded to make the pipe fill up quickly\n"));
            assert!(stderr.ends_with("err line 1999 padded to make the pipe fill up quickly\n"));
        }
    }

    #[tokio::test]
    async fn test_local_commands_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("order");
        let op = LocalOperator::new();

        for i in 0..5 {
            let command = format!("echo {} >> '{}'", i, file.display());
            op.execute(&command, ExecOptions::quiet()).await.unwrap();
        }

        let contents = std::fs::read_to_string(&file).unwrap();
        assert_eq!(contents, "0\n1\n2\n3\n4\n");
    }

    #[tokio::test]
    async fn test_local_close_is_idempotent() {
        let op = LocalOperator::new();
        op.close().await.unwrap();
        op.close().await.unwrap();
        assert!(op.execute("true", ExecOptions::quiet()).await.is_ok());
    }

    #[tokio::test]
    async fn test_remote_large_output_is_complete() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut transport = FakeTransport::new(log);
        transport.stdout = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
        transport.stderr = vec![b'e'; 600_000];
        let expected_out = transport.stdout.clone();

        let op = RemoteOperator::new("10.0.0.5:22", transport);
        let result = op
            .execute("cat big", ExecOptions::quiet())
            .await
            .unwrap();

        assert_eq!(result.stdout, expected_out);
        assert_eq!(result.stderr.len(), 600_000);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_remote_non_zero_exit_is_reported_not_raised() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut transport = FakeTransport::new(log);
        transport.stderr = b"cat: /etc/rancher/k3s/k3s.yaml: No such file\n".to_vec();
        transport.exit = ExitReport::code(1);

        let op = RemoteOperator::new("10.0.0.5:22", transport);
        let command = "sudo cat /etc/rancher/k3s/k3s.yaml";
        let result = op.execute(command, ExecOptions::quiet()).await.unwrap();
        assert_eq!(result.exit_code, Some(1));

        let err = result.ensure_success(command).unwrap_err();
        assert!(matches!(err, K3supError::NonZeroExit { code: 1, .. }));
    }

    #[tokio::test]
    async fn test_remote_missing_exit_status() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut transport = FakeTransport::new(log);
        transport.exit = ExitReport::default();

        let op = RemoteOperator::new("10.0.0.5:22", transport);
        let result = op.execute("true", ExecOptions::quiet()).await.unwrap();
        assert_eq!(result.exit_code, None);
        assert_eq!(result.signal, None);
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_remote_exit_signal_is_a_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut transport = FakeTransport::new(log);
        transport.stdout = b"[INFO]  Downloading k3s\n".to_vec();
        transport.exit = ExitReport::signal("KILL");

        let op = RemoteOperator::new("10.0.0.5:22", transport);
        let command = "curl -sfL https://get.k3s.io | sh -";
        let result = op.execute(command, ExecOptions::quiet()).await.unwrap();
        assert_eq!(result.exit_code, None);
        assert_eq!(result.signal.as_deref(), Some("KILL"));
        assert!(!result.success());

        let err = result.ensure_success(command).unwrap_err();
        assert!(matches!(err, K3supError::Signaled { ref signal, .. } if signal == "KILL"));
    }

    #[tokio::test]
    async fn test_remote_commands_in_issue_order_then_closed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let op = RemoteOperator::new("10.0.0.5:22", FakeTransport::new(Arc::clone(&log)));

        op.execute("first", ExecOptions::quiet()).await.unwrap();
        op.execute("second", ExecOptions::quiet()).await.unwrap();
        assert!(!op.is_closed().await);

        op.close().await.unwrap();
        op.close().await.unwrap();
        assert!(op.is_closed().await);

        let err = op.execute("third", ExecOptions::quiet()).await.unwrap_err();
        assert!(matches!(err, K3supError::Closed(_)));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "second", "<disconnect>"]
        );
    }

    #[tokio::test]
    async fn test_operators_behind_one_trait() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut transport = FakeTransport::new(log);
        transport.stdout = b"hello\n".to_vec();

        let operators: Vec<Arc<dyn CommandOperator>> = vec![
            Arc::new(LocalOperator::new()),
            Arc::new(RemoteOperator::new("10.0.0.5:22", transport)),
        ];

        for op in operators {
            let result = op.execute("echo hello", ExecOptions::quiet()).await.unwrap();
            assert_eq!(result.stdout_lossy(), "hello\n");
            op.close().await.unwrap();
        }
    }
}
