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

use super::drain::{drain, mirrors};
use super::{CommandOperator, CommandResult, ExecOptions, ExitReport};
use crate::infrastructure::constants::DEFAULT_SHELL;
use crate::shared::error::{K3supError, Result};
use std::process::Stdio;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::debug;

#[cfg(unix)]
fn exit_report(status: ExitStatus) -> ExitReport {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (_, Some(signo)) => ExitReport::signal(signal_name(signo)),
        (code, None) => ExitReport { code, signal: None },
    }
}

#[cfg(not(unix))]
fn exit_report(status: ExitStatus) -> ExitReport {
    ExitReport {
        code: status.code(),
        signal: None,
    }
}

/// Signal names as they appear in an SSH exit-signal message.
#[cfg(unix)]
fn signal_name(signo: i32) -> String {
    match signo {
        1 => "HUP".to_string(),
        2 => "INT".to_string(),
        3 => "QUIT".to_string(),
        4 => "ILL".to_string(),
        6 => "ABRT".to_string(),
        8 => "FPE".to_string(),
        9 => "KILL".to_string(),
        11 => "SEGV".to_string(),
        13 => "PIPE".to_string(),
        14 => "ALRM".to_string(),
        15 => "TERM".to_string(),
        other => other.to_string(),
    }
}

/// Runs each command line through `sh -c` on this machine.
#[derive(Debug, Clone)]
pub struct LocalOperator {
    shell: String,
}

impl Default for LocalOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalOperator {
    pub fn new() -> Self {
        Self::with_shell(DEFAULT_SHELL)
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait::async_trait]
impl CommandOperator for LocalOperator {
    async fn execute(&self, command: &str, options: ExecOptions) -> Result<CommandResult> {
        let shell = which::which(&self.shell).map_err(|e| K3supError::ShellNotFound {
            shell: self.shell.clone(),
            message: e.to_string(),
        })?;

        debug!("Running locally via {}: {}", shell.display(), command);

        let mut child = Command::new(&shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| K3supError::execution(command, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| K3supError::execution(command, "stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| K3supError::execution(command, "stderr was not captured"))?;

        let (out_mirror, err_mirror) = mirrors(options.stream);

        // All three run to completion so the child is always reaped, even
        // when one of the readers fails.
        let (captured_out, captured_err, status) = tokio::join!(
            drain(stdout, out_mirror),
            drain(stderr, err_mirror),
            child.wait()
        );

        let status = status.map_err(|e| K3supError::execution(command, e))?;
        let stdout = captured_out.map_err(|e| K3supError::execution(command, e))?;
        let stderr = captured_err.map_err(|e| K3supError::execution(command, e))?;

        let exit = exit_report(status);
        debug!(
            "Local command finished: exit={:?} signal={:?} stdout={}B stderr={}B",
            exit.code,
            exit.signal,
            stdout.len(),
            stderr.len()
        );

        Ok(CommandResult::with_exit(stdout, stderr, exit))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn target(&self) -> String {
        "localhost".to_string()
    }
}
