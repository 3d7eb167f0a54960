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

//! Command execution, locally or over SSH.
//!
//! Every command in the tool talks to a host through [`CommandOperator`].
//! The operator is picked once from `--local` and passed down; callers never
//! branch on where a command runs.

pub mod auth;
pub mod drain;
pub mod local;
pub mod remote;

pub use self::auth::{AuthConfig, PassphrasePrompt, TerminalPrompt};
pub use self::local::LocalOperator;
pub use self::remote::{RemoteOperator, SessionTransport, SshSession, SshTarget};

use crate::shared::error::{K3supError, Result};

/// Output of one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the command was killed by a signal, or when a remote
    /// channel closed with neither an exit status nor an exit signal.
    pub exit_code: Option<i32>,
    /// Name of the signal that terminated the command, e.g. `KILL`.
    pub signal: Option<String>,
}

/// How a command ended, as reported by the process or the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<String>,
}

impl ExitReport {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signal(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }
}

impl CommandResult {
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            signal: None,
        }
    }

    pub fn with_exit(stdout: Vec<u8>, stderr: Vec<u8>, exit: ExitReport) -> Self {
        Self {
            stdout,
            stderr,
            exit_code: exit.code,
            signal: exit.signal,
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.signal.is_none() && matches!(self.exit_code, Some(0) | None)
    }

    /// Turn a non-zero exit into [`K3supError::NonZeroExit`] and death by
    /// signal into [`K3supError::Signaled`]. The operator itself never does
    /// this; callers decide which exits are fatal.
    pub fn ensure_success(self, command: &str) -> Result<Self> {
        if let Some(signal) = &self.signal {
            return Err(K3supError::Signaled {
                command: command.to_string(),
                signal: signal.clone(),
                stderr: self.stderr_lossy().trim().to_string(),
            });
        }
        match self.exit_code {
            Some(code) if code != 0 => Err(K3supError::NonZeroExit {
                command: command.to_string(),
                code,
                stderr: self.stderr_lossy().trim().to_string(),
            }),
            _ => Ok(self),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Mirror output to our own stdout/stderr while capturing it.
    pub stream: bool,
}

impl ExecOptions {
    pub fn quiet() -> Self {
        Self { stream: false }
    }

    pub fn streaming() -> Self {
        Self { stream: true }
    }
}

#[async_trait::async_trait]
pub trait CommandOperator: Send + Sync {
    /// Run one command line and wait until it has exited and both output
    /// streams are drained.
    async fn execute(&self, command: &str, options: ExecOptions) -> Result<CommandResult>;

    /// Release whatever the operator holds. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Where commands run, for messages.
    fn target(&self) -> String;
}
