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

//! Commands over one authenticated SSH connection.
//!
//! A [`RemoteOperator`] is Connected from construction until [`close`] and
//! Closed afterwards. Every call holds the session lock for its whole
//! duration, so commands on one connection never overlap and run in the
//! order they were issued.
//!
//! [`close`]: CommandOperator::close

use super::auth::{authenticate_with_agent, authenticate_with_key, AuthConfig, PassphrasePrompt};
use super::drain::{drain, mirrors};
use super::{CommandOperator, CommandResult, ExecOptions, ExitReport};
use crate::infrastructure::constants::REMOTE_PIPE_CAPACITY;
use crate::shared::error::{K3supError, Result};
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect, Sig};
use russh_keys::key::PublicKey;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Host and port of an SSH server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
}

impl SshTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// One connected session able to run commands. Output goes to the two
/// writers as it arrives; the exit status or exit signal is returned when
/// reported.
#[async_trait::async_trait]
pub trait SessionTransport: Send {
    async fn exec(
        &mut self,
        command: &str,
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<ExitReport>;

    async fn disconnect(&mut self) -> Result<()>;
}

enum SessionState<T> {
    Connected(T),
    Closed,
}

pub struct RemoteOperator<T: SessionTransport = SshSession> {
    address: String,
    state: Mutex<SessionState<T>>,
}

impl<T: SessionTransport> RemoteOperator<T> {
    /// Wrap an already connected transport.
    pub fn new(address: impl Into<String>, transport: T) -> Self {
        Self {
            address: address.into(),
            state: Mutex::new(SessionState::Connected(transport)),
        }
    }

    pub async fn is_closed(&self) -> bool {
        matches!(*self.state.lock().await, SessionState::Closed)
    }
}

impl RemoteOperator<SshSession> {
    /// Open and authenticate an SSH connection.
    pub async fn connect(
        target: &SshTarget,
        auth: &AuthConfig,
        prompt: &dyn PassphrasePrompt,
    ) -> Result<Self> {
        let session = SshSession::connect(target, auth, prompt).await?;
        Ok(Self::new(target.address(), session))
    }
}

#[async_trait::async_trait]
impl<T: SessionTransport> CommandOperator for RemoteOperator<T> {
    async fn execute(&self, command: &str, options: ExecOptions) -> Result<CommandResult> {
        let mut state = self.state.lock().await;
        let transport = match &mut *state {
            SessionState::Connected(transport) => transport,
            SessionState::Closed => return Err(K3supError::Closed(self.address.clone())),
        };

        debug!("Running on {}: {}", self.address, command);

        let (mut out_writer, out_reader) = tokio::io::duplex(REMOTE_PIPE_CAPACITY);
        let (mut err_writer, err_reader) = tokio::io::duplex(REMOTE_PIPE_CAPACITY);
        let (out_mirror, err_mirror) = mirrors(options.stream);

        // The writers are moved in and dropped when the channel is done,
        // which is what ends both readers.
        let pump = async move {
            transport
                .exec(command, &mut out_writer, &mut err_writer)
                .await
        };

        let (exit, captured_out, captured_err) = tokio::join!(
            pump,
            drain(out_reader, out_mirror),
            drain(err_reader, err_mirror)
        );

        let exit = exit?;
        let stdout = captured_out.map_err(|e| K3supError::execution(command, e))?;
        let stderr = captured_err.map_err(|e| K3supError::execution(command, e))?;

        debug!(
            "Remote command finished: exit={:?} signal={:?} stdout={}B stderr={}B",
            exit.code,
            exit.signal,
            stdout.len(),
            stderr.len()
        );

        Ok(CommandResult::with_exit(stdout, stderr, exit))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, SessionState::Closed) {
            SessionState::Connected(mut transport) => {
                info!("Closing connection to {}", self.address);
                transport.disconnect().await
            }
            SessionState::Closed => Ok(()),
        }
    }

    fn target(&self) -> String {
        self.address.clone()
    }
}

/// Accepts every server host key; known_hosts is not consulted.
pub struct AcceptAnyHostKey;

#[async_trait::async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!(
            "Accepting server host key {} without verification",
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}

/// russh-backed transport.
pub struct SshSession {
    handle: Handle<AcceptAnyHostKey>,
}

impl SshSession {
    pub async fn connect(
        target: &SshTarget,
        auth: &AuthConfig,
        prompt: &dyn PassphrasePrompt,
    ) -> Result<Self> {
        let config = Arc::new(client::Config::default());

        info!("Connecting to {} as {}", target.address(), auth.user);
        let mut handle = client::connect(
            config,
            (target.host.as_str(), target.port),
            AcceptAnyHostKey,
        )
        .await
        .map_err(|e| K3supError::connection(target.address(), e))?;

        if !authenticate_with_agent(&mut handle, auth).await {
            authenticate_with_key(&mut handle, auth, prompt).await?;
        }

        Ok(Self { handle })
    }
}

fn sig_name(sig: Sig) -> String {
    match sig {
        Sig::ABRT => "ABRT".to_string(),
        Sig::ALRM => "ALRM".to_string(),
        Sig::FPE => "FPE".to_string(),
        Sig::HUP => "HUP".to_string(),
        Sig::ILL => "ILL".to_string(),
        Sig::INT => "INT".to_string(),
        Sig::KILL => "KILL".to_string(),
        Sig::PIPE => "PIPE".to_string(),
        Sig::QUIT => "QUIT".to_string(),
        Sig::SEGV => "SEGV".to_string(),
        Sig::TERM => "TERM".to_string(),
        Sig::USR1 => "USR1".to_string(),
        Sig::Custom(name) => name,
    }
}

#[async_trait::async_trait]
impl SessionTransport for SshSession {
    async fn exec(
        &mut self,
        command: &str,
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<ExitReport> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| K3supError::execution(command, e))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| K3supError::execution(command, e))?;

        let mut exit = ExitReport::default();
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout
                    .write_all(data)
                    .await
                    .map_err(|e| K3supError::execution(command, e))?,
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr
                    .write_all(data)
                    .await
                    .map_err(|e| K3supError::execution(command, e))?,
                ChannelMsg::ExitStatus { exit_status } => {
                    exit.code = Some(exit_status as i32)
                }
                ChannelMsg::ExitSignal {
                    signal_name,
                    core_dumped,
                    error_message,
                    ..
                } => {
                    debug!(
                        "Remote command killed by {:?} (core dumped: {}): {}",
                        signal_name, core_dumped, error_message
                    );
                    exit.signal = Some(sig_name(signal_name));
                }
                _ => {}
            }
        }

        Ok(exit)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| K3supError::connection("ssh session", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_address() {
        assert_eq!(SshTarget::new("10.0.0.2", 22).address(), "10.0.0.2:22");
        assert_eq!(SshTarget::new("2001:db8::7", 2222).address(), "[2001:db8::7]:2222");
    }

    #[test]
    fn test_sig_name() {
        assert_eq!(sig_name(Sig::KILL), "KILL");
        assert_eq!(sig_name(Sig::Custom("XCPU".to_string())), "XCPU");
    }
}
