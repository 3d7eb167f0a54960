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

//! SSH credentials: agent identities first, then a private key file.

use crate::shared::error::{K3supError, Result};
use russh::client::{Handle, Handler};
use russh_keys::key::KeyPair;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Who to log in as and which credentials to try.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub user: String,
    pub key_path: PathBuf,
    /// `SSH_AUTH_SOCK`, when an agent is running.
    pub agent_socket: Option<PathBuf>,
}

/// Source of the passphrase for an encrypted private key.
pub trait PassphrasePrompt: Send + Sync {
    fn passphrase(&self, key_path: &Path) -> std::io::Result<String>;
}

/// Asks on the controlling terminal without echo.
pub struct TerminalPrompt;

impl PassphrasePrompt for TerminalPrompt {
    fn passphrase(&self, key_path: &Path) -> std::io::Result<String> {
        rpassword::prompt_password(format!(
            "Enter passphrase for '{}': ",
            key_path.display()
        ))
    }
}

/// Load the private key, prompting only when it is encrypted. A prompt that
/// fails to read is an error, never an empty passphrase.
pub fn load_identity(key_path: &Path, prompt: &dyn PassphrasePrompt) -> Result<KeyPair> {
    match russh_keys::load_secret_key(key_path, None) {
        Ok(key) => Ok(key),
        Err(russh_keys::Error::KeyIsEncrypted) => {
            let passphrase = prompt.passphrase(key_path).map_err(|e| {
                K3supError::authentication(key_path, format!("unable to read passphrase: {}", e))
            })?;
            russh_keys::load_secret_key(key_path, Some(&passphrase)).map_err(|e| {
                K3supError::authentication(
                    key_path,
                    format!("unable to decrypt private key: {}", e),
                )
            })
        }
        Err(e) => Err(K3supError::authentication(
            key_path,
            format!("unable to load private key: {}", e),
        )),
    }
}

/// Try each identity the agent offers. Any agent problem just means this
/// method did not work; the caller falls back to the key file.
#[cfg(unix)]
pub async fn authenticate_with_agent<H: Handler>(
    handle: &mut Handle<H>,
    auth: &AuthConfig,
) -> bool {
    use russh_keys::agent::client::AgentClient;

    let Some(socket) = auth.agent_socket.as_ref() else {
        return false;
    };

    let mut agent = match AgentClient::connect_uds(socket).await {
        Ok(agent) => agent,
        Err(e) => {
            debug!("SSH agent at {} unavailable: {}", socket.display(), e);
            return false;
        }
    };

    let identities = match agent.request_identities().await {
        Ok(identities) => identities,
        Err(e) => {
            debug!("SSH agent refused to list identities: {}", e);
            return false;
        }
    };

    for identity in identities {
        let fingerprint = identity.fingerprint();
        let (returned, outcome) = handle
            .authenticate_future(auth.user.as_str(), identity, agent)
            .await;
        agent = returned;

        match outcome {
            Ok(true) => {
                info!("Authenticated as {} with agent key {}", auth.user, fingerprint);
                return true;
            }
            Ok(false) => debug!("Agent key {} rejected", fingerprint),
            Err(e) => debug!("Agent signing with {} failed: {}", fingerprint, e),
        }
    }

    false
}

#[cfg(not(unix))]
pub async fn authenticate_with_agent<H: Handler>(
    _handle: &mut Handle<H>,
    _auth: &AuthConfig,
) -> bool {
    false
}

/// Public-key login with the file at `auth.key_path`.
pub async fn authenticate_with_key<H: Handler>(
    handle: &mut Handle<H>,
    auth: &AuthConfig,
    prompt: &dyn PassphrasePrompt,
) -> Result<()> {
    let key = load_identity(&auth.key_path, prompt)?;

    match handle
        .authenticate_publickey(auth.user.as_str(), Arc::new(key))
        .await
    {
        Ok(true) => {
            info!(
                "Authenticated as {} with key {}",
                auth.user,
                auth.key_path.display()
            );
            Ok(())
        }
        Ok(false) => Err(K3supError::authentication(
            &auth.key_path,
            format!("server rejected agent and key for user '{}'", auth.user),
        )),
        Err(e) => Err(K3supError::authentication(&auth.key_path, e.to_string())),
    }
}
