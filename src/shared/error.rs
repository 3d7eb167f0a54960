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

use std::path::Path;
use thiserror::Error;
pub type Result<T> = std::result::Result<T, K3supError>;

#[derive(Error, Debug)]
pub enum K3supError {
    #[error("Connection error: unable to reach {address}: {message}")]
    Connection { address: String, message: String },

    #[error("Authentication error: all methods failed for key '{key_path}': {message}")]
    Authentication { key_path: String, message: String },

    #[error("Execution error: '{command}': {message}")]
    Execution { command: String, message: String },

    #[error("Shell '{shell}' could not be located: {message}")]
    ShellNotFound { shell: String, message: String },

    #[error("Operator for {0} is closed")]
    Closed(String),

    #[error("Command '{command}' exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Command '{command}' was killed by signal {signal}: {stderr}")]
    Signaled {
        command: String,
        signal: String,
        stderr: String,
    },

    #[error("Merge error: {0}")]
    Merge(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Kubernetes API error: {0}")]
    Kube(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl From<kube::Error> for K3supError {
    fn from(err: kube::Error) -> Self {
        K3supError::Kube(err.to_string())
    }
}

impl K3supError {
    pub fn connection(address: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            address: address.into(),
            message: message.to_string(),
        }
    }

    pub fn authentication(key_path: &Path, message: impl Into<String>) -> Self {
        Self::Authentication {
            key_path: key_path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn execution(command: impl Into<String>, message: impl ToString) -> Self {
        Self::Execution {
            command: command.into(),
            message: message.to_string(),
        }
    }

    pub fn merge(context: impl Into<String>) -> Self {
        Self::Merge(context.into())
    }

    pub fn validation(context: impl Into<String>) -> Self {
        Self::Validation(context.into())
    }

    pub fn config_error(context: impl Into<String>) -> Self {
        Self::Config(context.into())
    }
}
