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

//! Checks for values spliced into shell command lines.

use crate::shared::error::{K3supError, Result};

const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '\'', '"', '\\', '<', '>', '(', ')', '{', '}', '*', '?', '!', '#',
    '~', '[', ']',
];

const EXTRA_ARGS_FORBIDDEN: &[char] = &['\'', ';', '&', '|', '`', '$', '<', '>'];

/// Hosts, tokens, versions and channels: one shell word, nothing special.
pub fn validate_word(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(K3supError::validation(format!("{} must not be empty", field)));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || SHELL_METACHARACTERS.contains(c))
    {
        return Err(K3supError::validation(format!(
            "{} contains forbidden character {:?}: '{}'",
            field, c, value
        )));
    }
    Ok(())
}

/// A value that lives inside a single-quoted string, such as the datastore
/// endpoint in `INSTALL_K3S_EXEC='...'`. Parentheses are fine there.
pub fn validate_quoted_word(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(K3supError::validation(format!("{} must not be empty", field)));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '\'')
    {
        return Err(K3supError::validation(format!(
            "{} contains forbidden character {:?}",
            field, c
        )));
    }
    Ok(())
}

/// Free-form k3s flags. Spaces and `=` are expected; anything that could end
/// a quote or chain another command is not.
pub fn validate_extra_args(value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|c| *c == '\n' || *c == '\r' || EXTRA_ARGS_FORBIDDEN.contains(c))
    {
        return Err(K3supError::validation(format!(
            "extra args contain forbidden character {:?}: '{}'",
            c, value
        )));
    }
    Ok(())
}

/// Free-form k3s flags passed as bare words after `sh -s -`. The shell
/// would glob, comment out or group on these, so only plain words pass.
pub fn validate_unquoted_args(value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|c| *c == '\n' || *c == '\r' || SHELL_METACHARACTERS.contains(c))
    {
        return Err(K3supError::validation(format!(
            "extra args contain forbidden character {:?}: '{}'",
            c, value
        )));
    }
    Ok(())
}

pub fn validate_data_dir(value: &str) -> Result<()> {
    validate_word("data dir", value)?;
    if !value.starts_with('/') {
        return Err(K3supError::validation(format!(
            "data dir must be an absolute path: '{}'",
            value
        )));
    }
    Ok(())
}

pub fn validate_context_name(value: &str) -> Result<()> {
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-'))
    {
        return Err(K3supError::validation(format!(
            "context name must match [A-Za-z0-9._@-]+: '{}'",
            value
        )));
    }
    Ok(())
}

/// Single-quote `value` for `sh`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
