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

//! Point a node-local kubeconfig at the node's public address.
//!
//! The substitution works line by line on the raw text rather than through a
//! YAML round trip, so comments, key order, quoting and the embedded
//! certificate blobs come out exactly as they went in. Only two kinds of
//! token are touched:
//!
//! * the host part of a `server:` URL when it is `127.0.0.1` or `localhost`;
//! * the value `default` of a `name:`, `cluster:`, `user:` or
//!   `current-context:` key.

use crate::infrastructure::constants::DEFAULT_CONTEXT;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

fn server_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?P<lead>[ \t]*(?:-[ \t]+)?server:[ \t]*["']?[A-Za-z][A-Za-z0-9+.\-]*://)(?P<host>127\.0\.0\.1|localhost)(?P<tail>[:/"'\s]|$)"#,
        )
        .expect("server pattern is a valid regex")
    })
}

fn context_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?P<lead>[ \t]*(?:-[ \t]+)?(?:name|cluster|user|current-context):[ \t]*)(?P<open>["']?)default(?P<close>["']?)(?P<tail>[ \t]*(?:#[^\r\n]*)?\r?)$"#,
        )
        .expect("context pattern is a valid regex")
    })
}

/// Host as it appears inside a URL.
fn url_host(host: &str) -> Cow<'_, str> {
    if host.contains(':') && !host.starts_with('[') {
        Cow::Owned(format!("[{}]", host))
    } else {
        Cow::Borrowed(host)
    }
}

/// Rewrite `raw` so that it targets `host` under the context `context`.
///
/// An empty `context` means `default`, which leaves names untouched.
/// Applying the rewrite twice with the same arguments changes nothing.
pub fn rewrite(raw: &str, host: &str, context: &str) -> String {
    let host = url_host(host);

    let pointed = server_pattern().replace_all(raw, |caps: &Captures| {
        format!("{}{}{}", &caps["lead"], host, &caps["tail"])
    });

    let context = if context.is_empty() {
        DEFAULT_CONTEXT
    } else {
        context
    };
    if context == DEFAULT_CONTEXT {
        return pointed.into_owned();
    }

    context_pattern()
        .replace_all(&pointed, |caps: &Captures| {
            format!(
                "{}{}{}{}{}",
                &caps["lead"], &caps["open"], context, &caps["close"], &caps["tail"]
            )
        })
        .into_owned()
}
