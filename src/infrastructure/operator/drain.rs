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

//! Output capture shared by both operators.
//!
//! Each stream gets its own reader. Callers join the stdout reader, the
//! stderr reader and the process/channel future so that a child blocked on
//! a full stderr pipe never stalls the stdout reader, or the other way round.

use crate::infrastructure::constants::DRAIN_CHUNK_SIZE;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Read `reader` to EOF, returning every byte. When a mirror is given each
/// chunk is also written there; a failing mirror is dropped and capture
/// carries on.
pub async fn drain<R, W>(mut reader: R, mut mirror: Option<W>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = vec![0u8; DRAIN_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        captured.extend_from_slice(&chunk[..n]);

        if let Some(out) = mirror.as_mut() {
            let mirrored = async {
                out.write_all(&chunk[..n]).await?;
                out.flush().await
            }
            .await;
            if let Err(e) = mirrored {
                warn!("Stopped mirroring command output: {}", e);
                mirror = None;
            }
        }
    }

    Ok(captured)
}

/// Mirror targets for one `execute` call.
pub fn mirrors(stream: bool) -> (Option<tokio::io::Stdout>, Option<tokio::io::Stderr>) {
    if stream {
        (Some(tokio::io::stdout()), Some(tokio::io::stderr()))
    } else {
        (None, None)
    }
}
