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

use crate::infrastructure::constants::KUBECONFIG_FILE_MODE;
use crate::shared::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// A kubeconfig that has been saved locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedKubeconfig {
    pub path: PathBuf,
    pub context: String,
}

impl SavedKubeconfig {
    /// How to start using the file.
    pub fn usage_hint(&self) -> String {
        format!(
            "# Test your cluster with:\nexport KUBECONFIG={}\nkubectl config use-context {}\nkubectl get node -o wide\n",
            self.path.display(),
            self.context
        )
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Write `data` to `path` readable by the owner only.
///
/// The mode is applied on every call, so an existing file with looser
/// permissions is tightened before the new contents land in it.
pub fn write_kubeconfig(path: &Path, data: &[u8], context: &str) -> Result<SavedKubeconfig> {
    let path = absolute(path)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(KUBECONFIG_FILE_MODE);
    }

    let mut file = options.open(&path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(KUBECONFIG_FILE_MODE))?;
    }
    file.write_all(data)?;
    file.sync_all()?;

    info!("Saved kubeconfig to {}", path.display());
    Ok(SavedKubeconfig {
        path,
        context: context.to_string(),
    })
}
