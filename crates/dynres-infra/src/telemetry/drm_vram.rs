// Copyright 2025 eraflo
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

//! VRAM usage read from the kernel DRM sysfs interface.
//!
//! Drivers such as amdgpu expose `mem_info_vram_total` and
//! `mem_info_vram_used` (in bytes) under `/sys/class/drm/cardN/device/`.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use dynres_core::{ControlError, ControlResult, GpuMemoryService, MemoryUsage};

const DRM_CLASS_DIR: &str = "/sys/class/drm";
const VRAM_TOTAL_FILE: &str = "mem_info_vram_total";
const VRAM_USED_FILE: &str = "mem_info_vram_used";

/// GPU memory service backed by DRM sysfs counters.
#[derive(Debug, Clone)]
pub struct DrmVramMonitor {
    device_dir: PathBuf,
    monitor_id: String,
}

impl DrmVramMonitor {
    /// Creates a monitor reading the counters in `device_dir`.
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        let device_dir = device_dir.into();
        let monitor_id = format!("drm:{}", device_dir.display());
        Self {
            device_dir,
            monitor_id,
        }
    }

    /// Finds the first GPU under `/sys/class/drm` that exposes VRAM counters.
    pub fn probe() -> Option<Self> {
        Self::probe_in(Path::new(DRM_CLASS_DIR))
    }

    /// Finds the first `cardN/device` directory under `drm_class_dir` with VRAM counters.
    ///
    /// The monitor is only returned if a first reading succeeds.
    pub fn probe_in(drm_class_dir: &Path) -> Option<Self> {
        let entries = fs::read_dir(drm_class_dir).ok()?;

        let mut cards: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| Self::is_card_node(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.path().join("device"))
            .collect();
        cards.sort();

        cards.into_iter().map(Self::new).find(|monitor| {
            match monitor.memory_usage() {
                Ok(usage) => usage.total_bytes > 0,
                Err(err) => {
                    log::debug!("DrmVramMonitor: skipping '{}': {}", monitor.monitor_id, err);
                    false
                }
            }
        })
    }

    /// Directory holding the counters.
    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    // `card0` but not connector nodes like `card0-DP-1`.
    fn is_card_node(name: &str) -> bool {
        name.strip_prefix("card")
            .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
    }

    fn read_counter(&self, file: &str) -> ControlResult<u64> {
        let path = self.device_dir.join(file);
        let text = fs::read_to_string(&path).map_err(|err| {
            ControlError::TelemetryUnavailable(format!("cannot read '{}': {}", path.display(), err))
        })?;
        text.trim().parse::<u64>().map_err(|err| {
            ControlError::TelemetryUnavailable(format!("bad counter in '{}': {}", path.display(), err))
        })
    }
}

impl GpuMemoryService for DrmVramMonitor {
    fn service_id(&self) -> Cow<'static, str> {
        Cow::Owned(self.monitor_id.clone())
    }

    fn memory_usage(&self) -> ControlResult<MemoryUsage> {
        let total_bytes = self.read_counter(VRAM_TOTAL_FILE)?;
        let used_bytes = self.read_counter(VRAM_USED_FILE)?;
        Ok(MemoryUsage::new(total_bytes, used_bytes))
    }
}
