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

//! GPU memory services.

mod drm_vram;

pub use drm_vram::DrmVramMonitor;

use dynres_core::GpuMemoryService;

/// Resolves the GPU memory service for this session.
///
/// Called once at startup. Returns `None` if no supported GPU exposes its
/// memory usage, which turns VRAM governance off.
pub fn resolve_gpu_memory_service() -> Option<Box<dyn GpuMemoryService>> {
    match DrmVramMonitor::probe() {
        Some(monitor) => {
            log::info!("GPU memory service: using '{}'.", monitor.device_dir().display());
            Some(Box::new(monitor))
        }
        None => {
            log::warn!("GPU memory service: no GPU exposes VRAM usage, monitoring unavailable.");
            None
        }
    }
}
