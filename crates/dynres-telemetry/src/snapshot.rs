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

//! The per-tick telemetry snapshot.

use dynres_core::MemoryUsage;

/// VRAM usage as seen by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VramReading {
    /// No usable reading: the service is absent, disabled, or failed.
    #[default]
    Unavailable,
    /// A valid reading.
    Available {
        /// Share of VRAM in use, `0.0..=1.0`.
        used_fraction: f32,
        /// VRAM in use, in gigabytes.
        used_gb: f32,
        /// VRAM capacity, in gigabytes.
        total_gb: f32,
    },
}

impl VramReading {
    /// Converts a raw memory reading. A reading without capacity is unusable.
    pub fn from_usage(usage: MemoryUsage) -> Self {
        match usage.used_fraction() {
            Some(used_fraction) => Self::Available {
                used_fraction,
                used_gb: usage.used_gb(),
                total_gb: usage.total_gb(),
            },
            None => Self::Unavailable,
        }
    }

    /// Returns `true` if the reading can drive VRAM governance.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Returns the used share of VRAM, if available.
    pub fn used_fraction(&self) -> Option<f32> {
        match self {
            Self::Available { used_fraction, .. } => Some(*used_fraction),
            Self::Unavailable => None,
        }
    }

    /// Returns the VRAM capacity in gigabytes, if available.
    pub fn total_gb(&self) -> Option<f32> {
        match self {
            Self::Available { total_gb, .. } => Some(*total_gb),
            Self::Unavailable => None,
        }
    }

    /// Returns the VRAM in use in gigabytes, if available.
    pub fn used_gb(&self) -> Option<f32> {
        match self {
            Self::Available { used_gb, .. } => Some(*used_gb),
            Self::Unavailable => None,
        }
    }
}

/// One tick's worth of averaged telemetry.
///
/// Rebuilt from scratch every tick and discarded at the end of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    /// Mean GPU time over the batch, in milliseconds.
    pub avg_gpu_time_ms: f32,
    /// Mean CPU time over the batch, in milliseconds.
    pub avg_cpu_time_ms: f32,
    /// Mean number of presentations per frame. 1.0 means no reprojection.
    pub avg_frames_presented: f32,
    /// Number of frame timings the averages were computed over.
    pub sample_count: usize,
    /// Current VRAM usage.
    pub vram: VramReading,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            avg_gpu_time_ms: 0.0,
            avg_cpu_time_ms: 0.0,
            avg_frames_presented: 1.0,
            sample_count: 0,
            vram: VramReading::Unavailable,
        }
    }
}

impl TelemetrySnapshot {
    /// Share of presentations that were reprojections (0.0 = none, 1.0 = every frame twice).
    pub fn reprojection_ratio(&self) -> f32 {
        (self.avg_frames_presented - 1.0).max(0.0)
    }

    /// Estimates the application's real frame rate for a display running at `refresh_hz`.
    pub fn estimated_fps(&self, refresh_hz: f32) -> f32 {
        if self.avg_frames_presented <= 0.0 {
            return refresh_hz;
        }
        refresh_hz / self.avg_frames_presented
    }
}
