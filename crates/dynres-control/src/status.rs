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

//! Read-only view of the last completed tick, for status displays.

use std::fmt;

use crate::context::ControlMode;
use crate::estimator::FrameBudget;
use crate::vram::VramPressure;
use dynres_core::ControllerConfig;
use dynres_telemetry::{TelemetrySnapshot, VramReading};

/// Everything a status display shows about the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    /// Mode decided by the tick.
    pub mode: ControlMode,
    /// Display refresh rate, in Hz.
    pub refresh_hz: f32,
    /// Frametime at the native refresh rate, in milliseconds.
    pub base_frametime_ms: f32,
    /// Frame rate the application is expected to reach.
    pub target_fps: u32,
    /// Frametime the application is expected to reach, in milliseconds.
    pub target_frametime_ms: f32,
    /// Frame rate the application actually reaches, reprojection included.
    pub estimated_fps: f32,
    /// Mean GPU time, in milliseconds.
    pub avg_gpu_time_ms: f32,
    /// Mean CPU time, in milliseconds.
    pub avg_cpu_time_ms: f32,
    /// Share of reprojected presentations.
    pub reprojection_ratio: f32,
    /// Number of frame timings averaged.
    pub sample_count: usize,
    /// VRAM reading of the tick.
    pub vram: VramReading,
    /// Growth threshold in GB, if a reading is available.
    pub vram_target_gb: Option<f32>,
    /// Forced-decrease threshold in GB, if a reading is available.
    pub vram_limit_gb: Option<f32>,
    /// `false` once the GPU memory service is absent or retired.
    pub vram_monitor_active: bool,
    /// Resolution after the tick, in percent.
    pub resolution_percent: i32,
    /// Human-readable notes about the tick.
    pub alerts: Vec<String>,
}

impl ControllerStatus {
    /// Builds the status of a completed tick.
    pub fn from_tick(
        mode: ControlMode,
        budget: &FrameBudget,
        snapshot: &TelemetrySnapshot,
        pressure: &VramPressure,
        resolution_percent: i32,
        vram_monitor_active: bool,
        config: &ControllerConfig,
    ) -> Self {
        let total_gb = snapshot.vram.total_gb();
        let mut status = Self {
            mode,
            refresh_hz: budget.refresh_hz,
            base_frametime_ms: budget.base_frametime_ms,
            target_fps: budget.target_fps,
            target_frametime_ms: budget.target_frametime_ms,
            estimated_fps: snapshot.estimated_fps(budget.refresh_hz),
            avg_gpu_time_ms: snapshot.avg_gpu_time_ms,
            avg_cpu_time_ms: snapshot.avg_cpu_time_ms,
            reprojection_ratio: snapshot.reprojection_ratio(),
            sample_count: snapshot.sample_count,
            vram: snapshot.vram,
            vram_target_gb: total_gb.map(|total| VramPressure::target_gb(total, config)),
            vram_limit_gb: total_gb.map(|total| VramPressure::limit_gb(total, config)),
            vram_monitor_active,
            resolution_percent,
            alerts: Vec::new(),
        };

        if budget.reprojecting {
            status
                .alerts
                .push(format!("Reprojecting: targeting {} fps.", budget.target_fps));
        }
        if pressure.force_decrease {
            status
                .alerts
                .push("VRAM: over limit, forcing resolution down.".into());
        }
        if !vram_monitor_active && config.vram_monitor_enabled {
            status.alerts.push("VRAM: monitoring unavailable.".into());
        }

        status
    }

    /// Returns `true` if the tick saw a usable VRAM reading.
    pub fn vram_available(&self) -> bool {
        self.vram.is_available()
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:.0}Hz ({:.2}ms) target {}fps ({:.2}ms) | fps {:.0} gpu {:.2}ms cpu {:.2}ms reproj {:.0}% | ",
            self.mode,
            self.refresh_hz,
            self.base_frametime_ms,
            self.target_fps,
            self.target_frametime_ms,
            self.estimated_fps,
            self.avg_gpu_time_ms,
            self.avg_cpu_time_ms,
            self.reprojection_ratio * 100.0,
        )?;

        match (self.vram.used_gb(), self.vram_target_gb, self.vram_limit_gb) {
            (Some(used), Some(target), Some(limit)) => {
                write!(f, "vram {used:.2}/{target:.2}/{limit:.2}GB | ")?
            }
            _ => f.write_str("vram disabled | ")?,
        }

        write!(f, "res {}%", self.resolution_percent)
    }
}
