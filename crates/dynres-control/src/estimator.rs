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

//! Reprojection-aware frame budget.

use dynres_core::{ControlError, ControlResult, ControllerConfig};

/// The frame budget the GPU has to meet this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBudget {
    /// Native refresh rate of the display, in Hz.
    pub refresh_hz: f32,
    /// Frametime at the native refresh rate, in milliseconds.
    pub base_frametime_ms: f32,
    /// Frame rate the application is expected to reach.
    pub target_fps: u32,
    /// Frametime the application is expected to reach, in milliseconds.
    pub target_frametime_ms: f32,
    /// `true` if the budget assumes every frame is shown twice.
    pub reprojecting: bool,
}

/// Derives the frame budget from the display refresh rate and the reprojection policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetFrametimeEstimator;

impl TargetFrametimeEstimator {
    /// Creates a new estimator.
    pub fn new() -> Self {
        Self
    }

    /// Computes the frame budget.
    ///
    /// The budget is doubled (and the target frame rate halved) at most once,
    /// when reprojection is forced or when CPU time shows the application
    /// cannot keep up with the native rate.
    pub fn estimate(
        &self,
        display_refresh_hz: f32,
        avg_cpu_time_ms: f32,
        config: &ControllerConfig,
    ) -> ControlResult<FrameBudget> {
        if !display_refresh_hz.is_finite() || display_refresh_hz <= 0.0 {
            return Err(ControlError::query_failed(
                "display_refresh_hz",
                format!("invalid refresh rate {display_refresh_hz}"),
            ));
        }

        let base_frametime_ms = 1000.0 / display_refresh_hz;
        let native_fps = display_refresh_hz.round() as u32;
        let reprojecting = Self::should_reproject(base_frametime_ms, avg_cpu_time_ms, config);

        let (target_fps, target_frametime_ms) = if reprojecting {
            (native_fps / 2, base_frametime_ms * 2.0)
        } else {
            (native_fps, base_frametime_ms)
        };

        Ok(FrameBudget {
            refresh_hz: display_refresh_hz,
            base_frametime_ms,
            target_fps,
            target_frametime_ms,
            reprojecting,
        })
    }

    /// Returns `true` if the budget must assume half-rate reprojection.
    ///
    /// `ignore_cpu_time` silences the CPU-driven conditions but never
    /// `always_reproject`.
    pub fn should_reproject(
        base_frametime_ms: f32,
        avg_cpu_time_ms: f32,
        config: &ControllerConfig,
    ) -> bool {
        if config.always_reproject {
            return true;
        }
        if config.ignore_cpu_time {
            return false;
        }
        let cpu_over_one_frame = config.prefer_reprojection && avg_cpu_time_ms > base_frametime_ms;
        let cpu_over_two_frames = avg_cpu_time_ms / 2.0 > base_frametime_ms;
        cpu_over_one_frame || cpu_over_two_frames
    }
}
