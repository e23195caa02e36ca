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

//! The resolution control law.

use crate::vram::VramPressure;
use dynres_core::ControllerConfig;

/// Per-tick inputs of the control law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentInput {
    /// Resolution read from the runtime at the start of the tick, in percent.
    pub current_res: i32,
    /// Frame budget of this tick, in milliseconds.
    pub target_frametime_ms: f32,
    /// Mean GPU time of the batch, in milliseconds.
    pub avg_gpu_time_ms: f32,
    /// Mean CPU time of the batch, in milliseconds.
    pub avg_cpu_time_ms: f32,
}

/// Computes the next resolution from the frame budget and VRAM pressure.
///
/// The frametime path reacts in proportion to the distance from the
/// hysteresis band; inside the band nothing moves. Deltas are truncated
/// toward zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolutionAdjuster;

impl ResolutionAdjuster {
    /// Creates a new adjuster.
    pub fn new() -> Self {
        Self
    }

    /// GPU time under which the resolution grows, in milliseconds.
    pub fn increase_boundary_ms(target_frametime_ms: f32, config: &ControllerConfig) -> f32 {
        target_frametime_ms * (config.res_increase_threshold as f32 / 100.0)
    }

    /// GPU time over which the resolution shrinks, in milliseconds.
    pub fn decrease_boundary_ms(target_frametime_ms: f32, config: &ControllerConfig) -> f32 {
        target_frametime_ms * (config.res_decrease_threshold as f32 / 100.0)
    }

    /// Returns the resolution to apply.
    pub fn adjust(
        &self,
        input: &AdjustmentInput,
        pressure: &VramPressure,
        config: &ControllerConfig,
    ) -> i32 {
        let vram_only = pressure.is_vram_only();

        // Loading screens and idle applications keep their resolution.
        if !(input.avg_cpu_time_ms > config.min_cpu_time_threshold || vram_only) {
            return input.current_res;
        }

        let mut new_res = input.current_res;

        if !vram_only {
            let increase_ms = Self::increase_boundary_ms(input.target_frametime_ms, config);
            let decrease_ms = Self::decrease_boundary_ms(input.target_frametime_ms, config);

            if input.avg_gpu_time_ms < increase_ms && pressure.increase_allowed {
                let delta = Self::step(
                    increase_ms - input.avg_gpu_time_ms,
                    config.res_increase_scale,
                    config.res_increase_min,
                );
                new_res = new_res.saturating_add(delta);
            } else if input.avg_gpu_time_ms > decrease_ms {
                let delta = Self::step(
                    input.avg_gpu_time_ms - decrease_ms,
                    config.res_decrease_scale,
                    config.res_decrease_min,
                );
                new_res = new_res.saturating_sub(delta);
            }
        }

        if pressure.force_decrease {
            new_res = new_res.saturating_sub(config.res_decrease_min.max(1));
        } else if let Some(floor) = pressure.vram_only_floor {
            if pressure.increase_allowed && new_res < floor {
                new_res = floor.min(new_res.saturating_add(config.res_increase_min));
            }
        }

        clamp_resolution(new_res, config.min_res, config.max_res)
    }

    fn step(distance_ms: f32, scale: i32, min_step: i32) -> i32 {
        (distance_ms * (scale as f32 / 100.0) + min_step as f32) as i32
    }
}

/// Clamps `value` into `[min_res, max_res]`. If the bounds are inverted, `max_res` wins.
pub fn clamp_resolution(value: i32, min_res: i32, max_res: i32) -> i32 {
    value.max(min_res).min(max_res)
}
