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

//! VRAM pressure governance.
//!
//! Two thresholds, expressed as percentages of VRAM capacity:
//! - below `vram_target` the resolution may grow,
//! - above `vram_limit` it is forced down every tick.

use dynres_core::ControllerConfig;
use dynres_telemetry::TelemetrySnapshot;

/// Constraints VRAM usage puts on this tick's adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VramPressure {
    /// The resolution may grow this tick.
    pub increase_allowed: bool,
    /// The resolution must shrink this tick.
    pub force_decrease: bool,
    /// Set in VRAM-only mode: the resolution the recovery path climbs back to.
    pub vram_only_floor: Option<i32>,
}

impl Default for VramPressure {
    fn default() -> Self {
        Self::unconstrained()
    }
}

impl VramPressure {
    /// No constraint at all: increases allowed, nothing forced.
    pub const fn unconstrained() -> Self {
        Self {
            increase_allowed: true,
            force_decrease: false,
            vram_only_floor: None,
        }
    }

    /// Returns `true` if the frametime path is bypassed.
    pub fn is_vram_only(&self) -> bool {
        self.vram_only_floor.is_some()
    }

    /// The growth threshold in gigabytes, given the VRAM capacity.
    pub fn target_gb(total_gb: f32, config: &ControllerConfig) -> f32 {
        total_gb * config.vram_target as f32 / 100.0
    }

    /// The forced-decrease threshold in gigabytes, given the VRAM capacity.
    pub fn limit_gb(total_gb: f32, config: &ControllerConfig) -> f32 {
        total_gb * config.vram_limit as f32 / 100.0
    }
}

/// Turns a VRAM reading into a [`VramPressure`].
#[derive(Debug, Default, Clone, Copy)]
pub struct VramGovernor;

impl VramGovernor {
    /// Creates a new governor.
    pub fn new() -> Self {
        Self
    }

    /// Computes the pressure for this tick.
    ///
    /// Without a usable reading, or with monitoring disabled, usage counts as
    /// within target.
    pub fn govern(
        &self,
        snapshot: &TelemetrySnapshot,
        current_res: i32,
        config: &ControllerConfig,
    ) -> VramPressure {
        let vram_only_floor = config.vram_only_mode.then_some(config.initial_res);

        let used_fraction = match snapshot.vram.used_fraction() {
            Some(fraction) if config.vram_monitor_enabled => fraction,
            _ => {
                return VramPressure {
                    vram_only_floor,
                    ..VramPressure::unconstrained()
                }
            }
        };

        let force_decrease = used_fraction > config.vram_limit as f32 / 100.0;
        let increase_allowed =
            !force_decrease && used_fraction < config.vram_target as f32 / 100.0;

        if force_decrease {
            log::debug!(
                "VramGovernor: {:.0}% of VRAM in use at {}% resolution, over the {}% limit.",
                used_fraction * 100.0,
                current_res,
                config.vram_limit
            );
        }

        VramPressure {
            increase_allowed,
            force_decrease,
            vram_only_floor,
        }
    }
}
