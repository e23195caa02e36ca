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

//! State the controller keeps between ticks.

use std::time::Instant;

/// What the controller does with the resolution this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlMode {
    /// The control law runs.
    #[default]
    AutoAdjusting,
    /// The operator drives the resolution by hand; nothing is clamped or written.
    PausedManual,
    /// The dashboard is open or the application is disabled; the resolution is held.
    PausedContext,
    /// No application runs or it is idle; the resolution returns to its initial value.
    ResetPending,
}

impl ControlMode {
    /// Returns a short, stable name for the mode.
    pub fn name(&self) -> &'static str {
        match self {
            ControlMode::AutoAdjusting => "auto",
            ControlMode::PausedManual => "manual",
            ControlMode::PausedContext => "paused",
            ControlMode::ResetPending => "reset",
        }
    }

    /// Returns `true` if the control law runs in this mode.
    pub fn is_adjusting(&self) -> bool {
        matches!(self, ControlMode::AutoAdjusting)
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime state of the controller.
///
/// Only `mode`, `last_tick` and the operator-controlled
/// `manual_override_active` flag carry meaning across ticks.
/// `current_resolution_percent` is refreshed from the runtime at the start of
/// every tick and is kept for display only.
#[derive(Debug, Clone, Default)]
pub struct ControllerRuntimeState {
    /// Mode decided by the last completed tick.
    pub mode: ControlMode,
    /// End of the last tick, if any ran.
    pub last_tick: Option<Instant>,
    /// Resolution observed (or committed) during the last tick.
    pub current_resolution_percent: i32,
    /// Set by the operator to take the resolution over by hand.
    pub manual_override_active: bool,
}

impl ControllerRuntimeState {
    /// Records the mode of the current tick. Returns `true` if it changed.
    pub fn transition_to(&mut self, mode: ControlMode) -> bool {
        if self.mode == mode {
            return false;
        }
        log::info!("Controller mode: {} → {}", self.mode, mode);
        self.mode = mode;
        true
    }
}
