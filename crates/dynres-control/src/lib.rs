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

//! # Dynres Control
//!
//! The adaptive resolution controller. Once per tick it:
//!
//! 1. aggregates frame timings and VRAM usage ([`dynres_telemetry`]),
//! 2. derives the frame budget ([`estimator`]),
//! 3. decides whether automatic adjustment applies ([`gate`]),
//! 4. weighs memory pressure ([`vram`]) and runs the control law ([`adjuster`]),
//! 5. writes the result back to the runtime if it changed ([`control_loop`]).

#![warn(missing_docs)]

pub mod adjuster;
pub mod context;
pub mod control_loop;
pub mod estimator;
pub mod gate;
pub mod status;
pub mod vram;

pub use adjuster::{AdjustmentInput, ResolutionAdjuster};
pub use context::{ControlMode, ControllerRuntimeState};
pub use control_loop::{ControlCommand, ControlHandle, ControlLoop, ControlLoopConfig, TickOutcome};
pub use estimator::{FrameBudget, TargetFrametimeEstimator};
pub use gate::{EligibilityGate, GateInputs};
pub use status::ControllerStatus;
pub use vram::{VramGovernor, VramPressure};
