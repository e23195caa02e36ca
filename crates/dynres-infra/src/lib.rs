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

//! # Dynres Infra
//!
//! Concrete implementations of the contracts defined in `dynres-core`:
//! a simulated headset runtime, GPU memory services, and the JSON settings store.

#![warn(missing_docs)]

pub mod runtime;
pub mod settings;
pub mod telemetry;

pub use runtime::{HeadsetControls, SimulatedGpuMemory, SimulatedHeadset};
pub use settings::JsonConfigStore;
pub use telemetry::{resolve_gpu_memory_service, DrmVramMonitor};
