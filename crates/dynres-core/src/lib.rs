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

//! # Dynres Core
//!
//! Foundational crate containing the telemetry types, the contracts of the
//! external services the controller talks to, and the controller
//! configuration.
//!
//! Nothing in here decides anything: `dynres-telemetry` reduces the raw
//! samples, `dynres-control` runs the control law, and `dynres-infra`
//! provides concrete implementations of the service traits.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod runtime;
pub mod telemetry;

pub use config::ControllerConfig;
pub use error::{ConfigError, ControlError, ControlResult};
pub use runtime::VrRuntime;
pub use telemetry::{FrameTimingRecord, GpuMemoryService, MemoryUsage, ReprojectionFlags};
