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

//! Provides the raw telemetry types reported by the VR runtime and the GPU driver.
//!
//! These are the "common language" between the external services and the
//! controller. `dynres-telemetry` reduces them into per-tick snapshots and
//! `dynres-infra` provides concrete sources for them.

pub mod frame;
pub mod memory;

pub use self::frame::{FrameTimingRecord, ReprojectionFlags, MAX_FRAME_TIMING_SAMPLES};
pub use self::memory::{GpuMemoryService, MemoryUsage, BYTES_PER_GB};
