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

//! GPU memory telemetry.
//!
//! Unlike frame timings, memory usage is actively polled: the controller asks
//! a [`GpuMemoryService`] for a fresh reading once per tick.

use crate::error::ControlResult;
use std::borrow::Cow;

/// Number of bytes in a gigabyte, as used for every VRAM figure shown to the operator.
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// A snapshot of dedicated video memory usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    /// Total VRAM capacity, in bytes.
    pub total_bytes: u64,
    /// VRAM currently in use, in bytes.
    pub used_bytes: u64,
}

impl MemoryUsage {
    /// Creates a new usage reading.
    pub fn new(total_bytes: u64, used_bytes: u64) -> Self {
        Self {
            total_bytes,
            used_bytes,
        }
    }

    /// Returns the used share of VRAM in `0.0..=1.0`, or `None` if the capacity is unknown.
    pub fn used_fraction(&self) -> Option<f32> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.used_bytes as f64 / self.total_bytes as f64) as f32)
    }

    /// Returns the used VRAM in gigabytes.
    pub fn used_gb(&self) -> f32 {
        (self.used_bytes as f64 / BYTES_PER_GB) as f32
    }

    /// Returns the total VRAM in gigabytes.
    pub fn total_gb(&self) -> f32 {
        (self.total_bytes as f64 / BYTES_PER_GB) as f32
    }
}

/// A source of GPU memory usage, typically backed by the graphics driver.
///
/// The service is optional: it is resolved once at startup and the controller
/// treats its absence exactly like a failed query. Implementations live in
/// `dynres-infra`.
pub trait GpuMemoryService: Send {
    /// Returns a human-readable identifier for the service (e.g. the device path).
    fn service_id(&self) -> Cow<'static, str>;

    /// Queries the current memory usage.
    ///
    /// Returns [`ControlError::TelemetryUnavailable`](crate::ControlError::TelemetryUnavailable)
    /// when the device cannot be read.
    fn memory_usage(&self) -> ControlResult<MemoryUsage>;
}
