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

//! Per-frame timing records produced by the compositor.

/// Maximum number of frame timings the runtime keeps in its history.
pub const MAX_FRAME_TIMING_SAMPLES: usize = 128;

/// Reasons the compositor reported for reprojecting a frame.
///
/// Informational only: the controller estimates reprojection from
/// [`FrameTimingRecord::frames_presented`], never from these bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReprojectionFlags {
    bits: u32,
}

impl ReprojectionFlags {
    /// No reprojection.
    pub const NONE: Self = Self { bits: 0 };
    /// The application missed its CPU deadline.
    pub const CPU: Self = Self { bits: 0x01 };
    /// The application missed its GPU deadline.
    pub const GPU: Self = Self { bits: 0x02 };
    /// Asynchronous reprojection was active.
    pub const ASYNC: Self = Self { bits: 0x04 };
    /// Motion smoothing was active.
    pub const MOTION: Self = Self { bits: 0x08 };

    /// Creates a set of flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks whether every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns `true` if the frame was reprojected because of a missed CPU or GPU deadline.
    pub const fn missed_deadline(&self) -> bool {
        (self.bits & (Self::CPU.bits | Self::GPU.bits)) != 0
    }
}

impl std::ops::BitOr for ReprojectionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Timing of a single frame as reported by the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimingRecord {
    /// Total GPU render time of the frame, in milliseconds.
    pub gpu_time_ms: f32,
    /// CPU time of the frame, in milliseconds.
    ///
    /// Compositor CPU time plus application and late-start time.
    pub cpu_time_ms: f32,
    /// How many times the frame was shown. Anything above 1 means reprojection.
    pub frames_presented: u32,
    /// Why the compositor reprojected, if it did.
    pub reprojection_flags: ReprojectionFlags,
}

impl Default for FrameTimingRecord {
    fn default() -> Self {
        Self {
            gpu_time_ms: 0.0,
            cpu_time_ms: 0.0,
            frames_presented: 1,
            reprojection_flags: ReprojectionFlags::NONE,
        }
    }
}

impl FrameTimingRecord {
    /// Creates a record from already-reduced values.
    ///
    /// `frames_presented` is raised to 1 since a frame is always shown at least once.
    pub fn new(gpu_time_ms: f32, cpu_time_ms: f32, frames_presented: u32) -> Self {
        Self {
            gpu_time_ms: gpu_time_ms.max(0.0),
            cpu_time_ms: cpu_time_ms.max(0.0),
            frames_presented: frames_presented.max(1),
            reprojection_flags: ReprojectionFlags::NONE,
        }
    }

    /// Builds a record from the raw compositor timing fields.
    ///
    /// The CPU time is the compositor's own render CPU time plus the span
    /// between poses being ready and the new frame being ready, which covers
    /// the application's CPU work and any late start.
    pub fn from_compositor(
        total_render_gpu_ms: f32,
        compositor_render_cpu_ms: f32,
        new_poses_ready_ms: f32,
        new_frame_ready_ms: f32,
        num_frame_presents: u32,
        reprojection_flags: ReprojectionFlags,
    ) -> Self {
        let cpu_time_ms = compositor_render_cpu_ms + (new_frame_ready_ms - new_poses_ready_ms);
        Self {
            reprojection_flags,
            ..Self::new(total_render_gpu_ms, cpu_time_ms, num_frame_presents)
        }
    }

    /// Returns `true` if the frame was shown more than once.
    pub fn is_reprojected(&self) -> bool {
        self.frames_presented > 1
    }
}
