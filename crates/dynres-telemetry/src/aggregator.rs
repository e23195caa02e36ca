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

//! Reduction of raw telemetry into a [`TelemetrySnapshot`].

use crate::snapshot::{TelemetrySnapshot, VramReading};
use dynres_core::telemetry::MAX_FRAME_TIMING_SAMPLES;
use dynres_core::{ControlError, ControlResult, FrameTimingRecord, GpuMemoryService, VrRuntime};

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// The averaged telemetry.
    pub snapshot: TelemetrySnapshot,
    /// The error returned by the GPU memory service, if its query failed.
    ///
    /// The snapshot already marks VRAM as unavailable in that case; the error
    /// is surfaced so the owner of the service can decide to retire it.
    pub vram_error: Option<ControlError>,
}

/// Running arithmetic mean.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value_or(&self, empty: f32) -> f32 {
        if self.count == 0 {
            return empty;
        }
        (self.sum / self.count as f64) as f32
    }
}

/// Pulls a bounded batch of frame timings plus a VRAM reading and averages them.
///
/// Stateless: nothing is carried over between ticks, so a changed sample
/// count simply applies to the next call.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryAggregator;

impl TelemetryAggregator {
    /// Creates a new aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Builds the snapshot for the current tick.
    ///
    /// `sample_count` is capped at [`MAX_FRAME_TIMING_SAMPLES`]. A failed frame
    /// timing query fails the whole aggregation; a failed VRAM query only
    /// marks VRAM as unavailable.
    pub fn aggregate<R>(
        &self,
        sample_count: usize,
        frames: &R,
        vram: Option<&dyn GpuMemoryService>,
    ) -> ControlResult<Aggregation>
    where
        R: VrRuntime + ?Sized,
    {
        let requested = sample_count.clamp(1, MAX_FRAME_TIMING_SAMPLES);
        let records = frames.recent_frame_timings(requested)?;

        let mut snapshot = Self::reduce(&records[..records.len().min(requested)]);

        let mut vram_error = None;
        if let Some(service) = vram {
            match service.memory_usage() {
                Ok(usage) => snapshot.vram = VramReading::from_usage(usage),
                Err(err) => {
                    log::debug!(
                        "TelemetryAggregator: VRAM query on '{}' failed: {}",
                        service.service_id(),
                        err
                    );
                    vram_error = Some(err);
                }
            }
        }

        Ok(Aggregation {
            snapshot,
            vram_error,
        })
    }

    /// Averages a batch of frame timings. VRAM is left unavailable.
    pub fn reduce(records: &[FrameTimingRecord]) -> TelemetrySnapshot {
        let mut gpu = Mean::default();
        let mut cpu = Mean::default();
        let mut presented = Mean::default();

        for record in records {
            gpu.push(record.gpu_time_ms as f64);
            cpu.push(record.cpu_time_ms as f64);
            presented.push(record.frames_presented.max(1) as f64);
        }

        TelemetrySnapshot {
            avg_gpu_time_ms: gpu.value_or(0.0),
            avg_cpu_time_ms: cpu.value_or(0.0),
            avg_frames_presented: presented.value_or(1.0),
            sample_count: records.len(),
            vram: VramReading::Unavailable,
        }
    }
}
