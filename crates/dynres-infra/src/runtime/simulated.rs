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

//! A headset simulated in-process.
//!
//! GPU time and VRAM usage grow linearly with the supersampling resolution,
//! so a controller driving it converges like it would on real hardware.
//! [`HeadsetControls`] changes the simulated conditions from another thread
//! or from a test while the controller owns the [`SimulatedHeadset`].

use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dynres_core::telemetry::MAX_FRAME_TIMING_SAMPLES;
use dynres_core::{
    ControlError, ControlResult, FrameTimingRecord, GpuMemoryService, MemoryUsage,
    ReprojectionFlags, VrRuntime,
};

const GIB: u64 = 1 << 30;
const COMPOSITOR_CPU_MS: f32 = 0.5;

#[derive(Debug, Clone)]
struct HeadsetState {
    refresh_hz: f32,
    resolution_percent: f32,
    gpu_ms_at_native: f32,
    cpu_ms: f32,
    scripted_frames: Option<Vec<FrameTimingRecord>>,
    dashboard_visible: bool,
    application_key: String,
    failing_query: Option<&'static str>,
    quit_requested: bool,
    manual_supersample: bool,
    writes: Vec<f32>,
    vram_total_bytes: u64,
    vram_base_bytes: u64,
    vram_bytes_at_native: u64,
    vram_failing: bool,
}

impl Default for HeadsetState {
    fn default() -> Self {
        Self {
            refresh_hz: 90.0,
            resolution_percent: 100.0,
            gpu_ms_at_native: 8.0,
            cpu_ms: 4.0,
            scripted_frames: None,
            dashboard_visible: false,
            application_key: "sim.app.demo".into(),
            failing_query: None,
            quit_requested: false,
            manual_supersample: false,
            writes: Vec::new(),
            vram_total_bytes: 8 * GIB,
            vram_base_bytes: 2 * GIB,
            vram_bytes_at_native: 3 * GIB,
            vram_failing: false,
        }
    }
}

impl HeadsetState {
    fn check(&self, query: &'static str) -> ControlResult<()> {
        match self.failing_query {
            Some(failing) if failing == query => {
                Err(ControlError::query_failed(query, "simulated failure"))
            }
            _ => Ok(()),
        }
    }

    // Splits the CPU time the way the compositor reports it: its own render
    // time plus the span from poses ready to frame ready.
    fn modeled_frame(&self) -> FrameTimingRecord {
        let gpu_ms = self.gpu_ms_at_native * self.resolution_percent / 100.0;
        let frametime_ms = 1000.0 / self.refresh_hz;
        let missed = gpu_ms > frametime_ms;

        let compositor_cpu_ms = self.cpu_ms.min(COMPOSITOR_CPU_MS).max(0.0);
        let poses_ready_ms = 1.0;
        let frame_ready_ms = poses_ready_ms + (self.cpu_ms - compositor_cpu_ms);
        let (presents, flags) = if missed {
            (2, ReprojectionFlags::GPU | ReprojectionFlags::ASYNC)
        } else {
            (1, ReprojectionFlags::NONE)
        };

        FrameTimingRecord::from_compositor(
            gpu_ms,
            compositor_cpu_ms,
            poses_ready_ms,
            frame_ready_ms,
            presents,
            flags,
        )
    }

    fn vram_usage(&self) -> MemoryUsage {
        let scaled = self.vram_bytes_at_native as f64 * self.resolution_percent as f64 / 100.0;
        let used = self.vram_base_bytes.saturating_add(scaled as u64);
        MemoryUsage::new(self.vram_total_bytes, used.min(self.vram_total_bytes))
    }
}

fn lock(shared: &Mutex<HeadsetState>) -> MutexGuard<'_, HeadsetState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`VrRuntime`] backed by a simple performance model.
#[derive(Debug, Default)]
pub struct SimulatedHeadset {
    shared: Arc<Mutex<HeadsetState>>,
}

impl SimulatedHeadset {
    /// Creates a 90 Hz headset running an application that needs 8 ms of GPU time at 100%.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle changing the simulated conditions.
    pub fn controls(&self) -> HeadsetControls {
        HeadsetControls {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns a GPU memory service reporting this headset's VRAM usage.
    pub fn gpu_memory(&self) -> SimulatedGpuMemory {
        SimulatedGpuMemory {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl VrRuntime for SimulatedHeadset {
    fn display_refresh_hz(&self) -> ControlResult<f32> {
        let state = lock(&self.shared);
        state.check("display_refresh_hz")?;
        Ok(state.refresh_hz)
    }

    fn recent_frame_timings(&self, max_count: usize) -> ControlResult<Vec<FrameTimingRecord>> {
        let state = lock(&self.shared);
        state.check("recent_frame_timings")?;

        let count = max_count.min(MAX_FRAME_TIMING_SAMPLES);
        Ok(match &state.scripted_frames {
            Some(frames) => frames[frames.len().saturating_sub(count)..].to_vec(),
            None => vec![state.modeled_frame(); count],
        })
    }

    fn current_resolution_percent(&self) -> ControlResult<f32> {
        let state = lock(&self.shared);
        state.check("current_resolution_percent")?;
        Ok(state.resolution_percent)
    }

    fn set_resolution_percent(&mut self, percent: f32) -> ControlResult<()> {
        let mut state = lock(&self.shared);
        state.check("set_resolution_percent")?;
        state.resolution_percent = percent;
        state.writes.push(percent);
        Ok(())
    }

    fn is_dashboard_visible(&self) -> ControlResult<bool> {
        let state = lock(&self.shared);
        state.check("is_dashboard_visible")?;
        Ok(state.dashboard_visible)
    }

    fn current_application_key(&self) -> ControlResult<String> {
        let state = lock(&self.shared);
        state.check("current_application_key")?;
        Ok(state.application_key.clone())
    }

    fn poll_quit_event(&mut self) -> bool {
        lock(&self.shared).quit_requested
    }

    fn take_manual_supersample_control(&mut self) -> ControlResult<()> {
        let mut state = lock(&self.shared);
        state.check("take_manual_supersample_control")?;
        state.manual_supersample = true;
        Ok(())
    }
}

/// Changes the conditions of a [`SimulatedHeadset`] and inspects what the controller did.
#[derive(Debug, Clone)]
pub struct HeadsetControls {
    shared: Arc<Mutex<HeadsetState>>,
}

impl HeadsetControls {
    /// Sets the display refresh rate.
    pub fn set_refresh_hz(&self, refresh_hz: f32) {
        lock(&self.shared).refresh_hz = refresh_hz;
    }

    /// Sets the GPU time the application needs at 100% resolution.
    pub fn set_gpu_load(&self, gpu_ms_at_native: f32) {
        lock(&self.shared).gpu_ms_at_native = gpu_ms_at_native;
    }

    /// Sets the CPU time of every frame.
    pub fn set_cpu_time(&self, cpu_ms: f32) {
        lock(&self.shared).cpu_ms = cpu_ms;
    }

    /// Replaces the performance model with a fixed frame history, oldest first.
    pub fn set_frame_timings(&self, frames: Vec<FrameTimingRecord>) {
        lock(&self.shared).scripted_frames = Some(frames);
    }

    /// Goes back to the performance model.
    pub fn clear_frame_timings(&self) {
        lock(&self.shared).scripted_frames = None;
    }

    /// Opens or closes the dashboard.
    pub fn set_dashboard_visible(&self, visible: bool) {
        lock(&self.shared).dashboard_visible = visible;
    }

    /// Sets the running application. An empty key means the home environment.
    pub fn set_application(&self, application_key: &str) {
        lock(&self.shared).application_key = application_key.to_owned();
    }

    /// Makes the named runtime query fail until cleared with `None`.
    pub fn fail_query(&self, query: Option<&'static str>) {
        lock(&self.shared).failing_query = query;
    }

    /// Makes the runtime ask its clients to quit.
    pub fn request_quit(&self) {
        lock(&self.shared).quit_requested = true;
    }

    /// Changes the resolution out-of-band, like a user moving a slider in the runtime.
    pub fn set_resolution(&self, percent: f32) {
        lock(&self.shared).resolution_percent = percent;
    }

    /// Returns the resolution currently applied.
    pub fn resolution(&self) -> f32 {
        lock(&self.shared).resolution_percent
    }

    /// Returns every resolution written through [`VrRuntime::set_resolution_percent`].
    pub fn writes(&self) -> Vec<f32> {
        lock(&self.shared).writes.clone()
    }

    /// Returns `true` once a client took manual supersampling control.
    pub fn manual_supersample_taken(&self) -> bool {
        lock(&self.shared).manual_supersample
    }

    /// Sets the VRAM model: capacity, fixed usage, and usage added per 100% of resolution.
    pub fn set_vram(&self, total_bytes: u64, base_bytes: u64, bytes_at_native: u64) {
        let mut state = lock(&self.shared);
        state.vram_total_bytes = total_bytes;
        state.vram_base_bytes = base_bytes;
        state.vram_bytes_at_native = bytes_at_native;
    }

    /// Makes VRAM queries fail.
    pub fn fail_vram(&self, failing: bool) {
        lock(&self.shared).vram_failing = failing;
    }
}

/// [`GpuMemoryService`] reporting the VRAM usage of a [`SimulatedHeadset`].
#[derive(Debug, Clone)]
pub struct SimulatedGpuMemory {
    shared: Arc<Mutex<HeadsetState>>,
}

impl GpuMemoryService for SimulatedGpuMemory {
    fn service_id(&self) -> Cow<'static, str> {
        Cow::Borrowed("simulated")
    }

    fn memory_usage(&self) -> ControlResult<MemoryUsage> {
        let state = lock(&self.shared);
        if state.vram_failing {
            return Err(ControlError::TelemetryUnavailable(
                "simulated device lost".into(),
            ));
        }
        Ok(state.vram_usage())
    }
}
