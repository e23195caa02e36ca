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

//! The contract between the controller and the VR runtime.

use crate::error::ControlResult;
use crate::telemetry::FrameTimingRecord;

/// The VR runtime seen as a telemetry source and a resolution sink.
///
/// Every call is expected to be fast and bounded. A failing query should
/// return [`ControlError::RuntimeQueryFailed`](crate::ControlError::RuntimeQueryFailed);
/// the controller then skips the tick instead of retrying.
pub trait VrRuntime: Send {
    /// Returns the native refresh rate of the head-mounted display, in Hz.
    fn display_refresh_hz(&self) -> ControlResult<f32>;

    /// Returns up to `max_count` of the most recent frame timings.
    ///
    /// The runtime may return fewer records than requested.
    fn recent_frame_timings(&self, max_count: usize) -> ControlResult<Vec<FrameTimingRecord>>;

    /// Returns the supersampling resolution currently applied, in percent.
    fn current_resolution_percent(&self) -> ControlResult<f32>;

    /// Applies a new supersampling resolution, in percent.
    fn set_resolution_percent(&mut self, percent: f32) -> ControlResult<()>;

    /// Returns `true` while the runtime's dashboard overlay is open.
    fn is_dashboard_visible(&self) -> ControlResult<bool>;

    /// Returns the key of the running VR application, or an empty string if none runs.
    fn current_application_key(&self) -> ControlResult<String>;

    /// Returns `true` once the runtime asked its clients to quit.
    fn poll_quit_event(&mut self) -> bool;

    /// Switches the runtime's supersampling from automatic to a caller-provided value.
    ///
    /// Called once before the first tick. Runtimes without an automatic mode
    /// keep the default no-op.
    fn take_manual_supersample_control(&mut self) -> ControlResult<()> {
        Ok(())
    }
}
