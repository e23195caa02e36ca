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

//! Error types shared by the controller and its collaborators.

use thiserror::Error;

/// A convenience alias for results produced by the controller and its services.
pub type ControlResult<T> = Result<T, ControlError>;

/// Failures the control loop can observe while talking to the outside world.
///
/// The variants differ in how far they propagate: a missing GPU memory service
/// only disables VRAM governance, a failed runtime query costs one tick, and a
/// terminated runtime ends the loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// The GPU memory telemetry service is missing or failed to answer.
    #[error("GPU memory telemetry unavailable: {0}")]
    TelemetryUnavailable(String),

    /// A call into the VR runtime failed mid-tick.
    #[error("VR runtime query '{query}' failed: {reason}")]
    RuntimeQueryFailed {
        /// Name of the runtime call that failed.
        query: &'static str,
        /// Description reported by the runtime.
        reason: String,
    },

    /// The VR runtime signalled shutdown.
    #[error("VR runtime terminated")]
    RuntimeTerminated,
}

impl ControlError {
    /// Shorthand for building a [`ControlError::RuntimeQueryFailed`].
    pub fn query_failed(query: &'static str, reason: impl Into<String>) -> Self {
        Self::RuntimeQueryFailed {
            query,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error must stop the control loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RuntimeTerminated)
    }
}

/// Failures while loading or storing a [`ControllerConfig`](crate::ControllerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read or written.
    #[error("settings I/O failed for '{path}': {source}")]
    Io {
        /// Path of the settings file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid.
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_runtime_termination_is_terminal() {
        assert!(ControlError::RuntimeTerminated.is_terminal());
        assert!(!ControlError::TelemetryUnavailable("no device".into()).is_terminal());
        assert!(!ControlError::query_failed("refresh_rate", "timeout").is_terminal());
    }

    #[test]
    fn test_query_failed_message_names_the_query() {
        let err = ControlError::query_failed("frame_timings", "compositor not ready");
        assert_eq!(
            err.to_string(),
            "VR runtime query 'frame_timings' failed: compositor not ready"
        );
    }
}
