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

//! Thresholds and policy switches of the resolution controller.
//!
//! A [`ControllerConfig`] is owned by the surrounding application. The control
//! loop only ever sees a read-only snapshot of it; edits are delivered as a
//! whole new value and swapped in between two ticks.

use crate::error::ConfigError;
use crate::telemetry::MAX_FRAME_TIMING_SAMPLES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Shortest allowed interval between two control decisions, in milliseconds.
pub const MIN_RES_CHANGE_DELAY_MS: u64 = 100;
/// Lowest resolution percentage an operator may configure.
pub const MIN_CONFIGURABLE_RES: i32 = 20;
/// Highest resolution percentage an operator may configure.
pub const MAX_CONFIGURABLE_RES: i32 = 500;

/// Applications adjustment is disabled for out of the box.
const DEFAULT_DISABLED_APPLICATIONS: [&str; 4] = [
    "steam.app.620980",
    "steam.app.658920",
    "steam.app.2177750",
    "steam.app.2177760",
];

/// Complete configuration of the resolution controller.
///
/// All resolution values are integer percentages of the native render
/// resolution. Threshold values are percentages of the target frametime
/// (`res_*_threshold`) or of total VRAM (`vram_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // General
    /// Interval between two control decisions, in milliseconds.
    pub res_change_delay_ms: u64,
    /// Number of recent frames averaged every tick.
    pub data_average_samples: usize,
    /// Application keys for which automatic adjustment is paused.
    pub disabled_applications: BTreeSet<String>,

    // Resolution
    /// Resolution applied at startup and on reset.
    pub initial_res: i32,
    /// Lowest resolution automatic adjustment may reach.
    pub min_res: i32,
    /// Highest resolution automatic adjustment may reach.
    pub max_res: i32,
    /// GPU time, as a share of the frame budget, under which resolution increases.
    pub res_increase_threshold: i32,
    /// GPU time, as a share of the frame budget, over which resolution decreases.
    pub res_decrease_threshold: i32,
    /// Constant part of every increase step.
    pub res_increase_min: i32,
    /// Constant part of every decrease step.
    pub res_decrease_min: i32,
    /// Proportional gain applied to the GPU headroom, in percent.
    pub res_increase_scale: i32,
    /// Proportional gain applied to the GPU excess, in percent.
    pub res_decrease_scale: i32,
    /// CPU time, in milliseconds, under which the application is considered idle.
    pub min_cpu_time_threshold: f32,
    /// Reset to `initial_res` while CPU time is under `min_cpu_time_threshold`.
    pub reset_on_threshold: bool,

    // Reprojection
    /// Always budget for half the refresh rate.
    pub always_reproject: bool,
    /// Budget for half the refresh rate as soon as CPU time exceeds one frame.
    pub prefer_reprojection: bool,
    /// Never let CPU time trigger the half-rate budget.
    pub ignore_cpu_time: bool,

    // VRAM
    /// Query GPU memory usage at all.
    pub vram_monitor_enabled: bool,
    /// Ignore frametimes and drive resolution from memory pressure only.
    pub vram_only_mode: bool,
    /// VRAM usage, in percent, under which resolution may increase.
    pub vram_target: i32,
    /// VRAM usage, in percent, over which resolution is forced down.
    pub vram_limit: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            res_change_delay_ms: 3000,
            data_average_samples: MAX_FRAME_TIMING_SAMPLES,
            disabled_applications: DEFAULT_DISABLED_APPLICATIONS
                .iter()
                .map(|key| key.to_string())
                .collect(),
            initial_res: 100,
            min_res: 70,
            max_res: 250,
            res_increase_threshold: 80,
            res_decrease_threshold: 88,
            res_increase_min: 3,
            res_decrease_min: 5,
            res_increase_scale: 140,
            res_decrease_scale: 140,
            min_cpu_time_threshold: 0.6,
            reset_on_threshold: true,
            always_reproject: false,
            prefer_reprojection: false,
            ignore_cpu_time: false,
            vram_monitor_enabled: true,
            vram_only_mode: false,
            vram_target: 80,
            vram_limit: 90,
        }
    }
}

impl ControllerConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// Missing fields take their default value. The result is not sanitized.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns a copy with every field forced into the range an operator may configure.
    pub fn sanitized(mut self) -> Self {
        let before = self.clone();

        self.res_change_delay_ms = self.res_change_delay_ms.max(MIN_RES_CHANGE_DELAY_MS);
        self.data_average_samples = self
            .data_average_samples
            .clamp(1, MAX_FRAME_TIMING_SAMPLES);
        self.initial_res = self
            .initial_res
            .clamp(MIN_CONFIGURABLE_RES, MAX_CONFIGURABLE_RES);
        self.min_res = self.min_res.clamp(MIN_CONFIGURABLE_RES, MAX_CONFIGURABLE_RES);
        self.max_res = self.max_res.clamp(MIN_CONFIGURABLE_RES, MAX_CONFIGURABLE_RES);
        self.res_increase_threshold = self.res_increase_threshold.clamp(0, 100);
        self.res_decrease_threshold = self.res_decrease_threshold.clamp(0, 100);
        self.vram_target = self.vram_target.clamp(0, 100);
        self.vram_limit = self.vram_limit.clamp(0, 100);
        self.disabled_applications.retain(|key| !key.trim().is_empty());

        if self != before {
            log::warn!("ControllerConfig: out-of-range settings were clamped.");
        }
        self
    }

    /// Returns the interval between two control decisions.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.res_change_delay_ms.max(MIN_RES_CHANGE_DELAY_MS))
    }

    /// Returns the number of frame timings to request, capped at the runtime's history size.
    pub fn sample_count(&self) -> usize {
        self.data_average_samples.clamp(1, MAX_FRAME_TIMING_SAMPLES)
    }

    /// Returns `true` if automatic adjustment must not run for `application_key`.
    ///
    /// An empty key means no application is running, which counts as disabled.
    pub fn is_application_disabled(&self, application_key: &str) -> bool {
        application_key.is_empty() || self.disabled_applications.contains(application_key)
    }

    /// Replaces the disabled application set from free text (one key per line or word).
    pub fn set_disabled_applications_from_text(&mut self, text: &str) {
        self.disabled_applications = parse_application_list(text);
    }

    /// Returns the disabled application keys joined by single spaces.
    pub fn application_list_string(&self) -> String {
        self.disabled_applications
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Splits a whitespace- or newline-delimited list of application keys into a set.
pub fn parse_application_list(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ControllerConfig::default();
        assert_eq!(config.res_change_delay_ms, 3000);
        assert_eq!(config.data_average_samples, 128);
        assert_eq!((config.initial_res, config.min_res, config.max_res), (100, 70, 250));
        assert_eq!(config.res_increase_threshold, 80);
        assert_eq!(config.res_decrease_threshold, 88);
        assert!(config.reset_on_threshold);
        assert!(config.vram_monitor_enabled);
        assert!(!config.vram_only_mode);
        assert!(config.disabled_applications.contains("steam.app.620980"));
        assert_eq!(config.disabled_applications.len(), 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ControllerConfig::from_json(r#"{ "min_res": 50, "vram_only_mode": true }"#)
            .expect("valid document");
        assert_eq!(config.min_res, 50);
        assert!(config.vram_only_mode);
        assert_eq!(config.max_res, 250);
        assert_eq!(config.res_decrease_scale, 140);
    }

    #[test]
    fn test_json_round_trip_preserves_application_set() {
        let mut config = ControllerConfig::default();
        config.set_disabled_applications_from_text("steam.app.1\nsteam.app.2");
        let restored = ControllerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            ControllerConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_sanitize_clamps_operator_ranges() {
        let config = ControllerConfig {
            res_change_delay_ms: 10,
            data_average_samples: 4096,
            initial_res: 900,
            min_res: 1,
            res_increase_threshold: 140,
            res_decrease_threshold: -3,
            vram_target: 250,
            vram_limit: -10,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(config.res_change_delay_ms, 100);
        assert_eq!(config.data_average_samples, 128);
        assert_eq!(config.initial_res, 500);
        assert_eq!(config.min_res, 20);
        assert_eq!(config.res_increase_threshold, 100);
        assert_eq!(config.res_decrease_threshold, 0);
        assert_eq!(config.vram_target, 100);
        assert_eq!(config.vram_limit, 0);
    }

    #[test]
    fn test_vram_percentages_from_file_are_clamped() {
        let config = ControllerConfig::from_json(r#"{ "vram_target": 250, "vram_limit": -10 }"#)
            .unwrap()
            .sanitized();
        assert!((0..=100).contains(&config.vram_target));
        assert!((0..=100).contains(&config.vram_limit));
    }

    #[test]
    fn test_sanitize_keeps_valid_config_untouched() {
        let config = ControllerConfig::default();
        assert_eq!(config.clone().sanitized(), config);
    }

    #[test]
    fn test_empty_key_counts_as_disabled() {
        let config = ControllerConfig::default();
        assert!(config.is_application_disabled(""));
        assert!(config.is_application_disabled("steam.app.658920"));
        assert!(!config.is_application_disabled("steam.app.450390"));
    }

    #[test]
    fn test_application_list_parsing() {
        let set = parse_application_list("steam.app.1 steam.app.2\n\nsteam.app.3\n");
        assert_eq!(set.len(), 3);

        let mut config = ControllerConfig::default();
        config.disabled_applications = set;
        assert_eq!(
            config.application_list_string(),
            "steam.app.1 steam.app.2 steam.app.3"
        );
    }

    #[test]
    fn test_sample_count_is_capped() {
        let config = ControllerConfig {
            data_average_samples: 0,
            ..Default::default()
        };
        assert_eq!(config.sample_count(), 1);
        assert_eq!(config.tick_interval(), Duration::from_millis(3000));
    }
}
