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

//! Eligibility of automatic adjustment.

use crate::context::ControlMode;
use dynres_core::ControllerConfig;

/// Everything the gate looks at, sampled at the current tick.
#[derive(Debug, Clone, Copy)]
pub struct GateInputs<'a> {
    /// The runtime's dashboard overlay is open.
    pub dashboard_visible: bool,
    /// Key of the running application, empty if none.
    pub application_key: &'a str,
    /// The operator took the resolution over.
    pub manual_override_active: bool,
    /// Mean CPU time of the current batch, in milliseconds.
    pub avg_cpu_time_ms: f32,
}

/// Decides the [`ControlMode`] of a tick.
///
/// Memoryless: the result depends on the current inputs only.
#[derive(Debug, Default, Clone, Copy)]
pub struct EligibilityGate;

impl EligibilityGate {
    /// Creates a new gate.
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if the control law may run this tick.
    pub fn is_eligible(&self, inputs: &GateInputs<'_>, config: &ControllerConfig) -> bool {
        !inputs.dashboard_visible
            && !config.is_application_disabled(inputs.application_key)
            && !inputs.manual_override_active
            && !Self::idle_reset_condition(inputs, config)
    }

    /// Evaluates the mode for this tick.
    pub fn evaluate(&self, inputs: &GateInputs<'_>, config: &ControllerConfig) -> ControlMode {
        if self.is_eligible(inputs, config) {
            return ControlMode::AutoAdjusting;
        }
        if inputs.manual_override_active {
            return ControlMode::PausedManual;
        }
        if inputs.application_key.is_empty() || Self::idle_reset_condition(inputs, config) {
            return ControlMode::ResetPending;
        }
        ControlMode::PausedContext
    }

    // CPU time below threshold means a loading screen or an idle application.
    fn idle_reset_condition(inputs: &GateInputs<'_>, config: &ControllerConfig) -> bool {
        config.reset_on_threshold && inputs.avg_cpu_time_ms < config.min_cpu_time_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(application_key: &str) -> GateInputs<'_> {
        GateInputs {
            dashboard_visible: false,
            application_key,
            manual_override_active: false,
            avg_cpu_time_ms: 4.0,
        }
    }

    #[test]
    fn test_running_application_is_eligible() {
        let gate = EligibilityGate::new();
        let config = ControllerConfig::default();
        assert_eq!(
            gate.evaluate(&inputs("steam.app.450390"), &config),
            ControlMode::AutoAdjusting
        );
    }

    #[test]
    fn test_dashboard_never_adjusts() {
        let gate = EligibilityGate::new();
        let config = ControllerConfig::default();
        for key in ["", "steam.app.450390", "steam.app.620980"] {
            for manual in [false, true] {
                let gate_inputs = GateInputs {
                    dashboard_visible: true,
                    manual_override_active: manual,
                    ..inputs(key)
                };
                assert_ne!(
                    gate.evaluate(&gate_inputs, &config),
                    ControlMode::AutoAdjusting
                );
            }
        }
    }

    #[test]
    fn test_dashboard_over_running_application_holds() {
        let gate = EligibilityGate::new();
        let gate_inputs = GateInputs {
            dashboard_visible: true,
            ..inputs("steam.app.450390")
        };
        assert_eq!(
            gate.evaluate(&gate_inputs, &ControllerConfig::default()),
            ControlMode::PausedContext
        );
    }

    #[test]
    fn test_manual_override_wins_over_reset() {
        let gate = EligibilityGate::new();
        let gate_inputs = GateInputs {
            manual_override_active: true,
            ..inputs("")
        };
        assert_eq!(
            gate.evaluate(&gate_inputs, &ControllerConfig::default()),
            ControlMode::PausedManual
        );
    }

    #[test]
    fn test_no_application_resets() {
        let gate = EligibilityGate::new();
        assert_eq!(
            gate.evaluate(&inputs(""), &ControllerConfig::default()),
            ControlMode::ResetPending
        );
    }

    #[test]
    fn test_disabled_application_holds() {
        let gate = EligibilityGate::new();
        assert_eq!(
            gate.evaluate(&inputs("steam.app.620980"), &ControllerConfig::default()),
            ControlMode::PausedContext
        );
    }

    #[test]
    fn test_idle_cpu_resets_only_when_enabled() {
        let gate = EligibilityGate::new();
        let idle = GateInputs {
            avg_cpu_time_ms: 0.3,
            ..inputs("steam.app.450390")
        };

        assert_eq!(
            gate.evaluate(&idle, &ControllerConfig::default()),
            ControlMode::ResetPending
        );

        let config = ControllerConfig {
            reset_on_threshold: false,
            ..Default::default()
        };
        assert_eq!(gate.evaluate(&idle, &config), ControlMode::AutoAdjusting);
    }
}
