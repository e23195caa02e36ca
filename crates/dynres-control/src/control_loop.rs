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

//! The controller service.
//!
//! [`ControlLoop`] owns the runtime and the optional GPU memory service and
//! runs one tick every `res_change_delay_ms`. It is polled more often than it
//! ticks so that commands sent through a [`ControlHandle`] (configuration
//! swaps, manual override, shutdown) are picked up quickly. Commands are only
//! ever applied between ticks.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use dynres_core::config::{MAX_CONFIGURABLE_RES, MIN_CONFIGURABLE_RES};
use dynres_core::{ControlError, ControlResult, ControllerConfig, GpuMemoryService, VrRuntime};
use dynres_telemetry::TelemetryAggregator;

use crate::adjuster::{clamp_resolution, AdjustmentInput, ResolutionAdjuster};
use crate::context::{ControlMode, ControllerRuntimeState};
use crate::estimator::TargetFrametimeEstimator;
use crate::gate::{EligibilityGate, GateInputs};
use crate::status::ControllerStatus;
use crate::vram::VramGovernor;

/// Configuration of the loop itself, as opposed to the control law.
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    /// Sleep between two polls in [`ControlLoop::run`].
    pub poll_interval: Duration,
    /// Maximum number of pending commands. Further sends block.
    pub command_buffer_size: usize,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(167),
            command_buffer_size: 64,
        }
    }
}

/// A request from the surrounding application.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Replaces the whole configuration. Takes effect on the next tick.
    ReplaceConfig(Box<ControllerConfig>),
    /// Enables or disables the manual override.
    SetManualOverride(bool),
    /// Writes a resolution picked by the operator. Ignored unless the manual override is active.
    ApplyManualResolution(i32),
    /// Stops [`ControlLoop::run`].
    Shutdown,
}

/// Cloneable sender side of a [`ControlLoop`]'s command channel.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    command_tx: Sender<ControlCommand>,
}

impl ControlHandle {
    /// Sends a command. Returns `false` once the loop has stopped accepting commands.
    ///
    /// Blocks while the command buffer is full and the loop is still running.
    pub fn send(&self, command: ControlCommand) -> bool {
        self.command_tx.send(command).is_ok()
    }

    /// Replaces the configuration.
    pub fn replace_config(&self, config: ControllerConfig) -> bool {
        self.send(ControlCommand::ReplaceConfig(Box::new(config)))
    }

    /// Enables or disables the manual override.
    pub fn set_manual_override(&self, active: bool) -> bool {
        self.send(ControlCommand::SetManualOverride(active))
    }

    /// Writes a resolution by hand.
    pub fn apply_manual_resolution(&self, percent: i32) -> bool {
        self.send(ControlCommand::ApplyManualResolution(percent))
    }

    /// Asks the loop to stop.
    pub fn shutdown(&self) -> bool {
        self.send(ControlCommand::Shutdown)
    }
}

/// What a call to [`ControlLoop::poll`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The tick interval has not elapsed yet.
    Waiting,
    /// A tick ran to completion.
    Completed {
        /// Mode decided by the tick.
        mode: ControlMode,
        /// Resolution read at the start of the tick.
        previous: i32,
        /// Resolution after the tick.
        resolution: i32,
    },
    /// A runtime query failed; the resolution was left alone.
    Skipped(ControlError),
    /// A shutdown command was received.
    Stopped,
}

impl TickOutcome {
    /// Returns `true` if the tick wrote a new resolution.
    pub fn committed(&self) -> bool {
        matches!(self, TickOutcome::Completed { previous, resolution, .. } if previous != resolution)
    }
}

/// The adaptive resolution controller.
pub struct ControlLoop<R: VrRuntime> {
    runtime: R,
    gpu_memory: Option<Box<dyn GpuMemoryService>>,
    config: Arc<ControllerConfig>,
    loop_config: ControlLoopConfig,
    state: ControllerRuntimeState,
    status: Option<ControllerStatus>,
    stop_requested: bool,

    aggregator: TelemetryAggregator,
    estimator: TargetFrametimeEstimator,
    gate: EligibilityGate,
    governor: VramGovernor,
    adjuster: ResolutionAdjuster,

    command_tx: Sender<ControlCommand>,
    // Dropped when `run` returns, which disconnects every handle.
    command_rx: Option<Receiver<ControlCommand>>,
}

impl<R: VrRuntime> ControlLoop<R> {
    /// Creates a controller.
    ///
    /// `gpu_memory` is resolved by the caller once at startup; `None` turns
    /// VRAM governance off for the session. The configuration is sanitized.
    pub fn new(
        runtime: R,
        gpu_memory: Option<Box<dyn GpuMemoryService>>,
        config: ControllerConfig,
        loop_config: ControlLoopConfig,
    ) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::bounded(loop_config.command_buffer_size);

        match &gpu_memory {
            Some(service) => log::info!("ControlLoop: VRAM monitoring via '{}'.", service.service_id()),
            None => log::info!("ControlLoop: no GPU memory service, VRAM monitoring disabled."),
        }

        Self {
            runtime,
            gpu_memory,
            config: Arc::new(config.sanitized()),
            loop_config,
            state: ControllerRuntimeState::default(),
            status: None,
            stop_requested: false,
            aggregator: TelemetryAggregator::new(),
            estimator: TargetFrametimeEstimator::new(),
            gate: EligibilityGate::new(),
            governor: VramGovernor::new(),
            adjuster: ResolutionAdjuster::new(),
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Returns a handle to send commands to this loop.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// The configuration the next tick will use.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Runtime state of the controller.
    pub fn state(&self) -> &ControllerRuntimeState {
        &self.state
    }

    /// Status of the last completed tick.
    pub fn status(&self) -> Option<&ControllerStatus> {
        self.status.as_ref()
    }

    /// Returns `true` while a GPU memory service is attached.
    pub fn has_gpu_memory_service(&self) -> bool {
        self.gpu_memory.is_some()
    }

    /// The VR runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Takes over supersampling in the runtime and applies the initial resolution.
    pub fn initialize(&mut self) -> ControlResult<()> {
        self.runtime.take_manual_supersample_control()?;
        let initial_res = self.config.initial_res;
        self.runtime.set_resolution_percent(initial_res as f32)?;
        self.state.current_resolution_percent = initial_res;
        log::info!("ControlLoop: initialized at {}%.", initial_res);
        Ok(())
    }

    /// Processes pending commands and runs a tick if one is due.
    ///
    /// Only terminal errors are returned. A failed runtime query yields
    /// [`TickOutcome::Skipped`] and the next tick retries after the normal
    /// interval.
    pub fn poll(&mut self, now: Instant) -> ControlResult<TickOutcome> {
        self.drain_commands();
        if self.stop_requested {
            return Ok(TickOutcome::Stopped);
        }

        if self.runtime.poll_quit_event() {
            log::info!("ControlLoop: runtime requested shutdown.");
            return Err(ControlError::RuntimeTerminated);
        }

        if let Some(last_tick) = self.state.last_tick {
            if now.saturating_duration_since(last_tick) < self.config.tick_interval() {
                log::trace!("ControlLoop: next tick not due yet.");
                return Ok(TickOutcome::Waiting);
            }
        }

        let outcome = match self.tick() {
            Ok(outcome) => outcome,
            Err(err) if err.is_terminal() => return Err(err),
            Err(err) => {
                log::warn!("ControlLoop: tick skipped: {}", err);
                TickOutcome::Skipped(err)
            }
        };

        self.state.last_tick = Some(Instant::now().max(now));
        Ok(outcome)
    }

    /// Polls until the runtime quits or a shutdown command arrives.
    ///
    /// Once this returns, for any reason, the loop stops accepting commands
    /// and every [`ControlHandle::send`] returns `false`.
    pub fn run(&mut self) -> ControlResult<()> {
        let result = self.run_until_stopped();
        self.close_commands();
        result
    }

    /// Returns `true` while handles can still deliver commands.
    pub fn accepts_commands(&self) -> bool {
        self.command_rx.is_some()
    }

    fn run_until_stopped(&mut self) -> ControlResult<()> {
        self.initialize()?;
        log::info!(
            "ControlLoop: running, ticking every {:?}.",
            self.config.tick_interval()
        );

        loop {
            match self.poll(Instant::now()) {
                Ok(TickOutcome::Stopped) => {
                    log::info!("ControlLoop: shutdown requested.");
                    break;
                }
                Ok(TickOutcome::Completed { .. }) => {
                    if let Some(status) = &self.status {
                        log::debug!("ControlLoop: {}", status);
                    }
                }
                Ok(_) => {}
                Err(ControlError::RuntimeTerminated) => break,
                Err(err) => return Err(err),
            }
            thread::sleep(self.loop_config.poll_interval);
        }

        log::info!("ControlLoop: stopped.");
        Ok(())
    }

    fn close_commands(&mut self) {
        if let Some(command_rx) = self.command_rx.take() {
            let dropped = command_rx.try_iter().count();
            if dropped > 0 {
                log::debug!("ControlLoop: discarded {} pending command(s).", dropped);
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Some(command) = self
            .command_rx
            .as_ref()
            .and_then(|command_rx| command_rx.try_recv().ok())
        {
            match command {
                ControlCommand::ReplaceConfig(config) => {
                    self.config = Arc::new(config.sanitized());
                    log::info!("ControlLoop: configuration replaced.");
                }
                ControlCommand::SetManualOverride(active) => {
                    if self.state.manual_override_active != active {
                        log::info!(
                            "ControlLoop: manual override {}.",
                            if active { "enabled" } else { "disabled" }
                        );
                    }
                    self.state.manual_override_active = active;
                }
                ControlCommand::ApplyManualResolution(percent) => {
                    self.apply_manual_resolution(percent);
                }
                ControlCommand::Shutdown => self.stop_requested = true,
            }
        }
    }

    fn apply_manual_resolution(&mut self, percent: i32) {
        if !self.state.manual_override_active {
            log::warn!(
                "ControlLoop: ignoring manual resolution {}% while the manual override is off.",
                percent
            );
            return;
        }

        let percent = clamp_resolution(percent, MIN_CONFIGURABLE_RES, MAX_CONFIGURABLE_RES);
        match self.runtime.set_resolution_percent(percent as f32) {
            Ok(()) => {
                self.state.current_resolution_percent = percent;
                log::info!("ControlLoop: manual resolution set to {}%.", percent);
            }
            Err(err) => log::warn!("ControlLoop: manual resolution not applied: {}", err),
        }
    }

    fn retire_gpu_memory(&mut self, err: &ControlError) {
        if let Some(service) = self.gpu_memory.take() {
            log::warn!(
                "ControlLoop: GPU memory service '{}' failed ({}), VRAM monitoring disabled.",
                service.service_id(),
                err
            );
        }
    }

    fn tick(&mut self) -> ControlResult<TickOutcome> {
        let config = Arc::clone(&self.config);

        let current_res = self.runtime.current_resolution_percent()?.round() as i32;
        self.state.current_resolution_percent = current_res;
        let refresh_hz = self.runtime.display_refresh_hz()?;

        let gpu_memory = if config.vram_monitor_enabled {
            self.gpu_memory.as_deref()
        } else {
            None
        };
        let aggregation = self
            .aggregator
            .aggregate(config.sample_count(), &self.runtime, gpu_memory)?;
        if let Some(err) = &aggregation.vram_error {
            self.retire_gpu_memory(err);
        }
        let snapshot = aggregation.snapshot;

        let budget = self
            .estimator
            .estimate(refresh_hz, snapshot.avg_cpu_time_ms, &config)?;

        let dashboard_visible = self.runtime.is_dashboard_visible()?;
        let application_key = self.runtime.current_application_key()?;
        let mode = self.gate.evaluate(
            &GateInputs {
                dashboard_visible,
                application_key: &application_key,
                manual_override_active: self.state.manual_override_active,
                avg_cpu_time_ms: snapshot.avg_cpu_time_ms,
            },
            &config,
        );

        let pressure = self.governor.govern(&snapshot, current_res, &config);
        let new_res = match mode {
            ControlMode::AutoAdjusting => self.adjuster.adjust(
                &AdjustmentInput {
                    current_res,
                    target_frametime_ms: budget.target_frametime_ms,
                    avg_gpu_time_ms: snapshot.avg_gpu_time_ms,
                    avg_cpu_time_ms: snapshot.avg_cpu_time_ms,
                },
                &pressure,
                &config,
            ),
            ControlMode::ResetPending => config.initial_res,
            ControlMode::PausedManual | ControlMode::PausedContext => current_res,
        };

        if new_res != current_res {
            self.runtime.set_resolution_percent(new_res as f32)?;
            self.state.current_resolution_percent = new_res;
            log::info!(
                "ControlLoop: resolution {}% → {}% ({}, gpu {:.2}ms / budget {:.2}ms).",
                current_res,
                new_res,
                mode,
                snapshot.avg_gpu_time_ms,
                budget.target_frametime_ms
            );
        }
        self.state.transition_to(mode);

        self.status = Some(ControllerStatus::from_tick(
            mode,
            &budget,
            &snapshot,
            &pressure,
            new_res,
            self.gpu_memory.is_some(),
            &config,
        ));

        Ok(TickOutcome::Completed {
            mode,
            previous: current_res,
            resolution: new_res,
        })
    }
}
