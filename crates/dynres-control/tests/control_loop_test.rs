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

//! Integration tests driving the controller against the simulated headset.

use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use dynres_control::{ControlLoop, ControlLoopConfig, ControlMode, TickOutcome};
use dynres_core::{ControlError, ControllerConfig, FrameTimingRecord, GpuMemoryService};
use dynres_infra::{HeadsetControls, SimulatedHeadset};

const GIB: u64 = 1 << 30;

/// Ticks every 100ms of simulated time.
fn fast_config() -> ControllerConfig {
    ControllerConfig {
        res_change_delay_ms: 100,
        ..Default::default()
    }
}

fn controller_with(
    config: ControllerConfig,
    with_vram: bool,
) -> (ControlLoop<SimulatedHeadset>, HeadsetControls) {
    let headset = SimulatedHeadset::new();
    let controls = headset.controls();
    let gpu_memory: Option<Box<dyn GpuMemoryService>> = if with_vram {
        Some(Box::new(headset.gpu_memory()))
    } else {
        None
    };
    let mut controller =
        ControlLoop::new(headset, gpu_memory, config, ControlLoopConfig::default());
    controller.initialize().unwrap();
    (controller, controls)
}

/// Runs `ticks` ticks, advancing the clock past the delay each time.
fn run_ticks(controller: &mut ControlLoop<SimulatedHeadset>, ticks: usize) -> Vec<TickOutcome> {
    let mut outcomes = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        let now = controller
            .state()
            .last_tick
            .map_or_else(Instant::now, |last| last + controller.config().tick_interval());
        outcomes.push(controller.poll(now).unwrap());
    }
    outcomes
}

// ─────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_initialize_takes_control_and_writes_initial_resolution() {
    let (controller, controls) = controller_with(
        ControllerConfig {
            initial_res: 120,
            ..fast_config()
        },
        false,
    );
    assert!(controls.manual_supersample_taken());
    assert_eq!(controls.writes(), vec![120.0]);
    assert_eq!(controller.state().current_resolution_percent, 120);
}

// ─────────────────────────────────────────────────────────────────────
// Convergence
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_light_load_converges_inside_hysteresis_band() {
    // 5ms at 100%: lots of headroom, the resolution climbs until GPU time
    // sits between 80% and 88% of the 11.1ms budget.
    let (mut controller, controls) = controller_with(fast_config(), false);
    controls.set_gpu_load(5.0);

    run_ticks(&mut controller, 60);

    let status = controller.status().unwrap();
    let budget = status.target_frametime_ms;
    assert!(status.resolution_percent > 100);
    assert!(
        status.avg_gpu_time_ms <= budget * 0.88,
        "gpu {}ms over budget {}ms",
        status.avg_gpu_time_ms,
        budget
    );

    // Once settled, further ticks do not write.
    let writes = controls.writes().len();
    let outcomes = run_ticks(&mut controller, 5);
    assert!(outcomes.iter().all(|outcome| !outcome.committed()));
    assert_eq!(controls.writes().len(), writes);
}

#[test]
fn test_heavy_load_drops_to_minimum() {
    let (mut controller, controls) = controller_with(fast_config(), false);
    controls.set_gpu_load(40.0);

    run_ticks(&mut controller, 30);

    assert_relative_eq!(controls.resolution(), 70.0);
    assert_eq!(controller.status().unwrap().resolution_percent, 70);
}

#[test]
fn test_reprojecting_application_gets_double_budget() {
    let (mut controller, controls) = controller_with(
        ControllerConfig {
            prefer_reprojection: true,
            ..fast_config()
        },
        false,
    );
    controls.set_cpu_time(12.0);
    controls.set_gpu_load(15.0);

    let outcomes = run_ticks(&mut controller, 1);

    // 15ms is over the native 9.8ms decrease boundary but well under 80% of 22.2ms.
    assert!(matches!(
        outcomes[0],
        TickOutcome::Completed { previous: 100, resolution, .. } if resolution > 100
    ));
    let status = controller.status().unwrap();
    assert_eq!(status.target_fps, 45);
    assert_relative_eq!(status.target_frametime_ms, 22.222222, epsilon = 1e-4);
}

#[test]
fn test_out_of_band_change_is_picked_up() {
    let (mut controller, controls) = controller_with(fast_config(), false);
    controls.set_frame_timings(vec![FrameTimingRecord::new(9.3, 4.0, 1); 128]);

    controls.set_resolution(180.0);
    let outcomes = run_ticks(&mut controller, 1);

    assert_eq!(
        outcomes[0],
        TickOutcome::Completed {
            mode: ControlMode::AutoAdjusting,
            previous: 180,
            resolution: 180,
        }
    );
}

// ─────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_home_environment_resets_then_dashboard_holds() {
    let (mut controller, controls) = controller_with(fast_config(), false);
    controls.set_gpu_load(5.0);
    run_ticks(&mut controller, 3);
    assert!(controls.resolution() > 100.0);

    controls.set_application("");
    run_ticks(&mut controller, 1);
    assert_relative_eq!(controls.resolution(), 100.0);
    assert_eq!(controller.state().mode, ControlMode::ResetPending);

    controls.set_application("sim.app.demo");
    controls.set_dashboard_visible(true);
    controls.set_resolution(140.0);
    let writes = controls.writes().len();
    run_ticks(&mut controller, 3);
    assert_eq!(controls.writes().len(), writes);
    assert_eq!(controller.state().mode, ControlMode::PausedContext);
}

#[test]
fn test_disabled_application_is_left_alone() {
    let mut config = fast_config();
    config.set_disabled_applications_from_text("sim.app.demo");
    let (mut controller, controls) = controller_with(config, false);
    controls.set_gpu_load(40.0);

    run_ticks(&mut controller, 5);
    assert_eq!(controls.writes(), vec![100.0]);
}

#[test]
fn test_idle_application_resets() {
    let (mut controller, controls) = controller_with(fast_config(), false);
    controls.set_resolution(150.0);
    controls.set_cpu_time(0.3);

    run_ticks(&mut controller, 1);
    assert_relative_eq!(controls.resolution(), 100.0);
}

// ─────────────────────────────────────────────────────────────────────
// VRAM
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_vram_target_caps_growth_and_limit_forces_decrease() {
    // 1GiB fixed plus 5GiB per 100% of an 8GiB card: the 80% target is
    // crossed at 108% and the 90% limit at 124%.
    let (mut controller, controls) = controller_with(fast_config(), true);
    controls.set_vram(8 * GIB, GIB, 5 * GIB);
    controls.set_gpu_load(3.0);

    run_ticks(&mut controller, 10);

    let status = controller.status().unwrap();
    assert!(status.vram_available());
    assert_eq!(status.resolution_percent, 111);

    // Frametime headroom is huge, yet the resolution goes down 5% per tick
    // until usage is back under the limit.
    controls.set_resolution(150.0);
    let outcomes = run_ticks(&mut controller, 10);
    assert!(outcomes[0].committed());
    assert_relative_eq!(controls.resolution(), 120.0);
}

#[test]
fn test_vram_only_mode_climbs_back_to_initial() {
    let (mut controller, controls) = controller_with(
        ControllerConfig {
            vram_only_mode: true,
            ..fast_config()
        },
        true,
    );
    controls.set_resolution(80.0);
    controls.set_gpu_load(2.0);

    let outcomes = run_ticks(&mut controller, 4);
    let resolutions: Vec<i32> = outcomes
        .iter()
        .map(|outcome| match outcome {
            TickOutcome::Completed { resolution, .. } => *resolution,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert_eq!(resolutions, vec![83, 86, 89, 92]);

    run_ticks(&mut controller, 10);
    assert_relative_eq!(controls.resolution(), 100.0);
}

#[test]
fn test_vram_failure_disables_monitoring_for_the_session() {
    let (mut controller, controls) = controller_with(fast_config(), true);
    controls.fail_vram(true);
    run_ticks(&mut controller, 1);
    assert!(!controller.has_gpu_memory_service());

    controls.fail_vram(false);
    run_ticks(&mut controller, 1);
    assert!(!controller.has_gpu_memory_service());
    assert!(!controller.status().unwrap().vram_available());
}

// ─────────────────────────────────────────────────────────────────────
// Errors & lifecycle
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_failed_query_keeps_resolution_and_retries_next_interval() {
    let (mut controller, controls) = controller_with(fast_config(), false);
    controls.set_gpu_load(40.0);
    controls.fail_query(Some("current_application_key"));

    let outcomes = run_ticks(&mut controller, 1);
    assert!(matches!(
        outcomes[0],
        TickOutcome::Skipped(ControlError::RuntimeQueryFailed { .. })
    ));
    assert_eq!(controls.writes(), vec![100.0]);

    let last_tick = controller.state().last_tick.unwrap();
    assert_eq!(
        controller.poll(last_tick + Duration::from_millis(50)).unwrap(),
        TickOutcome::Waiting
    );

    controls.fail_query(None);
    let outcomes = run_ticks(&mut controller, 1);
    assert!(outcomes[0].committed());
}

#[test]
fn test_quit_event_ends_run_without_further_writes() {
    let headset = SimulatedHeadset::new();
    let controls = headset.controls();
    controls.request_quit();
    let mut controller = ControlLoop::new(
        headset,
        None,
        fast_config(),
        ControlLoopConfig::default(),
    );

    controller.run().unwrap();
    assert_eq!(controls.writes(), vec![100.0]);
}

#[test]
fn test_shutdown_from_another_thread() {
    let headset = SimulatedHeadset::new();
    let controls = headset.controls();
    let mut controller = ControlLoop::new(
        headset,
        None,
        fast_config(),
        ControlLoopConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        },
    );
    let handle = controller.handle();

    let worker = std::thread::spawn(move || controller.run());
    std::thread::sleep(Duration::from_millis(50));
    assert!(handle.shutdown());

    assert!(worker.join().unwrap().is_ok());
    assert!(!controls.writes().is_empty());
}

#[test]
fn test_config_swap_between_ticks() {
    let (mut controller, controls) = controller_with(fast_config(), false);
    let handle = controller.handle();
    controls.set_gpu_load(5.0);

    handle.replace_config(ControllerConfig {
        max_res: 110,
        ..fast_config()
    });
    run_ticks(&mut controller, 10);

    assert_relative_eq!(controls.resolution(), 110.0);
    assert_eq!(controller.config().max_res, 110);
}

#[test]
fn test_commands_after_quit_do_not_block() {
    let headset = SimulatedHeadset::new();
    let controls = headset.controls();
    controls.request_quit();
    let mut controller = ControlLoop::new(
        headset,
        None,
        fast_config(),
        ControlLoopConfig {
            command_buffer_size: 2,
            ..Default::default()
        },
    );
    let handle = controller.handle();

    controller.run().unwrap();

    // More sends than the buffer holds: each one must fail right away.
    let sender = std::thread::spawn(move || {
        (0..4)
            .map(|_| handle.set_manual_override(true))
            .collect::<Vec<_>>()
    });
    let deadline = Instant::now() + Duration::from_secs(2);
    while !sender.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(sender.is_finished(), "send blocked on a stopped loop");
    assert_eq!(sender.join().unwrap(), vec![false; 4]);
}
