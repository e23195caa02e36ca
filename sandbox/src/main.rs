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

// Dynres Sandbox
// Drives the controller against a simulated headset for manual testing.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dynres_control::{ControlLoop, ControlLoopConfig};
use dynres_core::GpuMemoryService;
use dynres_infra::settings::DEFAULT_SETTINGS_FILE;
use dynres_infra::{resolve_gpu_memory_service, JsonConfigStore, SimulatedHeadset};
use dynres_telemetry::logging::{init_logging, DEFAULT_FILTER};

#[derive(Debug, Parser)]
#[command(about = "Adaptive resolution controller sandbox")]
struct Args {
    /// Settings file, created with defaults if missing.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// GPU time the simulated application needs at 100% resolution, in ms.
    #[arg(long, default_value_t = 8.0)]
    gpu_load: f32,

    /// CPU time of every simulated frame, in ms.
    #[arg(long, default_value_t = 4.0)]
    cpu_time: f32,

    /// Display refresh rate of the simulated headset, in Hz.
    #[arg(long, default_value_t = 90.0)]
    refresh_hz: f32,

    /// Report the simulated headset's VRAM instead of probing the real GPU.
    #[arg(long)]
    simulated_vram: bool,

    /// Stop after this many seconds. Runs until interrupted otherwise.
    #[arg(long)]
    duration: Option<u64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = DEFAULT_FILTER)]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = JsonConfigStore::new(&args.config).load_or_default();

    let headset = SimulatedHeadset::new();
    let controls = headset.controls();
    controls.set_refresh_hz(args.refresh_hz);
    controls.set_gpu_load(args.gpu_load);
    controls.set_cpu_time(args.cpu_time);

    let gpu_memory: Option<Box<dyn GpuMemoryService>> = if args.simulated_vram {
        Some(Box::new(headset.gpu_memory()))
    } else {
        resolve_gpu_memory_service()
    };

    let mut controller = ControlLoop::new(headset, gpu_memory, config, ControlLoopConfig::default());

    if let Some(seconds) = args.duration {
        let handle = controller.handle();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            handle.shutdown();
        });
    }

    controller.run().context("controller stopped on an error")?;

    if let Some(status) = controller.status() {
        log::info!("Final status: {}", status);
    }
    log::info!("Resolution writes: {:?}", controls.writes());
    Ok(())
}
