// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use clap::{crate_version, Parser, Subcommand};
use padtrim::audio;
use padtrim::config;
use padtrim::controller::{keyboard, Controller};
use padtrim::sample::Sample;
use padtrim::samples::{LoadEvent, SampleLoader};
use padtrim::sampler::{self, Sampler, SamplerEvent};
use padtrim::visualizer::{RefreshLoop, Visualizer};
use padtrim::waveform::PeakReducer;
use parking_lot::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_PEAKS_WIDTH: u32 = 800;
const DEFAULT_PEAKS_HEIGHT: u32 = 200;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A pad sampler with trimmable samples."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Decodes a file and prints its waveform peaks as JSON.
    Peaks {
        /// The audio file to decode.
        file: String,
        /// The number of peaks to compute.
        #[arg[short, long, default_value_t = DEFAULT_PEAKS_WIDTH]]
        width: u32,
        /// Also render the waveform as an SVG file to this path.
        #[arg[short, long]]
        svg: Option<String>,
    },
    /// Loads every pad of a bank and reports which loaded.
    Verify {
        /// The path to the bank file.
        bank_path: String,
    },
    /// Starts the sampler, reading commands from the keyboard.
    Start {
        /// The path to the sampler config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Peaks { file, width, svg } => peaks(&file, width, svg.as_deref())?,
        Commands::Verify { bank_path } => verify(&PathBuf::from(bank_path)).await?,
        Commands::Start { config_path } => start(&PathBuf::from(config_path)).await?,
    }

    Ok(())
}

fn peaks(file: &str, width: u32, svg: Option<&str>) -> Result<(), Box<dyn Error>> {
    let audio = SampleLoader::new(None).load(file, |percent| debug!(percent, "Decoding"))?;
    let peaks = PeakReducer::new().reduce(&audio, width as usize);
    let output = serde_json::json!({
        "file": file,
        "channels": audio.channel_count(),
        "sample_rate": audio.sample_rate(),
        "duration_seconds": audio.duration_seconds(),
        "peaks": peaks,
    });

    if let Some(svg) = svg {
        let mut sample = Sample::new(0, file, file);
        sample.mark_loaded(audio)?;
        let mut visualizer =
            Visualizer::new(width, DEFAULT_PEAKS_HEIGHT, 0.0, PeakReducer::new());
        visualizer.load(&sample);
        fs::write(svg, visualizer.to_svg())?;
        info!(path = svg, "Wrote waveform");
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn verify(bank_path: &Path) -> Result<(), Box<dyn Error>> {
    let bank = config::Bank::deserialize(bank_path)?;
    let loader = SampleLoader::new(None).with_base_path(bank.base_path());

    println!("Bank {}:", bank.name());
    let loaded = loader
        .load_bank(bank.name(), bank.entries(), |event| {
            if let LoadEvent::Settled { sample, error } = event {
                match error {
                    None => println!(
                        "- {:>2} {}: {} channels, {} Hz, {:.3}s",
                        sample.index(),
                        sample.display_name(),
                        sample.channel_count(),
                        sample.sample_rate_hz(),
                        sample.duration_seconds()
                    ),
                    Some(e) => println!(
                        "- {:>2} {}: failed: {}",
                        sample.index(),
                        sample.display_name(),
                        e
                    ),
                }
            }
        })
        .await;
    println!("{}", loaded.summary());
    Ok(())
}

async fn start(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = config::Sampler::deserialize(config_path)?;
    let bank = config::Bank::deserialize(&config.bank_path())?;
    let device = audio::get_device(config.audio())?;
    info!(device = %device, "Using output device");

    let mut sampler = Sampler::new(
        device.clone(),
        Visualizer::from_config(config.visualizer()),
    );
    sampler.set_master_volume(config.audio().master_volume());
    let events = sampler.subscribe();
    let sampler = Arc::new(Mutex::new(sampler));

    thread::spawn(move || {
        for event in events.iter() {
            match event {
                SamplerEvent::LoadProgress { .. } => debug!(event = ?event, "Sampler event"),
                event => info!(event = ?event, "Sampler event"),
            }
        }
    });

    let loader = SampleLoader::new(Some(device.sample_rate())).with_base_path(bank.base_path());
    let loading = {
        let sampler = sampler.clone();
        let name = bank.name().to_string();
        let entries = bank.entries();
        tokio::spawn(async move {
            let summary = sampler::load_bank(&sampler, &loader, &name, entries).await;
            info!(bank = %name, summary = %summary, "Ready");
        })
    };

    let refresh = {
        let sampler = sampler.clone();
        RefreshLoop::spawn(config.visualizer().refresh_interval()?, move || {
            sampler.lock().tick()
        })
    };

    Controller::new(sampler.clone(), Arc::new(keyboard::Driver::new()))
        .join()
        .await?;

    refresh.stop();
    loading.abort();
    sampler.lock().stop_all();
    Ok(())
}
