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
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use soundpad::{audio, config, midi};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sound pad that records and plays back what you play."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Verifies a sound pad configuration by loading every sound.
    Verify {
        /// The path to the sound pad config.
        config_path: String,
    },
    /// Start will start the sound pad.
    Start {
        /// The path to the sound pad config.
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
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { config_path } => {
            let soundpad = config::Soundpad::deserialize(&PathBuf::from(&config_path))?;
            let sounds = config::load_sounds(&soundpad, soundpad.audio().sample_rate())?;

            let mut keys: Vec<&String> = sounds.keys().collect();
            keys.sort();
            println!("Sounds (count: {}):", sounds.len());
            for key in keys {
                println!("- {}: {}", key, sounds[key]);
            }
            println!("Flash duration: {:?}", soundpad.flash_duration()?);
        }
        Commands::Start { config_path } => {
            let (pad, mut controller) =
                config::init_pad_and_controller(&PathBuf::from(config_path))?;
            println!("{}", pad);

            let mut flashes = pad.subscribe();
            tokio::spawn(async move {
                loop {
                    match flashes.recv().await {
                        Ok(flash) => println!("{}", flash),
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "Missed flashes.")
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            });

            controller.join().await?;
        }
    }

    Ok(())
}
