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
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use padboard::config::Board;
use padboard::controller::{keyboard, Controller};
use padboard::engine::TriggerEngine;
use padboard::midi;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A virtual drum pad board that plays through a MIDI output."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI output devices.
    Devices {},
    /// Starts the pad board, reading pad hits from the keyboard.
    Start {
        /// The path to the board config.
        #[arg[short, long]]
        config: Option<String>,
        /// A substring of the MIDI output device name. Overrides the config.
        #[arg[short, long]]
        device: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
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
        Commands::Start { config, device } => {
            let board = match config {
                Some(path) => Board::deserialize(&PathBuf::from(path))?,
                None => Board::default(),
            };
            let device = device.unwrap_or_else(|| board.device().to_string());

            let mut engine = TriggerEngine::new(midi::get_backend(&device));
            let output = engine.initialize(&device)?;
            board.apply(&mut engine)?;
            println!("Playing through {}.", output);

            let mut events = engine.subscribe();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    println!("{}", event);
                }
            });

            Controller::new(engine, Arc::new(keyboard::Driver::new()))
                .run()
                .await?;
        }
    }

    Ok(())
}
