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
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::engine::{EngineError, TriggerEngine};

mod error;

pub use error::ConfigError;

/// The device searched for when the configuration doesn't name one.
pub const DEFAULT_DEVICE: &str = "MIDI Yoke";

/// The configuration for the whole board.
#[derive(Deserialize, Default)]
pub struct Board {
    /// A substring of the MIDI output device name.
    device: Option<String>,

    /// Per pad overrides. Pads that aren't listed keep their defaults.
    #[serde(default)]
    pads: Vec<Pad>,
}

/// Overrides for a single pad. Missing fields keep the pad's current value.
#[derive(Deserialize)]
pub struct Pad {
    /// The index of the pad, starting from 0.
    pad: usize,
    note: Option<u8>,
    center: Option<u8>,
    mid: Option<u8>,
    edge: Option<u8>,
    label: Option<String>,
}

impl Board {
    /// Parse a board from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Board, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Board>()?)
    }

    /// Parse a board from a YAML string.
    pub fn parse(yaml: &str) -> Result<Board, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Board>()?)
    }

    /// The device substring to search for.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Applies the pad overrides to the engine. Stops at the first invalid
    /// entry; entries before it stay applied.
    pub fn apply(&self, engine: &mut TriggerEngine) -> Result<(), EngineError> {
        for pad in self.pads.iter() {
            let current = engine.pad(pad.pad)?;
            let note = pad.note.unwrap_or(current.note.as_int());
            let center = pad.center.unwrap_or(current.tiers.center.as_int());
            let mid = pad.mid.unwrap_or(current.tiers.mid.as_int());
            let edge = pad.edge.unwrap_or(current.tiers.edge.as_int());

            engine.configure_pad(pad.pad, note, center, mid, edge)?;
            if let Some(label) = &pad.label {
                engine.set_label(pad.pad, label)?;
            }

            info!(
                pad = pad.pad,
                note,
                center,
                mid,
                edge,
                "Configured pad."
            );
        }
        Ok(())
    }
}
