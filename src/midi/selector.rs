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
use tracing::{debug, info, span, Level};

use super::{Backend, MidiError, OutputDevice};

/// Finds the first output device, in device index order, whose name contains
/// the given target. If nothing matches, the error carries every enumerated
/// device name so the caller can show what is available.
pub fn find_device(backend: &dyn Backend, target: &str) -> Result<OutputDevice, MidiError> {
    let span = span!(Level::INFO, "find device");
    let _enter = span.enter();

    let devices = backend.outputs()?;
    for device in devices.iter() {
        debug!(id = device.id, name = device.name, "Found MIDI output device.");
    }

    match devices.iter().find(|device| device.name.contains(target)) {
        Some(device) => {
            info!(
                id = device.id,
                name = device.name,
                pattern = target,
                "Selected MIDI output device."
            );
            Ok(device.clone())
        }
        None => Err(MidiError::NotFound {
            target: target.to_string(),
            available: devices.into_iter().map(|device| device.name).collect(),
        }),
    }
}
