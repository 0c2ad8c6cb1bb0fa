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

/// Send failure code for data the backend refused to transmit.
pub const SEND_INVALID_DATA: i32 = 1;

/// Send failure code for errors reported by the driver.
pub const SEND_BACKEND_FAILURE: i32 = 2;

/// Send failure code for sends attempted while no device is open.
pub const SEND_PORT_CLOSED: i32 = 3;

/// Errors raised while selecting, opening and talking to MIDI output devices.
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error(
        "no MIDI output device matching '{target}' found (available: {})",
        .available.join(", ")
    )]
    NotFound {
        target: String,
        available: Vec<String>,
    },

    #[error("MIDI output device '{name}' is unavailable: {reason}")]
    DeviceUnavailable { name: String, reason: String },

    #[error("MIDI send failed with code {code}: {reason}")]
    SendFailed { code: i32, reason: String },

    #[error("MIDI backend error: {0}")]
    Backend(String),
}

impl MidiError {
    /// Gets the failure code if this is a send failure.
    pub fn send_code(&self) -> Option<i32> {
        match self {
            MidiError::SendFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
