// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::fmt;

mod error;
pub mod message;
mod midir;
pub mod mock;
pub mod port;
pub mod selector;

pub use error::{MidiError, SEND_BACKEND_FAILURE, SEND_INVALID_DATA, SEND_PORT_CLOSED};
pub use port::OutputPort;
pub use selector::find_device;

/// An enumerated MIDI output endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDevice {
    /// The platform's index for the device.
    pub id: usize,
    /// The display name of the device.
    pub name: String,
}

impl OutputDevice {
    pub fn new(id: usize, name: &str) -> OutputDevice {
        OutputDevice {
            id,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.name)
    }
}

/// A source of MIDI output devices.
pub trait Backend: Send + Sync {
    /// Enumerates the available output devices in device index order.
    fn outputs(&self) -> Result<Vec<OutputDevice>, MidiError>;

    /// Opens a connection to the given device.
    fn connect(&self, device: &OutputDevice) -> Result<Box<dyn Connection>, MidiError>;
}

/// An open connection to an output device.
pub trait Connection: Send {
    /// Sends a raw MIDI message.
    fn send(&mut self, message: &[u8]) -> Result<(), MidiError>;

    /// Closes the connection.
    fn close(self: Box<Self>);
}

/// Lists output devices known to midir.
pub fn list_devices() -> Result<Vec<OutputDevice>, MidiError> {
    midir::Backend::new().outputs()
}

/// Gets the backend that serves the given device name. Names starting with
/// "mock" get an in-process mock device.
pub fn get_backend(name: &str) -> Box<dyn Backend> {
    if name.starts_with("mock") {
        return Box::new(mock::Backend::new(&[name]));
    }

    Box::new(midir::Backend::new())
}
