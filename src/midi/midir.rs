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
use midir::{MidiOutput, MidiOutputConnection, SendError};
use tracing::{info, span, warn, Level};

use super::{MidiError, OutputDevice, SEND_BACKEND_FAILURE, SEND_INVALID_DATA};

/// Output devices provided by the platform through midir.
pub struct Backend {}

impl Backend {
    pub fn new() -> Backend {
        Backend {}
    }
}

fn new_output(client_name: &str) -> Result<MidiOutput, MidiError> {
    MidiOutput::new(client_name).map_err(|e| MidiError::Backend(e.to_string()))
}

impl super::Backend for Backend {
    fn outputs(&self) -> Result<Vec<OutputDevice>, MidiError> {
        let output = new_output("padboard output listing")?;

        // Devices whose capabilities can't be read are left out of the listing.
        Ok(output
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(id, port)| match output.port_name(port) {
                Ok(name) => Some(OutputDevice::new(id, &name)),
                Err(e) => {
                    warn!(id, err = e.to_string(), "Unable to read MIDI output name.");
                    None
                }
            })
            .collect())
    }

    fn connect(&self, device: &OutputDevice) -> Result<Box<dyn super::Connection>, MidiError> {
        let span = span!(Level::INFO, "connect (midir)");
        let _enter = span.enter();

        let output = new_output("padboard output")?;
        let ports = output.ports();

        // The index is only trusted if the same device is still sitting at it.
        let port = ports
            .get(device.id)
            .filter(|port| {
                output
                    .port_name(port)
                    .is_ok_and(|name| name == device.name)
            })
            .ok_or_else(|| MidiError::DeviceUnavailable {
                name: device.name.clone(),
                reason: format!("device is no longer present at index {}", device.id),
            })?;

        let connection = output
            .connect(port, "padboard")
            .map_err(|e| MidiError::DeviceUnavailable {
                name: device.name.clone(),
                reason: e.to_string(),
            })?;

        info!(device = device.name, "Connected to MIDI output.");

        Ok(Box::new(Connection {
            name: device.name.clone(),
            connection,
        }))
    }
}

/// An open midir output connection.
struct Connection {
    name: String,
    connection: MidiOutputConnection,
}

impl super::Connection for Connection {
    fn send(&mut self, message: &[u8]) -> Result<(), MidiError> {
        self.connection.send(message).map_err(|e| match e {
            SendError::InvalidData(reason) => MidiError::SendFailed {
                code: SEND_INVALID_DATA,
                reason: reason.to_string(),
            },
            other => MidiError::SendFailed {
                code: SEND_BACKEND_FAILURE,
                reason: other.to_string(),
            },
        })
    }

    fn close(self: Box<Self>) {
        let Connection { name, connection } = *self;
        // Dropping the returned output releases the client.
        let _ = connection.close();
        info!(device = name, "Disconnected from MIDI output.");
    }
}
