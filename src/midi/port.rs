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
use midly::num::{u4, u7};
use tracing::{debug, info, span, Level};

use super::{
    error::SEND_PORT_CLOSED, message::ShortMessage, Backend, Connection, MidiError, OutputDevice,
};

/// The output port owns the single open connection to the selected device.
#[derive(Default)]
pub struct OutputPort {
    device: Option<OutputDevice>,
    connection: Option<Box<dyn Connection>>,
}

impl OutputPort {
    /// Creates a port with no device open.
    pub fn new() -> OutputPort {
        OutputPort::default()
    }

    /// Opens the given device. Any previously opened device is closed first.
    pub fn open(&mut self, backend: &dyn Backend, device: OutputDevice) -> Result<(), MidiError> {
        let span = span!(Level::INFO, "open output port");
        let _enter = span.enter();

        self.close();

        let connection = backend.connect(&device)?;
        info!(id = device.id, name = device.name, "Opened MIDI output.");
        self.connection = Some(connection);
        self.device = Some(device);
        Ok(())
    }

    /// Returns true if a device is currently open.
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// The currently open device, if any.
    pub fn device(&self) -> Option<&OutputDevice> {
        self.device.as_ref()
    }

    /// Sends a note on.
    pub fn send_note_on(&mut self, channel: u4, note: u7, velocity: u7) -> Result<(), MidiError> {
        self.send(ShortMessage::NoteOn {
            channel,
            note,
            velocity,
        })
    }

    /// Sends a note off with a release velocity of zero.
    pub fn send_note_off(&mut self, channel: u4, note: u7) -> Result<(), MidiError> {
        self.send(ShortMessage::NoteOff { channel, note })
    }

    fn send(&mut self, message: ShortMessage) -> Result<(), MidiError> {
        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => {
                return Err(MidiError::SendFailed {
                    code: SEND_PORT_CLOSED,
                    reason: "no MIDI output device is open".to_string(),
                })
            }
        };

        debug!(message = format!("{:?}", message), "Sending MIDI message.");
        connection.send(&message.to_bytes())
    }

    /// Closes the open device. Safe to call when nothing is open.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            if let Some(device) = self.device.take() {
                info!(id = device.id, name = device.name, "Closed MIDI output.");
            }
        }
        self.device = None;
    }
}

impl Drop for OutputPort {
    fn drop(&mut self) {
        self.close();
    }
}
