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
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::{MidiError, OutputDevice};

/// Shared state between a mock backend, its clones and its connections.
#[derive(Default)]
struct State {
    sent: Vec<Vec<u8>>,
    fail_code: Option<i32>,
    unavailable: bool,
    open_connections: usize,
    close_count: usize,
}

/// A mock backend. Doesn't actually talk to any hardware, but records what
/// would have been sent. Clones share the same recording.
#[derive(Clone)]
pub struct Backend {
    names: Vec<String>,
    state: Arc<Mutex<State>>,
}

impl Backend {
    /// Creates a mock backend with the given device names, in index order.
    pub fn new(names: &[&str]) -> Backend {
        Backend {
            names: names.iter().map(|name| name.to_string()).collect(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Gets every message sent through any connection, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    /// Forgets the messages sent so far.
    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Makes all sends fail with the given code until reset with None.
    pub fn fail_sends(&self, code: Option<i32>) {
        self.state.lock().fail_code = code;
    }

    /// Makes connecting to any device fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// The number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.state.lock().open_connections
    }

    /// The number of times a connection has been closed.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }
}

impl super::Backend for Backend {
    fn outputs(&self) -> Result<Vec<OutputDevice>, MidiError> {
        Ok(self
            .names
            .iter()
            .enumerate()
            .map(|(id, name)| OutputDevice::new(id, name))
            .collect())
    }

    fn connect(&self, device: &OutputDevice) -> Result<Box<dyn super::Connection>, MidiError> {
        let mut state = self.state.lock();
        if state.unavailable || self.names.get(device.id) != Some(&device.name) {
            return Err(MidiError::DeviceUnavailable {
                name: device.name.clone(),
                reason: "mock device is unavailable".to_string(),
            });
        }

        state.open_connections += 1;
        Ok(Box::new(Connection {
            name: device.name.clone(),
            state: self.state.clone(),
        }))
    }
}

/// A connection to a mock device.
struct Connection {
    name: String,
    state: Arc<Mutex<State>>,
}

impl super::Connection for Connection {
    fn send(&mut self, message: &[u8]) -> Result<(), MidiError> {
        let mut state = self.state.lock();
        if let Some(code) = state.fail_code {
            return Err(MidiError::SendFailed {
                code,
                reason: "mock send failure".to_string(),
            });
        }

        info!(
            device = self.name,
            message = format!("{:02x?}", message),
            "Mock MIDI send."
        );
        state.sent.push(message.to_vec());
        Ok(())
    }

    fn close(self: Box<Self>) {
        let mut state = self.state.lock();
        state.open_connections -= 1;
        state.close_count += 1;
    }
}
