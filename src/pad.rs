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

//! The per-pad trigger state machine.
//!
//! A pad is either idle or sounding. Triggering an idle pad sends a note on and
//! arms a note off for [`NOTE_DURATION`] later. Triggering a sounding pad is
//! dropped, so every pad has at most one note outstanding at a time.

use std::time::Duration;

use midly::num::{u4, u7};
use tokio::time::Instant;
use tracing::debug;

use crate::midi::{MidiError, OutputPort};
use crate::velocity::{self, HitPoint, Tiers, Zone};

/// The number of pads on the board.
pub const PAD_COUNT: usize = 16;

/// How long a note sounds before its note off is sent.
pub const NOTE_DURATION: Duration = Duration::from_millis(100);

/// The note assigned to the first pad. Following pads count up from here.
pub const BASE_NOTE: u8 = 36;

/// All pads send on the first MIDI channel.
const CHANNEL: u8 = 0;

/// The configuration of a single pad.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PadConfig {
    /// The note the pad sends.
    pub note: u7,
    /// The velocities for each hit zone.
    pub tiers: Tiers,
    /// The display label of the pad.
    pub label: String,
}

impl PadConfig {
    /// The default configuration for the pad at the given index.
    pub fn default_for(index: usize) -> PadConfig {
        PadConfig {
            note: u7::from(BASE_NOTE.saturating_add(index as u8)),
            tiers: Tiers::default(),
            label: (index + 1).to_string(),
        }
    }
}

/// A note off waiting to be sent. The note and channel are captured when the
/// note on goes out, so later configuration changes don't affect it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingNoteOff {
    pub channel: u4,
    pub note: u7,
    pub deadline: Instant,
}

/// The state of a pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadState {
    Idle,
    Sounding(PendingNoteOff),
}

/// A note on that was sent as the result of a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired {
    pub note: u7,
    pub velocity: u7,
    pub zone: Zone,
}

/// Owns the state of one pad.
pub struct PadController {
    index: usize,
    config: PadConfig,
    state: PadState,
}

impl PadController {
    /// Creates an idle controller with the default configuration.
    pub fn new(index: usize) -> PadController {
        PadController {
            index,
            config: PadConfig::default_for(index),
            state: PadState::Idle,
        }
    }

    /// The index of the pad on the board.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The current configuration.
    pub fn config(&self) -> &PadConfig {
        &self.config
    }

    /// Changes the note and velocities. A pending note off is unaffected.
    pub fn configure(&mut self, note: u7, tiers: Tiers) {
        self.config.note = note;
        self.config.tiers = tiers;
    }

    /// Changes the display label.
    pub fn set_label(&mut self, label: &str) {
        self.config.label = label.to_string();
    }

    pub fn state(&self) -> PadState {
        self.state
    }

    /// Returns true while the pad's note is sounding.
    pub fn is_armed(&self) -> bool {
        matches!(self.state, PadState::Sounding(_))
    }

    /// When the pending note off is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PadState::Sounding(pending) => Some(pending.deadline),
            PadState::Idle => None,
        }
    }

    /// Triggers the pad. Returns None if the pad was already sounding, in which
    /// case nothing is sent. If the note on can't be sent the pad stays idle.
    pub fn trigger(
        &mut self,
        hit: Option<&HitPoint>,
        port: &mut OutputPort,
        now: Instant,
    ) -> Result<Option<Fired>, MidiError> {
        if self.is_armed() {
            debug!(pad = self.index, "Pad is still sounding, ignoring trigger.");
            return Ok(None);
        }

        let (velocity, zone) = velocity::compute_velocity(hit, &self.config.tiers);
        let channel = u4::from(CHANNEL);
        let note = self.config.note;

        port.send_note_on(channel, note, velocity)?;
        self.state = PadState::Sounding(PendingNoteOff {
            channel,
            note,
            deadline: now + NOTE_DURATION,
        });

        Ok(Some(Fired {
            note,
            velocity,
            zone,
        }))
    }

    /// Sends the pending note off if it's due. Returns None if nothing was due.
    pub fn fire_if_due(
        &mut self,
        port: &mut OutputPort,
        now: Instant,
    ) -> Option<Result<(), MidiError>> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.release(port),
            _ => None,
        }
    }

    /// Sends the pending note off immediately and cancels its timer. Returns
    /// None if the pad was idle. The pad is idle afterwards even if the send
    /// failed; the note off is never retried.
    pub fn release(&mut self, port: &mut OutputPort) -> Option<Result<(), MidiError>> {
        let pending = match self.state {
            PadState::Sounding(pending) => pending,
            PadState::Idle => return None,
        };

        let result = port.send_note_off(pending.channel, pending.note);
        self.state = PadState::Idle;
        Some(result)
    }
}
