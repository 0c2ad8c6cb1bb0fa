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

//! Encoding of the short channel messages the board sends.

use midly::num::{u4, u7};

/// A three byte MIDI channel message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortMessage {
    NoteOn { channel: u4, note: u7, velocity: u7 },
    NoteOff { channel: u4, note: u7 },
}

impl ShortMessage {
    /// The status byte, which combines the message kind with the channel.
    pub fn status(&self) -> u8 {
        match self {
            ShortMessage::NoteOn { channel, .. } => 0x90 | channel.as_int(),
            ShortMessage::NoteOff { channel, .. } => 0x80 | channel.as_int(),
        }
    }

    /// The message as it goes out on the wire: status, note, velocity.
    /// Note offs are always sent with a release velocity of zero.
    pub fn to_bytes(&self) -> [u8; 3] {
        match self {
            ShortMessage::NoteOn { note, velocity, .. } => {
                [self.status(), note.as_int(), velocity.as_int()]
            }
            ShortMessage::NoteOff { note, .. } => [self.status(), note.as_int(), 0],
        }
    }
}
