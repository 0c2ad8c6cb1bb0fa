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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::{pad::PAD_COUNT, velocity::HitPoint};

const QUIT: &str = "quit";

/// A driver that triggers pads from lines typed on the keyboard. Each line is
/// a pad number counted from 1, optionally followed by a normalized x and y
/// position on the pad.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and forwards one command. Returns false once input is exhausted
    /// or the user has quit.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Pad (1-{}) [x y], or {}: ", PAD_COUNT, QUIT)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let event = match parse_command(&input) {
            Some(event) => event,
            None => {
                if !input.trim().is_empty() {
                    warn!(input = input.trim(), "Unrecognized input");
                }
                return Ok(true);
            }
        };

        let keep_going = event != Event::Quit;
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(keep_going)
    }
}

/// Parses a command line into an event.
fn parse_command(input: &str) -> Option<Event> {
    let mut parts = input.split_whitespace();
    let first = parts.next()?;
    if first.eq_ignore_ascii_case(QUIT) {
        return Some(Event::Quit);
    }

    let number: usize = first.parse().ok()?;
    let pad = number.checked_sub(1)?;
    let coordinates = parts
        .map(|part| part.parse::<f32>())
        .collect::<Result<Vec<f32>, _>>()
        .ok()?;

    let hit = match coordinates.as_slice() {
        [] => None,
        [x, y] => Some(HitPoint::normalized(*x, *y)),
        _ => return None,
    };

    Some(Event::Trigger { pad, hit })
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}
