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
use std::error::Error;
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{error, info, span, Level};

use crate::engine::TriggerEngine;
use crate::velocity::HitPoint;

pub mod keyboard;

/// Controller events that drive the trigger engine.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Triggers the pad at the given index, optionally at a position on it.
    Trigger { pad: usize, hit: Option<HitPoint> },

    /// Stops the board. Sounding pads are silenced before the device closes.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Runs the board's event loop. Driver events and note off timers are handled
/// one at a time, so the engine never sees concurrent calls.
pub struct Controller {
    engine: TriggerEngine,
    driver: Arc<dyn Driver>,
}

impl Controller {
    /// Creates a new controller with the given engine and driver.
    pub fn new(engine: TriggerEngine, driver: Arc<dyn Driver>) -> Controller {
        Controller { engine, driver }
    }

    /// Runs until the driver asks to quit or stops sending events, then shuts
    /// the engine down.
    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = self.driver.monitor_events(events_tx);

        info!(device = ?self.engine.device(), "Controller started.");

        loop {
            let deadline = self.engine.next_deadline();

            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(Event::Trigger { pad, hit }) => {
                        if let Err(e) = self.engine.trigger(pad, hit) {
                            error!(err = e.to_string(), "Error triggering pad.");
                        }
                    }
                    Some(Event::Quit) => {
                        info!("Quit requested.");
                        break;
                    }
                    None => {
                        info!("Driver closed.");
                        break;
                    }
                },
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    for e in self.engine.process_timers(Instant::now()) {
                        error!(err = e.to_string(), "Error sending note off.");
                    }
                }
            }
        }

        for e in self.engine.shutdown() {
            error!(err = e.to_string(), "Error silencing pad.");
        }

        // The driver notices the closed channel the next time it sends.
        drop(events_rx);
        match join_handle.await? {
            Ok(()) => {}
            Err(e) => error!(err = e.to_string(), "Driver stopped with an error."),
        }

        info!("Controller closing.");
        Ok(())
    }
}
