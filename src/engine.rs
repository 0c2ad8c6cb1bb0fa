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

//! The trigger engine routes pad hits from the presentation layer to the pad
//! controllers and owns the output port they share.
//!
//! The engine is not thread safe. Triggers, configuration changes and timer
//! processing all come from a single event loop (see [`crate::controller`]).

use std::fmt;

use midly::num::u7;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{error, info, span, warn, Level};

use crate::midi::{find_device, Backend, MidiError, OutputDevice, OutputPort};
use crate::pad::{PadConfig, PadController, PAD_COUNT};
use crate::velocity::{HitPoint, Tiers, Zone};

/// Errors surfaced by the trigger engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("MIDI output device unavailable: {0}")]
    DeviceUnavailable(#[source] MidiError),

    #[error("pad {pad}: {source}")]
    SendFailed { pad: usize, source: MidiError },

    #[error("invalid pad {0}, pads are numbered 0 to {max}", max = PAD_COUNT - 1)]
    InvalidPad(usize),

    #[error("{field} value {value} is out of range (0-127)")]
    OutOfRange { field: &'static str, value: u8 },
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PadEvent {
    /// A pad sent its note on.
    Fired {
        pad: usize,
        note: u7,
        velocity: u7,
        zone: Zone,
    },
    /// A pad sent its note off, or gave up trying, and can fire again.
    Released { pad: usize },
}

impl fmt::Display for PadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadEvent::Fired {
                pad,
                note,
                velocity,
                zone,
            } => write!(
                f,
                "pad {} fired: note {}, velocity {} ({})",
                pad + 1,
                note.as_int(),
                velocity.as_int(),
                zone
            ),
            PadEvent::Released { pad } => write!(f, "pad {} released", pad + 1),
        }
    }
}

/// The facade the presentation layer drives.
pub struct TriggerEngine {
    backend: Box<dyn Backend>,
    port: OutputPort,
    pads: [PadController; PAD_COUNT],
    listeners: Vec<UnboundedSender<PadEvent>>,
}

impl TriggerEngine {
    /// Creates an engine with all pads idle and at their defaults. No device
    /// is open until [`TriggerEngine::initialize`] is called.
    pub fn new(backend: Box<dyn Backend>) -> TriggerEngine {
        TriggerEngine {
            backend,
            port: OutputPort::new(),
            pads: std::array::from_fn(PadController::new),
            listeners: Vec::new(),
        }
    }

    /// Selects the first output device whose name contains the given string
    /// and opens it.
    pub fn initialize(&mut self, device_name: &str) -> Result<OutputDevice, EngineError> {
        let span = span!(Level::INFO, "initialize");
        let _enter = span.enter();

        let device = find_device(self.backend.as_ref(), device_name)
            .map_err(EngineError::DeviceUnavailable)?;
        self.port
            .open(self.backend.as_ref(), device.clone())
            .map_err(EngineError::DeviceUnavailable)?;

        info!(device = device.name, "Trigger engine initialized.");
        Ok(device)
    }

    /// The open output device, if any.
    pub fn device(&self) -> Option<&OutputDevice> {
        self.port.device()
    }

    /// Triggers a pad. Triggering a pad that is still sounding does nothing
    /// and succeeds.
    pub fn trigger(&mut self, pad: usize, hit: Option<HitPoint>) -> Result<(), EngineError> {
        self.trigger_at(pad, hit, Instant::now())
    }

    fn trigger_at(
        &mut self,
        pad: usize,
        hit: Option<HitPoint>,
        now: Instant,
    ) -> Result<(), EngineError> {
        let controller = self.pads.get_mut(pad).ok_or(EngineError::InvalidPad(pad))?;

        let fired = match controller.trigger(hit.as_ref(), &mut self.port, now) {
            Ok(Some(fired)) => fired,
            Ok(None) => return Ok(()),
            Err(e) => {
                error!(pad, err = e.to_string(), "Unable to send note on.");
                return Err(EngineError::SendFailed { pad, source: e });
            }
        };

        self.publish(PadEvent::Fired {
            pad,
            note: fired.note,
            velocity: fired.velocity,
            zone: fired.zone,
        });
        Ok(())
    }

    /// Returns true while the pad's note is sounding. Unknown pads are never armed.
    pub fn is_armed(&self, pad: usize) -> bool {
        self.pads
            .get(pad)
            .is_some_and(|controller| controller.is_armed())
    }

    /// Sets a pad's note and velocity tiers. Nothing changes unless every
    /// value is valid.
    pub fn configure_pad(
        &mut self,
        pad: usize,
        note: u8,
        center: u8,
        mid: u8,
        edge: u8,
    ) -> Result<(), EngineError> {
        let controller = self.pads.get_mut(pad).ok_or(EngineError::InvalidPad(pad))?;

        let note = to_u7("note", note)?;
        let tiers = Tiers::new(
            to_u7("center velocity", center)?,
            to_u7("mid velocity", mid)?,
            to_u7("edge velocity", edge)?,
        );
        controller.configure(note, tiers);
        Ok(())
    }

    /// Sets a pad's display label.
    pub fn set_label(&mut self, pad: usize, label: &str) -> Result<(), EngineError> {
        self.pads
            .get_mut(pad)
            .ok_or(EngineError::InvalidPad(pad))?
            .set_label(label);
        Ok(())
    }

    /// Gets a pad's configuration.
    pub fn pad(&self, pad: usize) -> Result<&PadConfig, EngineError> {
        self.pads
            .get(pad)
            .map(|controller| controller.config())
            .ok_or(EngineError::InvalidPad(pad))
    }

    /// Subscribes to pad notifications.
    pub fn subscribe(&mut self) -> UnboundedReceiver<PadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    /// The earliest pending note off across all pads.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pads
            .iter()
            .filter_map(|controller| controller.deadline())
            .min()
    }

    /// Sends every note off that is due. All due pads go idle, and any send
    /// failures are returned.
    #[must_use]
    pub fn process_timers(&mut self, now: Instant) -> Vec<EngineError> {
        let mut released: Vec<usize> = Vec::new();
        let mut errors: Vec<EngineError> = Vec::new();

        for controller in self.pads.iter_mut() {
            if let Some(result) = controller.fire_if_due(&mut self.port, now) {
                released.push(controller.index());
                if let Err(e) = result {
                    errors.push(EngineError::SendFailed {
                        pad: controller.index(),
                        source: e,
                    });
                }
            }
        }

        for pad in released {
            self.publish(PadEvent::Released { pad });
        }
        errors
    }

    /// Sends a note off for every sounding pad, then closes the device. Calling
    /// this again does nothing.
    #[must_use]
    pub fn shutdown(&mut self) -> Vec<EngineError> {
        let span = span!(Level::INFO, "shutdown");
        let _enter = span.enter();

        let mut released: Vec<usize> = Vec::new();
        let mut errors: Vec<EngineError> = Vec::new();

        for controller in self.pads.iter_mut() {
            if let Some(result) = controller.release(&mut self.port) {
                released.push(controller.index());
                if let Err(e) = result {
                    warn!(
                        pad = controller.index(),
                        err = e.to_string(),
                        "Unable to send note off during shutdown."
                    );
                    errors.push(EngineError::SendFailed {
                        pad: controller.index(),
                        source: e,
                    });
                }
            }
        }

        if self.port.is_open() {
            info!(flushed = released.len(), "Shutting down trigger engine.");
        }
        self.port.close();

        for pad in released {
            self.publish(PadEvent::Released { pad });
        }
        errors
    }

    fn publish(&mut self, event: PadEvent) {
        // Listeners that have gone away are dropped.
        self.listeners.retain(|listener| listener.send(event.clone()).is_ok());
    }
}

impl Drop for TriggerEngine {
    fn drop(&mut self) {
        for e in self.shutdown() {
            error!(err = e.to_string(), "Error while shutting down.");
        }
    }
}

fn to_u7(field: &'static str, value: u8) -> Result<u7, EngineError> {
    u7::try_from(value).ok_or(EngineError::OutOfRange { field, value })
}

#[cfg(test)]
mod test {
    use midly::num::u7;
    use tokio::time::Instant;

    use crate::{
        midi::{mock, MidiError, SEND_PORT_CLOSED},
        pad::NOTE_DURATION,
        velocity::{HitPoint, Zone},
    };

    use super::{EngineError, PadEvent, TriggerEngine};

    fn setup(names: &[&str]) -> (mock::Backend, TriggerEngine) {
        let backend = mock::Backend::new(names);
        let mut engine = TriggerEngine::new(Box::new(backend.clone()));
        engine.initialize("Yoke").expect("unable to initialize");
        (backend, engine)
    }

    fn note_on(note: u8, velocity: u8) -> Vec<u8> {
        vec![0x90, note, velocity]
    }

    fn note_off(note: u8) -> Vec<u8> {
        vec![0x80, note, 0]
    }

    #[test]
    fn initialize_picks_first_match() {
        let (_, engine) = setup(&["Synth", "MIDI Yoke 1", "MIDI Yoke 2"]);
        let device = engine.device().expect("expected device");
        assert_eq!(1, device.id);
        assert_eq!("MIDI Yoke 1", device.name);
    }

    #[test]
    fn initialize_without_match() {
        let backend = mock::Backend::new(&["Synth", "Drum Brain"]);
        let mut engine = TriggerEngine::new(Box::new(backend));

        match engine.initialize("NoSuchDevice") {
            Err(EngineError::DeviceUnavailable(MidiError::NotFound { available, .. })) => {
                assert_eq!(vec!["Synth".to_string(), "Drum Brain".to_string()], available)
            }
            _ => panic!("expected device to be unavailable"),
        }
        assert!(engine.device().is_none());
    }

    #[test]
    fn initialize_with_unavailable_device() {
        let backend = mock::Backend::new(&["MIDI Yoke"]);
        backend.set_unavailable(true);
        let mut engine = TriggerEngine::new(Box::new(backend));
        assert!(matches!(
            engine.initialize("Yoke"),
            Err(EngineError::DeviceUnavailable(MidiError::DeviceUnavailable { .. }))
        ));
    }

    #[test]
    fn center_hit_round_trip() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        let mut events = engine.subscribe();
        let now = Instant::now();

        engine
            .trigger_at(0, Some(HitPoint::normalized(0.0, 0.0)), now)
            .expect("unable to trigger");
        assert!(engine.is_armed(0));
        assert_eq!(Some(now + NOTE_DURATION), engine.next_deadline());
        assert_eq!(vec![note_on(36, 127)], backend.sent());

        assert!(engine.process_timers(now + NOTE_DURATION).is_empty());
        assert!(!engine.is_armed(0));
        assert_eq!(None, engine.next_deadline());
        assert_eq!(vec![note_on(36, 127), note_off(36)], backend.sent());

        assert_eq!(
            Some(PadEvent::Fired {
                pad: 0,
                note: u7::from(36),
                velocity: u7::from(127),
                zone: Zone::Center,
            }),
            events.try_recv().ok()
        );
        assert_eq!(Some(PadEvent::Released { pad: 0 }), events.try_recv().ok());

        // The pad can fire again.
        engine
            .trigger_at(0, None, now + NOTE_DURATION)
            .expect("unable to trigger");
        assert_eq!(
            vec![note_on(36, 127), note_off(36), note_on(36, 80)],
            backend.sent()
        );
    }

    #[test]
    fn mid_hit_uses_configured_mid() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        engine
            .configure_pad(3, 50, 120, 66, 20)
            .expect("unable to configure");

        engine
            .trigger(3, Some(HitPoint::normalized(0.5, 0.0)))
            .expect("unable to trigger");
        assert_eq!(vec![note_on(50, 66)], backend.sent());
    }

    #[test]
    fn retrigger_is_a_no_op() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        let now = Instant::now();

        engine.trigger_at(5, None, now).expect("unable to trigger");
        let deadline = engine.next_deadline();

        engine
            .trigger_at(5, Some(HitPoint::normalized(0.0, 0.0)), now)
            .expect("retrigger should succeed");
        assert_eq!(vec![note_on(41, 80)], backend.sent());
        assert_eq!(deadline, engine.next_deadline());
        assert!(engine.is_armed(5));
    }

    #[test]
    fn pads_are_independent() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        let now = Instant::now();

        engine.trigger_at(0, None, now).expect("unable to trigger");
        engine
            .trigger_at(1, None, now + NOTE_DURATION / 2)
            .expect("unable to trigger");

        assert!(engine.process_timers(now + NOTE_DURATION).is_empty());
        assert!(!engine.is_armed(0));
        assert!(engine.is_armed(1));
        assert_eq!(Some(now + NOTE_DURATION * 3 / 2), engine.next_deadline());

        assert!(engine.process_timers(now + NOTE_DURATION * 2).is_empty());
        assert_eq!(
            vec![note_on(36, 80), note_on(37, 80), note_off(36), note_off(37)],
            backend.sent()
        );
    }

    #[test]
    fn send_failures() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        let mut events = engine.subscribe();
        let now = Instant::now();

        backend.fail_sends(Some(67));
        match engine.trigger_at(2, None, now) {
            Err(EngineError::SendFailed { pad, source }) => {
                assert_eq!(2, pad);
                assert_eq!(Some(67), source.send_code());
            }
            _ => panic!("expected send failure"),
        }
        assert!(!engine.is_armed(2));
        assert!(events.try_recv().is_err());

        backend.fail_sends(None);
        engine.trigger_at(2, None, now).expect("unable to trigger");

        backend.fail_sends(Some(67));
        let errors = engine.process_timers(now + NOTE_DURATION);
        assert_eq!(1, errors.len());
        assert!(!engine.is_armed(2));

        let _fired = events.try_recv();
        assert_eq!(Some(PadEvent::Released { pad: 2 }), events.try_recv().ok());
    }

    #[test]
    fn trigger_before_initialize() {
        let backend = mock::Backend::new(&["MIDI Yoke"]);
        let mut engine = TriggerEngine::new(Box::new(backend));

        match engine.trigger(0, None) {
            Err(EngineError::SendFailed { source, .. }) => {
                assert_eq!(Some(SEND_PORT_CLOSED), source.send_code())
            }
            _ => panic!("expected send failure"),
        }
        assert!(!engine.is_armed(0));
    }

    #[test]
    fn invalid_pad() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        assert!(matches!(
            engine.trigger(16, None),
            Err(EngineError::InvalidPad(16))
        ));
        assert!(matches!(
            engine.configure_pad(99, 36, 1, 2, 3),
            Err(EngineError::InvalidPad(99))
        ));
        assert!(matches!(
            engine.set_label(16, "Crash"),
            Err(EngineError::InvalidPad(16))
        ));
        assert!(!engine.is_armed(16));
        assert!(backend.sent().is_empty());
    }

    #[test]
    fn configure_out_of_range() {
        let (_, mut engine) = setup(&["MIDI Yoke"]);
        let before = engine.pad(4).expect("expected pad").clone();

        assert!(matches!(
            engine.configure_pad(4, 128, 100, 80, 40),
            Err(EngineError::OutOfRange {
                field: "note",
                value: 128
            })
        ));
        assert!(matches!(
            engine.configure_pad(4, 40, 100, 80, 255),
            Err(EngineError::OutOfRange {
                field: "edge velocity",
                value: 255
            })
        ));
        assert_eq!(&before, engine.pad(4).expect("expected pad"));

        engine
            .configure_pad(4, 0, 127, 0, 127)
            .expect("boundary values should be accepted");
        assert_eq!(u7::from(0), engine.pad(4).expect("expected pad").note);
    }

    #[test]
    fn configure_while_sounding_keeps_pending_note() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        let now = Instant::now();

        engine.trigger_at(7, None, now).expect("unable to trigger");
        engine
            .configure_pad(7, 70, 127, 80, 40)
            .expect("unable to configure");
        assert!(engine.process_timers(now + NOTE_DURATION).is_empty());

        engine
            .trigger_at(7, None, now + NOTE_DURATION)
            .expect("unable to trigger");
        assert_eq!(
            vec![note_on(43, 80), note_off(43), note_on(70, 80)],
            backend.sent()
        );
    }

    #[test]
    fn labels() {
        let (_, mut engine) = setup(&["MIDI Yoke"]);
        assert_eq!("3", engine.pad(2).expect("expected pad").label);
        engine.set_label(2, "Snare").expect("unable to set label");
        assert_eq!("Snare", engine.pad(2).expect("expected pad").label);
    }

    #[test]
    fn shutdown_flushes_once() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        let mut events = engine.subscribe();

        engine.trigger(0, None).expect("unable to trigger");
        engine.trigger(9, None).expect("unable to trigger");
        backend.clear_sent();

        assert!(engine.shutdown().is_empty());
        assert_eq!(vec![note_off(36), note_off(45)], backend.sent());
        assert!(!engine.is_armed(0));
        assert!(!engine.is_armed(9));
        assert_eq!(0, backend.open_connections());
        assert!(engine.device().is_none());

        assert!(engine.shutdown().is_empty());
        assert_eq!(vec![note_off(36), note_off(45)], backend.sent());
        assert_eq!(1, backend.close_count());

        let released: Vec<PadEvent> = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|event| matches!(event, PadEvent::Released { .. }))
            .collect();
        assert_eq!(
            vec![PadEvent::Released { pad: 0 }, PadEvent::Released { pad: 9 }],
            released
        );
    }

    #[test]
    fn shutdown_surfaces_failures() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        engine.trigger(1, None).expect("unable to trigger");

        backend.fail_sends(Some(67));
        let errors = engine.shutdown();
        assert!(matches!(
            errors.as_slice(),
            [EngineError::SendFailed { pad: 1, .. }]
        ));
        assert!(!engine.is_armed(1));
        assert_eq!(0, backend.open_connections());
    }

    #[test]
    fn drop_flushes() {
        let (backend, mut engine) = setup(&["MIDI Yoke"]);
        engine.trigger(0, None).expect("unable to trigger");

        drop(engine);
        assert_eq!(vec![note_on(36, 80), note_off(36)], backend.sent());
        assert_eq!(0, backend.open_connections());
    }

    #[test]
    fn event_display() {
        assert_eq!(
            "pad 1 fired: note 36, velocity 127 (center)",
            PadEvent::Fired {
                pad: 0,
                note: u7::from(36),
                velocity: u7::from(127),
                zone: Zone::Center,
            }
            .to_string()
        );
        assert_eq!("pad 16 released", PadEvent::Released { pad: 15 }.to_string());
    }
}
