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
use std::{io, sync::Arc};

use midly::{live::LiveEvent, MidiMessage};
use tokio::{
    sync::mpsc::{self, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, span, Level};

use super::Event;
use crate::midi::Device;

/// A controller that drives a session using MIDI. Pads map MIDI events to keys,
/// control events map to commands.
pub struct Driver {
    /// The MIDI device.
    midi_device: Arc<dyn Device>,
    /// The MIDI event to look for to start recording.
    record: LiveEvent<'static>,
    /// The MIDI event to look for to stop recording and playback.
    stop: LiveEvent<'static>,
    /// The MIDI event to look for to play or resume.
    play: LiveEvent<'static>,
    /// The MIDI event to look for to pause playback.
    pause: LiveEvent<'static>,
    /// MIDI events that trigger pads, with the key of each pad.
    pads: Arc<Vec<(LiveEvent<'static>, String)>>,
}

impl Driver {
    pub fn new(
        midi_device: Arc<dyn Device>,
        record: LiveEvent<'static>,
        stop: LiveEvent<'static>,
        play: LiveEvent<'static>,
        pause: LiveEvent<'static>,
        pads: Vec<(LiveEvent<'static>, String)>,
    ) -> Driver {
        Driver {
            midi_device,
            record,
            stop,
            play,
            pause,
            pads: Arc::new(pads),
        }
    }
}

/// Returns true if the incoming event matches the configured one. Note ons and control
/// changes match on channel and key or controller, regardless of velocity or value, as
/// long as the velocity or value is non-zero. A note on with zero velocity is a release.
fn matches(expected: &LiveEvent, actual: &LiveEvent) -> bool {
    match (expected, actual) {
        (
            LiveEvent::Midi {
                channel: expected_channel,
                message: MidiMessage::NoteOn { key: expected_key, .. },
            },
            LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        ) => expected_channel == channel && expected_key == key && vel.as_int() > 0,
        (
            LiveEvent::Midi {
                channel: expected_channel,
                message:
                    MidiMessage::Controller {
                        controller: expected_controller,
                        ..
                    },
            },
            LiveEvent::Midi {
                channel,
                message: MidiMessage::Controller { controller, value },
            },
        ) => {
            expected_channel == channel && expected_controller == controller && value.as_int() > 0
        }
        _ => expected == actual,
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let (midi_events_tx, mut midi_events_rx) = mpsc::channel::<Vec<u8>>(10);
        let device = self.midi_device.clone();
        let record = self.record;
        let stop = self.stop;
        let play = self.play;
        let pause = self.pause;
        let pads = self.pads.clone();

        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "MIDI driver");
            let _enter = span.enter();

            info!(device = device.name(), "MIDI driver started.");

            if let Err(e) = device.watch_events(midi_events_tx) {
                error!(err = e.to_string(), "Error watching MIDI events");
            }
        });

        let device = self.midi_device.clone();
        tokio::spawn(async move {
            loop {
                let raw_event = match midi_events_rx.recv().await {
                    Some(raw_event) => raw_event,
                    None => {
                        info!("MIDI watcher closed.");
                        device.stop_watch_events();
                        return Ok(());
                    }
                };

                let event = match LiveEvent::parse(&raw_event) {
                    Ok(event) => event,
                    Err(e) => {
                        error!(err = format!("{:?}", e), "Error parsing event.");
                        continue;
                    }
                };

                let controller_event = if let Some((_, key)) =
                    pads.iter().find(|(pad, _)| matches(pad, &event))
                {
                    Event::Trigger(key.clone())
                } else if matches(&record, &event) {
                    Event::Record
                } else if matches(&stop, &event) {
                    Event::Stop
                } else if matches(&play, &event) {
                    Event::Play
                } else if matches(&pause, &event) {
                    Event::Pause
                } else {
                    debug!(event = format!("{:?}", event), "Ignoring unmapped event.");
                    continue;
                };

                if events_tx.send(controller_event).await.is_err() {
                    info!("Controller closed.");
                    device.stop_watch_events();
                    return Ok(());
                }
            }
        })
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, sync::Arc};

    use midly::live::LiveEvent;
    use tokio::sync::mpsc;

    use crate::{
        config::{self, midi::ToMidiEvent},
        controller::{Driver as _, Event},
        midi,
        testutil::eventually_async,
    };

    fn to_bytes(event: &LiveEvent) -> Result<Vec<u8>, Box<dyn Error>> {
        let mut buf: Vec<u8> = Vec::with_capacity(8);
        event.write(&mut buf)?;
        Ok(buf)
    }

    #[test]
    fn test_matches_ignores_velocity() -> Result<(), Box<dyn Error>> {
        let expected = config::midi::note_on(10, 36, 127).to_midi_event()?;
        assert!(super::matches(
            &expected,
            &config::midi::note_on(10, 36, 12).to_midi_event()?
        ));
        assert!(!super::matches(
            &expected,
            &config::midi::note_on(10, 36, 0).to_midi_event()?
        ));
        assert!(!super::matches(
            &expected,
            &config::midi::note_on(11, 36, 127).to_midi_event()?
        ));
        assert!(!super::matches(
            &expected,
            &config::midi::note_on(10, 37, 127).to_midi_event()?
        ));

        let expected = config::midi::control_change(1, 20, 127).to_midi_event()?;
        assert!(super::matches(
            &expected,
            &config::midi::control_change(1, 20, 1).to_midi_event()?
        ));
        assert!(!super::matches(
            &expected,
            &config::midi::control_change(1, 20, 0).to_midi_event()?
        ));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_midi_controller() -> Result<(), Box<dyn Error>> {
        let record_event = config::midi::note_on(16, 0, 127).to_midi_event()?;
        let stop_event = config::midi::note_on(16, 1, 127).to_midi_event()?;
        let play_event = config::midi::note_on(16, 2, 127).to_midi_event()?;
        let pause_event = config::midi::note_on(16, 3, 127).to_midi_event()?;
        let pad_event = config::midi::note_on(10, 36, 127).to_midi_event()?;

        let unrecognized_buf = to_bytes(&LiveEvent::Midi {
            channel: 15.into(),
            message: midly::MidiMessage::ProgramChange { program: 27.into() },
        })?;
        let invalid_buf: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8];

        let midi_device = Arc::new(midi::test::Device::get("mock-midi-device"));
        let driver = super::Driver::new(
            midi_device.clone(),
            record_event,
            stop_event,
            play_event,
            pause_event,
            vec![(pad_event, "A".to_string())],
        );

        let (events_tx, mut events_rx) = mpsc::channel::<Event>(16);
        let join_handle = driver.monitor_events(events_tx);

        let device = midi_device.clone();
        eventually_async(
            || {
                let device = device.clone();
                async move { device.is_watching() }
            },
            "MIDI device was never watched",
        )
        .await;

        // Invalid and unrecognized events should have no impact.
        midi_device.mock_event(&invalid_buf).await;
        midi_device.mock_event(&unrecognized_buf).await;
        midi_device
            .mock_event(&to_bytes(&config::midi::note_on(10, 36, 64).to_midi_event()?)?)
            .await;
        midi_device.mock_event(&to_bytes(&record_event)?).await;
        midi_device.mock_event(&to_bytes(&stop_event)?).await;
        midi_device.mock_event(&unrecognized_buf).await;
        midi_device.mock_event(&to_bytes(&play_event)?).await;
        midi_device.mock_event(&to_bytes(&pause_event)?).await;

        assert_eq!(Some(Event::Trigger("A".to_string())), events_rx.recv().await);
        assert_eq!(Some(Event::Record), events_rx.recv().await);
        assert_eq!(Some(Event::Stop), events_rx.recv().await);
        assert_eq!(Some(Event::Play), events_rx.recv().await);
        assert_eq!(Some(Event::Pause), events_rx.recv().await);

        // Closing the controller side stops the watcher.
        drop(events_rx);
        midi_device.mock_event(&to_bytes(&play_event)?).await;
        assert!(join_handle.await?.is_ok());
        assert!(!midi_device.is_watching());

        Ok(())
    }
}
