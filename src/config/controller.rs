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
use std::{collections::HashMap, error::Error};

use midly::live::LiveEvent;
use serde::Deserialize;

use super::midi::{self, ToMidiEvent};

/// Allows users to specify various controllers.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Controller {
    #[default]
    Keyboard,
    Midi(MidiController),
    Multi(HashMap<String, Controller>),
}

/// The configuration that maps MIDI events to control surface commands. Pads are mapped
/// per sound.
#[derive(Deserialize, Clone, Debug)]
pub struct MidiController {
    /// The MIDI event to look for to start recording.
    record: midi::Event,
    /// The MIDI event to look for to stop recording and playback.
    stop: midi::Event,
    /// The MIDI event to look for to play or resume the recording.
    play: midi::Event,
    /// The MIDI event to look for to pause playback.
    pause: midi::Event,
}

impl MidiController {
    #[cfg(test)]
    pub fn new(
        record: midi::Event,
        stop: midi::Event,
        play: midi::Event,
        pause: midi::Event,
    ) -> MidiController {
        MidiController {
            record,
            stop,
            play,
            pause,
        }
    }

    /// Gets the record event.
    pub fn record(&self) -> Result<LiveEvent<'static>, Box<dyn Error>> {
        self.record.to_midi_event()
    }

    /// Gets the stop event.
    pub fn stop(&self) -> Result<LiveEvent<'static>, Box<dyn Error>> {
        self.stop.to_midi_event()
    }

    /// Gets the play event.
    pub fn play(&self) -> Result<LiveEvent<'static>, Box<dyn Error>> {
        self.play.to_midi_event()
    }

    /// Gets the pause event.
    pub fn pause(&self) -> Result<LiveEvent<'static>, Box<dyn Error>> {
        self.pause.to_midi_event()
    }
}
