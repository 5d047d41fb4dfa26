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
use std::{collections::HashMap, error::Error, path::Path, sync::Arc};

use midly::live::LiveEvent;
use tracing::info;

use crate::{
    audio::Sound,
    controller::Session,
    engine::Engine,
    pad::Pad,
    scheduler::{SystemClock, TokioScheduler},
};

use self::midi::ToMidiEvent;

mod audio;
pub mod controller;
mod error;
pub mod midi;
mod pad;

pub use self::audio::Audio;
pub use self::controller::{Controller, MidiController};
pub use self::error::ConfigError;
pub use self::midi::Midi;
pub use self::pad::{SoundConfig, Soundpad};

/// Decodes every sound in the configuration at the given sample rate, keyed by
/// normalized key.
pub fn load_sounds(
    soundpad: &Soundpad,
    sample_rate: u32,
) -> Result<HashMap<String, Arc<Sound>>, Box<dyn Error>> {
    soundpad.check_files()?;

    let mut sounds = HashMap::new();
    for sound_config in soundpad.sounds() {
        let sound = Sound::load(
            &sound_config.name(),
            &sound_config.file(soundpad.base_path()),
            sample_rate,
        )?;
        sounds.insert(sound_config.key(), Arc::new(sound));
    }
    Ok(sounds)
}

/// The MIDI events that trigger pads, keyed by normalized key.
pub fn pad_midi_events(
    soundpad: &Soundpad,
) -> Result<Vec<(LiveEvent<'static>, String)>, Box<dyn Error>> {
    soundpad
        .sounds()
        .iter()
        .filter_map(|sound| {
            sound
                .midi()
                .map(|event| Ok((event.to_midi_event()?, sound.key())))
        })
        .collect()
}

/// Initializes the pad, engine and controller from the given config file and returns the
/// pad and controller. The controller owns the session, which can be waited on until it
/// exits. Realistically, the controller is not expected to exit. Must be called from
/// within a tokio runtime.
pub fn init_pad_and_controller(
    path: &Path,
) -> Result<(Arc<Pad>, crate::controller::Controller), Box<dyn Error>> {
    let soundpad = Soundpad::deserialize(path)?;

    let device = crate::audio::get_device(soundpad.audio())?;
    let sounds = load_sounds(&soundpad, soundpad.audio().sample_rate())?;
    info!(device = device.to_string(), sounds = sounds.len(), "Sounds loaded.");

    let midi_device = soundpad
        .midi()
        .map(|midi| crate::midi::get_device(midi.device()))
        .transpose()?;

    let pad = Arc::new(Pad::new(sounds, device, soundpad.flash_duration()?));
    let scheduler = Arc::new(TokioScheduler::new()?);
    let engine = Engine::new(Arc::new(SystemClock::new()), scheduler, pad.clone());
    let session = Session::new(engine, pad.clone());

    let driver = crate::controller::driver(
        soundpad.controller(),
        midi_device,
        pad_midi_events(&soundpad)?,
    )?;
    let controller = crate::controller::Controller::new(session, driver)?;
    Ok((pad, controller))
}
