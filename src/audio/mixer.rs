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
// Mixing logic shared by the cpal device and tests.
use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::audio::Sound;

/// A sound in the middle of playing.
struct Voice {
    /// The sound being played.
    sound: Arc<Sound>,
    /// The next frame to play.
    position: usize,
}

/// Mixes every sounding voice into an interleaved output buffer. There is at most one
/// voice per key.
#[derive(Clone)]
pub struct Mixer {
    /// Voices currently sounding, keyed by pad key.
    voices: Arc<Mutex<HashMap<String, Voice>>>,
    /// Number of output channels.
    num_channels: u16,
    /// Sample rate.
    sample_rate: u32,
}

impl Mixer {
    /// Creates a new mixer.
    pub fn new(num_channels: u16, sample_rate: u32) -> Mixer {
        Mixer {
            voices: Arc::new(Mutex::new(HashMap::new())),
            num_channels: num_channels.max(1),
            sample_rate,
        }
    }

    /// The number of output channels.
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// The output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Starts the sound under the given key, replacing whatever the key was playing.
    pub fn play(&self, key: &str, sound: Arc<Sound>) {
        self.voices
            .lock()
            .insert(key.to_string(), Voice { sound, position: 0 });
    }

    /// The keys that are currently sounding, sorted.
    pub fn active(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.voices.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Mixes the given number of frames into the output buffer, overwriting it. Voices
    /// that run out are dropped.
    pub fn process_into_output(&self, output: &mut [f32], frames: usize) {
        let num_channels = self.num_channels as usize;
        let frames = frames.min(output.len() / num_channels);
        output.fill(0.0);

        let mut voices = self.voices.lock();
        voices.retain(|_, voice| {
            let sound_channels = voice.sound.channels();
            let remaining = voice.sound.frames().saturating_sub(voice.position);
            let to_mix = remaining.min(frames);

            for frame in 0..to_mix {
                let source_frame = voice.position + frame;
                let out = &mut output[frame * num_channels..(frame + 1) * num_channels];
                for (channel, sample) in out.iter_mut().enumerate() {
                    // Mono sounds go to every channel. Otherwise channels map one to one
                    // and anything the sound doesn't have stays silent.
                    let source_channel = if sound_channels == 1 {
                        0
                    } else if channel < sound_channels as usize {
                        channel as u16
                    } else {
                        continue;
                    };
                    *sample += voice.sound.sample(source_frame, source_channel);
                }
            }

            voice.position += to_mix;
            voice.position < voice.sound.frames()
        });
        drop(voices);

        for sample in output[..frames * num_channels].iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}
