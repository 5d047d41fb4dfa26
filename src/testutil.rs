// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::{error::Error, fs::File, path::Path, sync::Arc};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::{engine::Trigger, scheduler::Clock};

mod polling;

pub use polling::{eventually, eventually_async};

/// A trigger that remembers every sound it was asked to play and when.
pub struct TriggerLog {
    clock: Arc<dyn Clock>,
    fired: Mutex<Vec<(u64, String)>>,
}

impl TriggerLog {
    /// Creates a log that stamps every trigger with the time of the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> TriggerLog {
        TriggerLog {
            clock,
            fired: Mutex::new(Vec::new()),
        }
    }

    /// The sounds triggered so far, in order.
    pub fn sounds(&self) -> Vec<String> {
        self.fired
            .lock()
            .iter()
            .map(|(_, sound)| sound.clone())
            .collect()
    }

    /// The triggers so far, with times relative to the given base.
    pub fn relative_to(&self, base: u64) -> Vec<(u64, String)> {
        self.fired
            .lock()
            .iter()
            .map(|(time, sound)| (time.saturating_sub(base), sound.clone()))
            .collect()
    }

    /// Forgets every trigger so far.
    pub fn clear(&self) {
        self.fired.lock().clear();
    }
}

impl Trigger for TriggerLog {
    fn trigger(&self, sound: &str) {
        let now = self.clock.now();
        self.fired.lock().push((now, sound.to_string()));
    }
}

/// Writes 16 bit PCM frames to a wav file. Each inner vector is one frame.
pub fn write_wav(path: &Path, frames: &[Vec<i16>], sample_rate: u32) -> Result<(), Box<dyn Error>> {
    let channels = frames.first().map(|frame| frame.len()).unwrap_or(1);
    assert!(channels <= u16::MAX.into(), "Too many channels!");

    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;

    for frame in frames {
        for sample in frame {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize()?;

    Ok(())
}
