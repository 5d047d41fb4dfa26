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
use std::{error::Error, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use crate::audio::Sound;

/// A mock device. Doesn't actually play anything.
#[derive(Clone)]
pub struct Device {
    name: String,
    /// Every key and sound name played so far.
    played: Arc<Mutex<Vec<(String, String)>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            played: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The keys played so far, in order.
    #[cfg(test)]
    pub fn played_keys(&self) -> Vec<String> {
        self.played.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    /// The sound names played so far, in order.
    #[cfg(test)]
    pub fn played_sounds(&self) -> Vec<String> {
        self.played
            .lock()
            .iter()
            .map(|(_, sound)| sound.clone())
            .collect()
    }
}

impl crate::audio::Device for Device {
    fn play(&self, key: &str, sound: Arc<Sound>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "play sound (mock)");
        let _enter = span.enter();

        info!(
            device = self.name,
            key,
            sound = sound.name(),
            duration_ms = sound.duration().as_millis(),
            "Playing sound."
        );
        self.played
            .lock()
            .push((key.to_string(), sound.name().to_string()));
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
