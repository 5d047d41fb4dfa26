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
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use tokio::sync::broadcast;
use tracing::{debug, error, span, Level, Span};

use crate::{
    audio::{self, Sound},
    engine::Trigger,
};

/// How many flashes a slow subscriber can fall behind before it starts missing them.
const FLASH_CHANNEL_CAPACITY: usize = 64;

/// Normalizes a key so that "a", "A" and " a " all name the same pad.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Visual feedback for a triggered pad. The pad should light up for the duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// The key of the pad.
    pub key: String,
    /// How long the pad stays lit.
    pub duration: Duration,
}

impl fmt::Display for Flash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}ms)", self.key, self.duration.as_millis())
    }
}

/// Maps keys to sounds and plays them.
pub struct Pad {
    /// The sounds, keyed by normalized key.
    sounds: HashMap<String, Arc<Sound>>,
    /// The device sounds are played through.
    device: Arc<dyn audio::Device>,
    /// How long each flash lasts.
    flash_duration: Duration,
    /// Publishes a flash for every triggered pad.
    flash_tx: broadcast::Sender<Flash>,
    /// The logging span.
    span: Span,
}

impl Pad {
    /// Creates a new pad. Keys are normalized.
    pub fn new(
        sounds: HashMap<String, Arc<Sound>>,
        device: Arc<dyn audio::Device>,
        flash_duration: Duration,
    ) -> Pad {
        let (flash_tx, _) = broadcast::channel(FLASH_CHANNEL_CAPACITY);
        Pad {
            sounds: sounds
                .into_iter()
                .map(|(key, sound)| (normalize_key(&key), sound))
                .collect(),
            device,
            flash_duration,
            flash_tx,
            span: span!(Level::INFO, "pad"),
        }
    }

    /// Subscribes to flashes.
    pub fn subscribe(&self) -> broadcast::Receiver<Flash> {
        self.flash_tx.subscribe()
    }

    /// The mapped keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sounds.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The sound mapped to the key, if any.
    pub fn sound(&self, key: &str) -> Option<Arc<Sound>> {
        self.sounds.get(&normalize_key(key)).cloned()
    }

    /// The device sounds are played through.
    pub fn device(&self) -> &Arc<dyn audio::Device> {
        &self.device
    }
}

impl Trigger for Pad {
    /// Plays the sound mapped to the key and flashes the pad. Unmapped keys are ignored.
    fn trigger(&self, key: &str) {
        let _enter = self.span.enter();

        let key = normalize_key(key);
        let sound = match self.sounds.get(&key) {
            Some(sound) => sound.clone(),
            None => {
                debug!(key, "No sound mapped to key.");
                return;
            }
        };

        // No subscribers is fine.
        let _ = self.flash_tx.send(Flash {
            key: key.clone(),
            duration: self.flash_duration,
        });

        debug!(key, sound = sound.name(), "Triggering sound.");
        if let Err(e) = self.device.play(&key, sound) {
            error!(key, err = e.as_ref(), "Error playing sound");
        }
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pads ({}):", self.sounds.len())?;
        for key in self.keys() {
            write!(f, "\n- {}: {}", key, self.sounds[&key])?;
        }
        Ok(())
    }
}
