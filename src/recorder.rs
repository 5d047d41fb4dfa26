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
use std::fmt;

/// A single captured trigger. The first event of every recording is an anchor with no
/// sound that marks when the recording started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// The sound that was triggered. None for the anchor.
    sound: Option<String>,
    /// When the trigger happened, in milliseconds.
    timestamp: u64,
}

impl RecordedEvent {
    /// The sound that was triggered, if this isn't the anchor.
    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref()
    }

    /// The capture time in milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Captures a chronologically ordered log of triggers.
#[derive(Default)]
pub struct Recorder {
    /// True while triggers are being captured.
    recording: bool,
    /// The current recording. Index 0 is the anchor once a recording has been started.
    events: Vec<RecordedEvent>,
}

impl Recorder {
    /// Creates a recorder with an empty recording.
    pub fn new() -> Recorder {
        Recorder::default()
    }

    /// Throws away the previous recording and starts a new one anchored at the given time.
    pub fn start(&mut self, now: u64) {
        self.recording = true;
        self.events.clear();
        self.events.push(RecordedEvent {
            sound: None,
            timestamp: now,
        });
    }

    /// Appends the sound to the recording. Does nothing unless a recording is active.
    /// Returns true if the sound was captured.
    pub fn record(&mut self, sound: &str, now: u64) -> bool {
        if !self.recording {
            return false;
        }
        self.events.push(RecordedEvent {
            sound: Some(sound.to_string()),
            timestamp: now,
        });
        true
    }

    /// Stops capturing. The recording remains available for playback.
    pub fn stop(&mut self) {
        self.recording = false;
    }

    /// Returns true while a recording is active.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The captured events, anchor included.
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// The time the current recording started, if there is one.
    pub fn anchor(&self) -> Option<u64> {
        self.events.first().map(|event| event.timestamp)
    }

    /// Iterates over every captured sound with its offset from the anchor.
    pub fn offsets(&self) -> impl Iterator<Item = (u64, &str)> {
        let anchor = self.anchor().unwrap_or_default();
        self.events.iter().skip(1).filter_map(move |event| {
            event
                .sound()
                .map(|sound| (event.timestamp.saturating_sub(anchor), sound))
        })
    }

    /// The offset of the last captured sound, or zero for an empty recording.
    pub fn length(&self) -> u64 {
        self.offsets().map(|(offset, _)| offset).max().unwrap_or(0)
    }
}

impl fmt::Display for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recording (events: {}):", self.events.len().saturating_sub(1))?;
        for (offset, sound) in self.offsets() {
            write!(f, "\n- {}ms: {}", offset, sound)?;
        }
        Ok(())
    }
}
