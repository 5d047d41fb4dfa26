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

//! The record/playback engine.
//!
//! Recording captures triggers with their capture time. Playback schedules one deferred
//! trigger per captured sound at its offset from the anchor. Pausing cancels everything
//! still pending, and resuming reschedules whatever lies past the pause point.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tracing::{debug, info, span, warn, Level, Span};

use crate::{
    recorder::{RecordedEvent, Recorder},
    scheduler::{CancelToken, Clock, Scheduler},
};

/// Plays a sound. Implemented by whatever turns a sound ID into audio and feedback.
pub trait Trigger: Send + Sync {
    /// Plays the given sound. Fire and forget.
    fn trigger(&self, sound: &str);
}

/// The state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing is being recorded or played back.
    Idle,
    /// Triggers are being captured.
    Recording,
    /// The recording is being played back.
    Playing,
    /// Playback is paused and can be resumed.
    Paused,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            State::Idle => "idle",
            State::Recording => "recording",
            State::Playing => "playing",
            State::Paused => "paused",
        };
        write!(f, "{}", state)
    }
}

/// Transient state for an active or paused playback.
struct PlaybackSession {
    /// Tokens for every invocation scheduled since the last start or resume.
    handles: Vec<CancelToken>,
    /// When playback started, shifted forward on resume by the time spent paused.
    start_time: u64,
    /// When playback was paused. Some while paused.
    pause_time: Option<u64>,
    /// Invocations that have been scheduled but have neither fired nor been cancelled.
    outstanding: Arc<AtomicUsize>,
}

/// Records triggers and plays them back with their original timing.
pub struct Engine {
    /// The time source for capture and playback.
    clock: Arc<dyn Clock>,
    /// Runs deferred triggers during playback.
    scheduler: Arc<dyn Scheduler>,
    /// Plays sounds during playback.
    trigger: Arc<dyn Trigger>,
    /// The recorder and its current recording.
    recorder: Recorder,
    /// The playback session. Some while playing or paused.
    session: Option<PlaybackSession>,
    /// The logging span.
    span: Span,
}

impl Engine {
    /// Creates a new engine with an empty recording.
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        trigger: Arc<dyn Trigger>,
    ) -> Engine {
        Engine {
            clock,
            scheduler,
            trigger,
            recorder: Recorder::new(),
            session: None,
            span: span!(Level::INFO, "engine"),
        }
    }

    /// The current state. Playback that has fired every scheduled trigger is idle.
    pub fn state(&self) -> State {
        if self.recorder.is_recording() {
            return State::Recording;
        }
        match &self.session {
            None => State::Idle,
            Some(session) if session.pause_time.is_some() => State::Paused,
            Some(session) if session.outstanding.load(Ordering::SeqCst) == 0 => State::Idle,
            Some(_) => State::Playing,
        }
    }

    /// The current recording, anchor included.
    pub fn recording(&self) -> &[RecordedEvent] {
        self.recorder.events()
    }

    /// The recorder holding the current recording.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// The number of deferred triggers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.session
            .as_ref()
            .map(|session| session.outstanding.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Starts a new recording, replacing the previous one. Any playback in progress is
    /// stopped first so that recording and playback never overlap.
    pub fn start_recording(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.session.is_some() {
            info!("Stopping playback before recording.");
            self.stop_playback();
        }

        self.recorder.start(self.clock.now());
        info!("Recording started.");
    }

    /// Captures the sound if a recording is active.
    pub fn record(&mut self, sound: &str) {
        if self.recorder.record(sound, self.clock.now()) {
            let _enter = self.span.enter();
            debug!(sound, "Recorded trigger.");
        }
    }

    /// Stops recording. The recording is kept for playback.
    pub fn stop_recording(&mut self) {
        if !self.recorder.is_recording() {
            return;
        }

        let _enter = self.span.enter();
        self.recorder.stop();
        info!(
            events = self.recorder.events().len().saturating_sub(1),
            length_ms = self.recorder.length(),
            "Recording stopped."
        );
    }

    /// Plays the recording back from the beginning.
    pub fn start(&mut self) {
        let _enter = self.span.enter();

        match self.state() {
            State::Recording => {
                warn!("Can't start playback while recording.");
                return;
            }
            State::Playing | State::Paused => {
                info!("Playback is already active.");
                return;
            }
            State::Idle => {}
        }

        // Drop the handles of a playback that ran to completion.
        self.session = None;

        let start_time = self.clock.now();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let handles = self.schedule_after(None, &outstanding);
        info!(
            scheduled = handles.len(),
            length_ms = self.recorder.length(),
            "Playback started."
        );

        self.session = Some(PlaybackSession {
            handles,
            start_time,
            pause_time: None,
            outstanding,
        });
    }

    /// Pauses playback, cancelling every trigger that hasn't fired yet.
    pub fn pause(&mut self) {
        let _enter = self.span.enter();

        if self.state() != State::Playing {
            debug!("Not playing, nothing to pause.");
            return;
        }

        let now = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            session.pause_time = Some(now);
            let cancelled = Engine::cancel_all(self.scheduler.as_ref(), session);
            info!(
                elapsed_ms = now.saturating_sub(session.start_time),
                cancelled, "Playback paused."
            );
        }
    }

    /// Resumes paused playback. Triggers whose offset lies past the pause point are
    /// rescheduled relative to now; the rest are skipped.
    pub fn resume(&mut self) {
        let _enter = self.span.enter();

        let elapsed = match &self.session {
            Some(PlaybackSession {
                pause_time: Some(pause_time),
                start_time,
                ..
            }) => pause_time.saturating_sub(*start_time),
            _ => {
                debug!("Not paused, nothing to resume.");
                return;
            }
        };

        let now = self.clock.now();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let handles = self.schedule_after(Some(elapsed), &outstanding);

        if let Some(session) = self.session.as_mut() {
            // Shift the start so the next pause measures total time played.
            session.start_time = now.saturating_sub(elapsed);
            session.pause_time = None;
            session.outstanding = outstanding;
            info!(elapsed_ms = elapsed, scheduled = handles.len(), "Playback resumed.");
            session.handles = handles;
        }
    }

    /// Stops playback and returns to idle. Safe to call in any state.
    pub fn stop(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.session.is_none() {
            debug!("Playback is not active, nothing to stop.");
            return;
        }
        self.stop_playback();
    }

    fn stop_playback(&mut self) {
        if let Some(mut session) = self.session.take() {
            let cancelled = Engine::cancel_all(self.scheduler.as_ref(), &mut session);
            info!(cancelled, "Playback stopped.");
        }
    }

    /// Schedules a trigger for every captured sound. With an elapsed time, only sounds
    /// with an offset past it are scheduled, delayed by what remains of their offset.
    fn schedule_after(
        &self,
        elapsed: Option<u64>,
        outstanding: &Arc<AtomicUsize>,
    ) -> Vec<CancelToken> {
        self.recorder
            .offsets()
            .filter(|(offset, _)| elapsed.map_or(true, |elapsed| *offset > elapsed))
            .map(|(offset, sound)| {
                let delay = offset.saturating_sub(elapsed.unwrap_or(0));
                let trigger = self.trigger.clone();
                let sound = sound.to_string();
                let outstanding_for_callback = outstanding.clone();

                outstanding.fetch_add(1, Ordering::SeqCst);
                self.scheduler.schedule(
                    Duration::from_millis(delay),
                    Box::new(move || {
                        trigger.trigger(&sound);
                        outstanding_for_callback.fetch_sub(1, Ordering::SeqCst);
                    }),
                )
            })
            .collect()
    }

    /// Cancels every pending invocation in the session. Returns how many were cancelled.
    fn cancel_all(scheduler: &dyn Scheduler, session: &mut PlaybackSession) -> usize {
        let mut cancelled = 0;
        for handle in session.handles.drain(..) {
            scheduler.cancel(&handle);
            if handle.is_cancelled() {
                cancelled += 1;
            }
        }
        // Every handle has either fired or been cancelled at this point.
        session.outstanding.store(0, Ordering::SeqCst);
        cancelled
    }
}
