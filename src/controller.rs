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
use std::error::Error;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, warn, Level};

use crate::engine::{Engine, State, Trigger};
use crate::pad::normalize_key;

mod drivers;
pub mod keyboard;
pub mod midi;
pub mod multi;

pub use drivers::driver;

/// Controller events that will trigger behavior in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A pad was hit. Plays the sound and records it if a recording is active.
    Trigger(String),

    /// Starts a new recording, replacing the previous one.
    Record,

    /// Stops recording and playback.
    Stop,

    /// Plays the recording, or resumes it if paused.
    Play,

    /// Pauses playback.
    Pause,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Which control surface buttons are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buttons {
    pub record: bool,
    pub stop: bool,
    pub play: bool,
    pub pause: bool,
}

impl Buttons {
    /// Nothing is happening: record or play.
    pub fn idle() -> Buttons {
        Buttons {
            record: true,
            stop: false,
            play: true,
            pause: false,
        }
    }

    /// Recording: the only way out is stop.
    pub fn recording() -> Buttons {
        Buttons {
            record: false,
            stop: true,
            play: false,
            pause: false,
        }
    }

    /// Playing: pause or stop.
    pub fn playing() -> Buttons {
        Buttons {
            record: false,
            stop: true,
            play: false,
            pause: true,
        }
    }

    /// Paused: resume or stop.
    pub fn paused() -> Buttons {
        Buttons {
            record: false,
            stop: true,
            play: true,
            pause: false,
        }
    }

    fn allows(&self, event: &Event) -> bool {
        match event {
            Event::Trigger(_) => true,
            Event::Record => self.record,
            Event::Stop => self.stop,
            Event::Play => self.play,
            Event::Pause => self.pause,
        }
    }
}

/// Ties the engine to the pad and the control surface.
pub struct Session {
    /// The record/playback engine.
    engine: Engine,
    /// Plays sounds for user triggers.
    pad: Arc<dyn Trigger>,
    /// The enabled control surface buttons.
    buttons: Buttons,
}

impl Session {
    /// Creates a new session.
    pub fn new(engine: Engine, pad: Arc<dyn Trigger>) -> Session {
        Session {
            engine,
            pad,
            buttons: Buttons::idle(),
        }
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The state of the engine.
    pub fn state(&self) -> State {
        self.engine.state()
    }

    /// The enabled control surface buttons.
    pub fn buttons(&mut self) -> Buttons {
        self.refresh();
        self.buttons
    }

    /// Handles a single controller event. Commands for disabled buttons are ignored.
    pub fn handle(&mut self, event: Event) {
        self.refresh();

        if !self.buttons.allows(&event) {
            warn!(event = format!("{:?}", event), "Button is disabled, ignoring.");
            return;
        }

        match event {
            Event::Trigger(key) => {
                self.pad.trigger(&key);
                self.engine.record(&normalize_key(&key));
            }
            Event::Record => {
                self.engine.start_recording();
                self.buttons = Buttons::recording();
            }
            Event::Stop => {
                self.engine.stop_recording();
                self.engine.stop();
                self.buttons = Buttons::idle();
            }
            Event::Play => {
                if self.engine.state() == State::Paused {
                    self.engine.resume();
                } else {
                    self.engine.start();
                }
                self.buttons = Buttons::playing();
            }
            Event::Pause => {
                self.engine.pause();
                self.buttons = Buttons::paused();
            }
        }
    }

    /// Playback that ran to completion goes back to idle.
    fn refresh(&mut self) {
        if self.buttons == Buttons::playing() && self.engine.state() == State::Idle {
            self.buttons = Buttons::idle();
        }
    }
}

/// Drives a session from a driver.
pub struct Controller {
    /// The session being controlled.
    session: Arc<Mutex<Session>>,
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(session: Session, driver: Arc<dyn Driver>) -> Result<Controller, Box<dyn Error>> {
        let session = Arc::new(Mutex::new(session));
        let task_session = session.clone();
        Ok(Controller {
            session,
            handle: tokio::spawn(async move {
                Controller::trigger_events(task_session, driver).await
            }),
        })
    }

    /// The session being controlled.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Handles session events by watching the driver and getting events from it.
    async fn trigger_events(session: Arc<Mutex<Session>>, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let join_handle = driver.monitor_events(events_tx);

        info!("Controller started.");

        loop {
            if let Some(event) = events_rx.recv().await {
                info!(event = format!("{:?}", event), "Received event.");
                let mut session = session.lock();
                session.handle(event);
                info!(state = session.state().to_string(), "Event handled.");
            } else {
                info!("Controller closing.");
                match join_handle.await {
                    Ok(Err(e)) => error!("Event monitor failed: {}", e),
                    Err(e) => error!("Error waiting for event monitor to stop: {}", e),
                    Ok(Ok(())) => {}
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io, sync::Arc};

    use parking_lot::Mutex;
    use tokio::{
        sync::mpsc::{self, Receiver, Sender},
        task::JoinHandle,
    };

    use crate::{
        audio::{self, Sound},
        engine::{Engine, State},
        pad::Pad,
        scheduler::{Clock, SystemClock, TokioScheduler, VirtualScheduler},
        testutil::{eventually, TriggerLog},
    };

    use super::{Buttons, Driver, Event, Session};

    /// Forwards events that the test sends.
    struct TestDriver {
        events_rx: Mutex<Option<Receiver<Event>>>,
    }

    impl TestDriver {
        fn new() -> (TestDriver, Sender<Event>) {
            let (events_tx, events_rx) = mpsc::channel(16);
            (
                TestDriver {
                    events_rx: Mutex::new(Some(events_rx)),
                },
                events_tx,
            )
        }
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events_rx = self.events_rx.lock().take();
            tokio::spawn(async move {
                let mut events_rx = match events_rx {
                    Some(events_rx) => events_rx,
                    None => return Err(io::Error::other("already monitoring")),
                };
                while let Some(event) = events_rx.recv().await {
                    if events_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(())
            })
        }
    }

    fn new_session() -> (Session, Arc<VirtualScheduler>, Arc<TriggerLog>) {
        let scheduler = Arc::new(VirtualScheduler::starting_at(1_000));
        let log = Arc::new(TriggerLog::with_clock(scheduler.clone()));
        let engine = Engine::new(scheduler.clone(), scheduler.clone(), log.clone());
        (Session::new(engine, log.clone()), scheduler, log)
    }

    #[test]
    fn test_button_enablement() {
        let (mut session, scheduler, _log) = new_session();
        assert_eq!(Buttons::idle(), session.buttons());

        session.handle(Event::Record);
        assert_eq!(State::Recording, session.state());
        assert_eq!(Buttons::recording(), session.buttons());

        // Disabled while recording.
        session.handle(Event::Play);
        session.handle(Event::Pause);
        assert_eq!(State::Recording, session.state());

        scheduler.advance(50);
        session.handle(Event::Trigger("a".to_string()));
        scheduler.advance(100);
        session.handle(Event::Trigger("S".to_string()));
        session.handle(Event::Stop);
        assert_eq!(State::Idle, session.state());
        assert_eq!(Buttons::idle(), session.buttons());

        session.handle(Event::Play);
        assert_eq!(State::Playing, session.state());
        assert_eq!(Buttons::playing(), session.buttons());

        // Record is disabled while playing.
        session.handle(Event::Record);
        assert_eq!(State::Playing, session.state());

        scheduler.advance(100);
        session.handle(Event::Pause);
        assert_eq!(State::Paused, session.state());
        assert_eq!(Buttons::paused(), session.buttons());

        session.handle(Event::Play);
        assert_eq!(State::Playing, session.state());

        session.handle(Event::Stop);
        assert_eq!(State::Idle, session.state());
        assert_eq!(Buttons::idle(), session.buttons());
    }

    #[test]
    fn test_triggers_are_played_and_recorded() {
        let (mut session, scheduler, log) = new_session();

        // Not recording, only played.
        session.handle(Event::Trigger("q".to_string()));
        assert_eq!(vec!["q".to_string()], log.sounds());
        assert!(session.engine().recording().is_empty());

        session.handle(Event::Record);
        scheduler.advance(50);
        session.handle(Event::Trigger("a".to_string()));
        scheduler.advance(100);
        session.handle(Event::Trigger("s".to_string()));
        session.handle(Event::Stop);

        assert_eq!(
            vec![(50, "A"), (150, "S")],
            session.engine().recorder().offsets().collect::<Vec<_>>()
        );

        log.clear();
        let start = scheduler.now();
        session.handle(Event::Play);
        scheduler.advance(100);
        session.handle(Event::Pause);
        scheduler.advance(1_000);
        let resumed = scheduler.now();
        session.handle(Event::Play);
        scheduler.advance(1_000);

        let fired = log.relative_to(start);
        assert_eq!((50, "A".to_string()), fired[0]);
        assert_eq!((resumed - start + 50, "S".to_string()), fired[1]);
        assert_eq!(2, fired.len());
    }

    #[test]
    fn test_finished_playback_returns_to_idle() {
        let (mut session, scheduler, log) = new_session();
        session.handle(Event::Record);
        scheduler.advance(10);
        session.handle(Event::Trigger("A".to_string()));
        session.handle(Event::Stop);

        session.handle(Event::Play);
        scheduler.advance(100);
        assert_eq!(State::Idle, session.state());
        assert_eq!(Buttons::idle(), session.buttons());

        // Play is enabled again.
        log.clear();
        session.handle(Event::Play);
        scheduler.advance(100);
        assert_eq!(vec!["A".to_string()], log.sounds());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let device = Arc::new(audio::mock::Device::get("mock-device"));
        let mut sounds = std::collections::HashMap::new();
        sounds.insert(
            "A".to_string(),
            Arc::new(Sound::new("clap", vec![0.5; 10], 1, 44100)),
        );
        sounds.insert(
            "S".to_string(),
            Arc::new(Sound::new("snare", vec![0.5; 10], 1, 44100)),
        );
        let pad = Arc::new(Pad::new(
            sounds,
            device.clone(),
            std::time::Duration::from_millis(100),
        ));
        let engine = Engine::new(
            Arc::new(SystemClock::new()),
            Arc::new(TokioScheduler::new()?),
            pad.clone(),
        );

        let (driver, events_tx) = TestDriver::new();
        let mut controller = super::Controller::new(Session::new(engine, pad), Arc::new(driver))?;
        let session = controller.session();

        events_tx.send(Event::Record).await?;
        events_tx.send(Event::Trigger("a".to_string())).await?;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        events_tx.send(Event::Trigger("s".to_string())).await?;
        events_tx.send(Event::Stop).await?;
        eventually(
            || session.lock().engine().recording().len() == 3,
            "Recording never captured both triggers",
        );
        assert_eq!(
            vec!["A".to_string(), "S".to_string()],
            device.played_keys()
        );

        events_tx.send(Event::Play).await?;
        eventually(
            || device.played_keys().len() == 4,
            "Playback never triggered both sounds",
        );
        assert_eq!(
            vec![
                "clap".to_string(),
                "snare".to_string(),
                "clap".to_string(),
                "snare".to_string()
            ],
            device.played_sounds()
        );
        eventually(
            || session.lock().state() == State::Idle,
            "Playback never finished",
        );

        drop(events_tx);
        assert!(
            controller.join().await.is_ok(),
            "Error waiting for controller",
        );

        Ok(())
    }
}
