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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const RECORD: &str = "record";
const STOP: &str = "stop";
const PLAY: &str = "play";
const PAUSE: &str = "pause";

/// Lines that are read as commands and can't be used as pad keys.
pub const COMMANDS: [&str; 4] = [RECORD, STOP, PLAY, PAUSE];

/// A controller that drives a session using the keyboard. Each line is either a
/// command or a pad key.
#[derive(Default)]
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads a single line. Returns false once the input is exhausted.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({}, {}, {}, {}) or key: ",
            RECORD, STOP, PLAY, PAUSE,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let event = match input.trim().to_lowercase().as_str() {
            RECORD => Event::Record,
            STOP => Event::Stop,
            PLAY => Event::Play,
            PAUSE => Event::Pause,
            "" => {
                warn!("Empty input");
                return Ok(true);
            }
            _ => Event::Trigger(input.trim().to_string()),
        };
        events_tx.blocking_send(event).map_err(io::Error::other)?;
        Ok(true)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}
