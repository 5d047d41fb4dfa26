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
use std::{error::Error, sync::Arc};

use midly::live::LiveEvent;
use tracing::error;

use super::Driver;
use crate::config::{Controller, MidiController};

fn driver_from_midi_config(
    config: &MidiController,
    midi_device: Option<Arc<dyn crate::midi::Device>>,
    pads: Vec<(LiveEvent<'static>, String)>,
) -> Result<crate::controller::midi::Driver, Box<dyn Error>> {
    match midi_device {
        Some(midi_device) => Ok(crate::controller::midi::Driver::new(
            midi_device,
            config.record()?,
            config.stop()?,
            config.play()?,
            config.pause()?,
            pads,
        )),
        None => Err("No MIDI device found for MIDI controller.".into()),
    }
}

/// Creates a controller driver from the config. Pads are the MIDI events that trigger
/// each key.
pub fn driver(
    config: &Controller,
    midi_device: Option<Arc<dyn crate::midi::Device>>,
    pads: Vec<(LiveEvent<'static>, String)>,
) -> Result<Arc<dyn Driver>, Box<dyn Error>> {
    match config {
        Controller::Midi(config) => Ok(Arc::new(driver_from_midi_config(
            config,
            midi_device,
            pads,
        )?)),
        Controller::Keyboard => Ok(Arc::new(crate::controller::keyboard::Driver::new())),
        Controller::Multi(controllers) => {
            let mut sub_drivers = Vec::new();
            for (name, controller) in controllers {
                match controller {
                    Controller::Keyboard => {
                        sub_drivers.push(crate::controller::multi::SubDriver::Keyboard(
                            Arc::new(crate::controller::keyboard::Driver::new()),
                        ))
                    }
                    Controller::Midi(midi_controller) => {
                        match driver_from_midi_config(
                            midi_controller,
                            midi_device.clone(),
                            pads.clone(),
                        ) {
                            Ok(driver) => sub_drivers
                                .push(crate::controller::multi::SubDriver::Midi(Arc::new(driver))),
                            Err(e) => {
                                error!(controller = name, err = e.as_ref(), "Skipping controller")
                            }
                        }
                    }
                    Controller::Multi(_) => {
                        error!(
                            controller = name,
                            "Recursive multi controllers are not supported"
                        );
                    }
                }
            }

            if sub_drivers.is_empty() {
                return Err("No usable controllers in multi controller.".into());
            }
            Ok(Arc::new(crate::controller::multi::Driver::new(sub_drivers)))
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use crate::config::{self, Controller, MidiController};

    fn midi_controller() -> MidiController {
        MidiController::new(
            config::midi::note_on(16, 0, 127),
            config::midi::note_on(16, 1, 127),
            config::midi::note_on(16, 2, 127),
            config::midi::note_on(16, 3, 127),
        )
    }

    #[test]
    fn test_midi_requires_device() {
        assert!(super::driver(&Controller::Midi(midi_controller()), None, Vec::new()).is_err());
    }

    #[test]
    fn test_multi_skips_unusable() {
        let mut controllers = HashMap::new();
        controllers.insert("keyboard".to_string(), Controller::Keyboard);
        controllers.insert("midi".to_string(), Controller::Midi(midi_controller()));
        assert!(super::driver(&Controller::Multi(controllers), None, Vec::new()).is_ok());

        let mut controllers = HashMap::new();
        controllers.insert("midi".to_string(), Controller::Midi(midi_controller()));
        assert!(super::driver(&Controller::Multi(controllers), None, Vec::new()).is_err());
    }
}
