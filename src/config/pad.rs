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
use std::{
    collections::HashSet,
    error::Error,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::{audio::Audio, controller::Controller, error::ConfigError, midi};
use crate::{controller::keyboard, pad::normalize_key};

const DEFAULT_FLASH_DURATION: Duration = Duration::from_millis(100);

/// The prefix for environment variables that override the config file, e.g.
/// SOUNDPAD_AUDIO__DEVICE.
const ENV_PREFIX: &str = "SOUNDPAD";

/// A single pad: a key bound to a sound file.
#[derive(Deserialize, Clone, Debug)]
pub struct SoundConfig {
    /// The key that triggers the sound.
    key: String,
    /// A display name. Defaults to the file stem.
    name: Option<String>,
    /// The sound file, relative to the config file.
    file: String,
    /// A MIDI event that triggers the pad.
    midi: Option<midi::Event>,
}

impl SoundConfig {
    /// The normalized key.
    pub fn key(&self) -> String {
        normalize_key(&self.key)
    }

    /// The display name of the sound.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => Path::new(&self.file)
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| self.file.clone()),
        }
    }

    /// The sound file resolved against the given base directory.
    pub fn file(&self, base: &Path) -> PathBuf {
        base.join(&self.file)
    }

    /// The MIDI event that triggers the pad, if there is one.
    pub fn midi(&self) -> Option<&midi::Event> {
        self.midi.as_ref()
    }
}

/// The root configuration of a sound pad.
#[derive(Deserialize, Clone, Debug)]
pub struct Soundpad {
    /// The audio output configuration.
    audio: Audio,
    /// How long a pad lights up after being triggered.
    flash_duration: Option<String>,
    /// The controller configuration.
    #[serde(default)]
    controller: Controller,
    /// The MIDI input configuration.
    midi: Option<midi::Midi>,
    /// The pads.
    #[serde(default)]
    sounds: Vec<SoundConfig>,

    /// The directory sound files are resolved against.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Soundpad {
    /// Parses the sound pad configuration from a YAML file, applying environment
    /// overrides.
    pub fn deserialize(path: &Path) -> Result<Soundpad, ConfigError> {
        let mut soundpad = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Soundpad>()?;

        soundpad.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        soundpad.validate()?;
        Ok(soundpad)
    }

    /// Checks the key bindings.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut keys = HashSet::new();
        for sound in &self.sounds {
            let key = sound.key();
            if key.is_empty() {
                return Err(ConfigError::EmptyKey(sound.name()));
            }
            if keyboard::COMMANDS
                .iter()
                .any(|command| command.eq_ignore_ascii_case(&key))
            {
                return Err(ConfigError::ReservedKey(key));
            }
            if !keys.insert(key.clone()) {
                return Err(ConfigError::DuplicateKey(key));
            }
        }
        Ok(())
    }

    /// Checks that every sound file exists.
    pub fn check_files(&self) -> Result<(), ConfigError> {
        for sound in &self.sounds {
            let file = sound.file(&self.base_path);
            if !file.is_file() {
                return Err(ConfigError::MissingSound(file));
            }
        }
        Ok(())
    }

    /// The audio output configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// How long a pad lights up after being triggered (default: 100ms).
    pub fn flash_duration(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.flash_duration {
            Some(flash_duration) => Ok(DurationString::from_string(flash_duration.clone())?.into()),
            None => Ok(DEFAULT_FLASH_DURATION),
        }
    }

    /// The controller configuration.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The MIDI input configuration.
    pub fn midi(&self) -> Option<&midi::Midi> {
        self.midi.as_ref()
    }

    /// The pads.
    pub fn sounds(&self) -> &[SoundConfig] {
        &self.sounds
    }

    /// The directory sound files are resolved against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs, path::Path, time::Duration};

    use serial_test::serial;

    use crate::config::{Controller, ConfigError};

    use super::Soundpad;

    fn write_config(dir: &Path, yaml: &str) -> Result<std::path::PathBuf, Box<dyn Error>> {
        let path = dir.join("soundpad.yaml");
        fs::write(&path, yaml)?;
        Ok(path)
    }

    #[test]
    #[serial]
    fn test_deserialize() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = write_config(
            tempdir.path(),
            r#"
audio:
  device: mock-device
  sample_rate: 48000
flash_duration: 250ms
sounds:
  - key: a
    file: sounds/clap.wav
  - key: " s "
    name: Snare
    file: sounds/snare.wav
    midi:
      type: note_on
      channel: 10
      key: 38
"#,
        )?;

        let soundpad = Soundpad::deserialize(&path)?;
        assert_eq!("mock-device", soundpad.audio().device());
        assert_eq!(48000, soundpad.audio().sample_rate());
        assert_eq!(Duration::from_millis(250), soundpad.flash_duration()?);
        assert!(matches!(soundpad.controller(), Controller::Keyboard));
        assert!(soundpad.midi().is_none());

        let sounds = soundpad.sounds();
        assert_eq!(2, sounds.len());
        assert_eq!("A", sounds[0].key());
        assert_eq!("clap", sounds[0].name());
        assert!(sounds[0].midi().is_none());
        assert_eq!("S", sounds[1].key());
        assert_eq!("Snare", sounds[1].name());
        assert!(sounds[1].midi().is_some());
        assert_eq!(
            tempdir.path().join("sounds/snare.wav"),
            sounds[1].file(soundpad.base_path())
        );

        Ok(())
    }

    #[test]
    #[serial]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = write_config(tempdir.path(), "audio:\n  device: mock-device\n")?;

        let soundpad = Soundpad::deserialize(&path)?;
        assert_eq!(44100, soundpad.audio().sample_rate());
        assert_eq!(None, soundpad.audio().buffer_size());
        assert_eq!(Duration::from_millis(100), soundpad.flash_duration()?);
        assert!(soundpad.sounds().is_empty());

        Ok(())
    }

    #[test]
    #[serial]
    fn test_duplicate_keys() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = write_config(
            tempdir.path(),
            r#"
audio:
  device: mock-device
sounds:
  - key: A
    file: clap.wav
  - key: a
    file: kick.wav
"#,
        )?;

        match Soundpad::deserialize(&path) {
            Err(ConfigError::DuplicateKey(key)) => assert_eq!("A", key),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected an error"),
        }

        Ok(())
    }

    #[test]
    #[serial]
    fn test_command_keys_rejected() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = write_config(
            tempdir.path(),
            r#"
audio:
  device: mock-device
sounds:
  - key: A
    file: clap.wav
  - key: Play
    file: kick.wav
"#,
        )?;

        match Soundpad::deserialize(&path) {
            Err(ConfigError::ReservedKey(key)) => assert_eq!("PLAY", key),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected an error"),
        }

        Ok(())
    }

    #[test]
    #[serial]
    fn test_missing_file() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = tempdir.path().join("does-not-exist.yaml");
        assert!(matches!(
            Soundpad::deserialize(&path),
            Err(ConfigError::Load(_))
        ));

        let path = write_config(
            tempdir.path(),
            "audio:\n  device: mock-device\nsounds:\n  - key: A\n    file: clap.wav\n",
        )?;
        let soundpad = Soundpad::deserialize(&path)?;
        assert!(matches!(
            soundpad.check_files(),
            Err(ConfigError::MissingSound(_))
        ));

        Ok(())
    }

    #[test]
    #[serial]
    fn test_environment_override() -> Result<(), Box<dyn Error>> {
        let tempdir = tempfile::tempdir()?;
        let path = write_config(tempdir.path(), "audio:\n  device: default\n")?;

        std::env::set_var("SOUNDPAD_AUDIO__DEVICE", "mock-override");
        let result = Soundpad::deserialize(&path);
        std::env::remove_var("SOUNDPAD_AUDIO__DEVICE");

        assert_eq!("mock-override", result?.audio().device());
        Ok(())
    }
}
