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

//! Sounds are short clips decoded entirely into memory so that triggering one never
//! touches the disk.

use std::{
    fmt,
    fs::File,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{info, warn};

/// Errors that can occur while loading a sound.
#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("unable to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("unable to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: SymphoniaError,
    },

    #[error("no audio track found in {0}")]
    NoAudioTrack(PathBuf),

    #[error("sample rate not specified in {0}")]
    UnknownSampleRate(PathBuf),
}

/// A decoded sound held in memory as interleaved f32 samples.
pub struct Sound {
    /// The name of the sound.
    name: String,
    /// Interleaved samples.
    samples: Vec<f32>,
    /// The number of channels.
    channels: u16,
    /// The sample rate of the samples.
    sample_rate: u32,
}

impl Sound {
    /// Creates a sound from interleaved samples.
    pub fn new(name: &str, samples: Vec<f32>, channels: u16, sample_rate: u32) -> Sound {
        Sound {
            name: name.to_string(),
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Decodes the given file and resamples it to the target sample rate.
    pub fn load(name: &str, path: &Path, target_sample_rate: u32) -> Result<Sound, SoundError> {
        let (samples, channels, sample_rate) = decode(path)?;

        let samples = if sample_rate != target_sample_rate {
            info!(
                sound = name,
                source_rate = sample_rate,
                target_rate = target_sample_rate,
                "Resampling sound"
            );
            resample(&samples, channels, sample_rate, target_sample_rate)
        } else {
            samples
        };

        let sound = Sound::new(name, samples, channels, target_sample_rate);
        info!(
            sound = name,
            path = ?path,
            channels = sound.channels,
            sample_rate = sound.sample_rate,
            duration_ms = sound.duration().as_millis(),
            "Sound loaded"
        );
        Ok(sound)
    }

    /// The name of the sound.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// The sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// The sample at the given frame and channel, or silence past the end.
    #[inline]
    pub fn sample(&self, frame: usize, channel: u16) -> f32 {
        self.samples
            .get(frame * self.channels as usize + channel as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// How long the sound plays for.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels: {}, Duration: {}ms)",
            self.name,
            self.channels,
            self.duration().as_millis()
        )
    }
}

/// Decodes the whole file into interleaved f32 samples. Returns the samples, channel
/// count and sample rate.
fn decode(path: &Path) -> Result<(Vec<f32>, u16, u32), SoundError> {
    let decode_error = |source: SymphoniaError| SoundError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| SoundError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SoundError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| SoundError::UnknownSampleRate(path.to_path_buf()))?;
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?path, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if channels == 0 {
        return Err(SoundError::NoAudioTrack(path.to_path_buf()));
    }

    Ok((samples, channels, sample_rate))
}

/// Resamples interleaved samples with linear interpolation. Good enough for one-shots.
fn resample(samples: &[f32], channels: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}
