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
    error::Error,
    fmt,
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use crate::{
    audio::{mixer::Mixer, Device as AudioDevice, Sound},
    config,
};

/// A small wrapper around a cpal::Device. Sounds are mixed into a single output
/// stream that stays open for the lifetime of the device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The mixer feeding the output stream. Only set once the stream is open.
    mixer: Option<Mixer>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let output_configs = match device.supported_output_configs() {
                    Ok(output_configs) => output_configs,
                    Err(_) => continue,
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        mixer: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device and opens its output stream. The name "default"
    /// selects the default output device of the default host.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let mut device = if name == "default" {
            let device = cpal::default_host()
                .default_output_device()
                .ok_or("no default output device found")?;
            let max_channels = device.default_output_config()?.channels();
            Device {
                name: device.name()?,
                max_channels,
                host_id: cpal::default_host().id(),
                device,
                mixer: None,
            }
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name))?
        };

        // Stereo is plenty for one-shots, but respect devices that only do mono.
        let num_channels = device.max_channels.min(2);
        let mixer = Mixer::new(num_channels, config.sample_rate());
        start_output_thread(
            device.device.clone(),
            mixer.clone(),
            config.buffer_size(),
        )?;
        device.mixer = Some(mixer);

        Ok(device)
    }
}

/// Builds an output stream of the given sample type that pulls from the mixer.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Mixer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let num_channels = mixer.num_channels() as usize;
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if scratch.len() != data.len() {
                scratch.resize(data.len(), 0.0);
            }
            mixer.process_into_output(&mut scratch, data.len() / num_channels);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

/// Starts the thread that owns the output stream. Returns once the stream is playing or
/// has failed to start.
fn start_output_thread(
    device: cpal::Device,
    mixer: Mixer,
    buffer_size: Option<u32>,
) -> Result<(), Box<dyn Error>> {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

    thread::spawn(move || {
        let span = span!(Level::INFO, "output stream (cpal)");
        let _enter = span.enter();

        let config = cpal::StreamConfig {
            channels: mixer.num_channels(),
            sample_rate: mixer.sample_rate(),
            buffer_size: match buffer_size {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };

        let sample_format = match device.default_output_config() {
            Ok(default_config) => default_config.sample_format(),
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
        };

        let stream_result = match sample_format {
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer),
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, mixer),
            _ => build_stream::<f32>(&device, &config, mixer),
        };

        let stream = match stream_result {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(format!("failed to create stream: {}", e)));
                return;
            }
        };
        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(format!("failed to start stream: {}", e)));
            return;
        }

        info!(
            channels = config.channels,
            format = ?sample_format,
            "CPAL output stream started successfully"
        );
        let _ = ready_tx.send(Ok(()));

        // Keep the stream alive.
        loop {
            thread::sleep(Duration::from_millis(100));
        }
    });

    match ready_rx.recv() {
        Ok(result) => Ok(result?),
        Err(_) => Err("output thread exited before starting the stream".into()),
    }
}

impl AudioDevice for Device {
    fn play(&self, key: &str, sound: Arc<Sound>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::DEBUG, "play sound (cpal)");
        let _enter = span.enter();

        let mixer = self
            .mixer
            .as_ref()
            .ok_or_else(|| format!("output stream for {} is not open", self.name))?;
        if sound.sample_rate() != mixer.sample_rate() {
            return Err(format!(
                "sound {} is at {}Hz, device {} is at {}Hz",
                sound.name(),
                sound.sample_rate(),
                self.name,
                mixer.sample_rate()
            )
            .into());
        }

        mixer.play(key, sound);
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}
