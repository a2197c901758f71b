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

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::thread_priority::{
    callback_thread_priority, configure_audio_thread_priority, rt_audio_enabled,
};
use super::AudioError;
use crate::config;
use crate::engine::Renderer;

/// Frames mixed per pass when the device wants integer samples.
const SCRATCH_FRAMES: usize = 1024;

/// An output device known to cpal.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub name: String,
    pub host: cpal::HostId,
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host.name()
        )
    }
}

/// Lists output devices across every available host.
pub fn list_devices() -> Result<Vec<DeviceInfo>, AudioError> {
    let mut devices = Vec::new();
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
            let Ok(configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = configs.map(|c| c.channels()).max().unwrap_or(0);
            if max_channels > 0 {
                devices.push(DeviceInfo {
                    name: device.name()?,
                    host: host_id,
                    max_channels,
                });
            }
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

fn find_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    match name {
        None => host.default_output_device().ok_or(AudioError::NoDefaultDevice),
        Some(name) => {
            for device in host.output_devices()? {
                if device.name().is_ok_and(|n| n.trim() == name) {
                    return Ok(device);
                }
            }
            Err(AudioError::NoDevice(name.to_string()))
        }
    }
}

/// Picks a supported configuration at the sample rate, preferring the configured
/// channel count and f32 samples.
fn choose_config(
    device: &cpal::Device,
    sample_rate: u32,
    channels: u16,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let rate = cpal::SampleRate(sample_rate);
    device
        .supported_output_configs()?
        .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .filter(|c| {
            matches!(
                c.sample_format(),
                cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
            )
        })
        .min_by_key(|c| {
            (
                c.channels() != channels,
                c.channels().abs_diff(channels),
                c.sample_format() != cpal::SampleFormat::F32,
            )
        })
        .map(|c| c.with_sample_rate(rate))
        .ok_or(AudioError::UnsupportedConfig {
            sample_rate,
            channels,
        })
}

/// A running output stream. Audio stops when this is dropped.
pub struct Output {
    _stream: cpal::Stream,
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

impl Output {
    /// Opens the configured device and starts pulling audio from the renderer.
    pub fn start(config: &config::Audio, renderer: Renderer) -> Result<Output, AudioError> {
        let span = span!(Level::INFO, "audio output");
        let _enter = span.enter();

        let device = find_device(config.device())?;
        let device_name = device.name()?;
        let supported = choose_config(&device, config.sample_rate(), config.channels())?;
        let sample_format = supported.sample_format();
        let mut stream_config = supported.config();
        if let Some(frames) = config.buffer_size() {
            stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
        }
        let channels = stream_config.channels;

        info!(
            device = device_name,
            sample_rate = stream_config.sample_rate.0,
            channels,
            format = ?sample_format,
            buffer_size = ?stream_config.buffer_size,
            "Opening output stream"
        );

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_f32_stream(&device, &stream_config, renderer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, renderer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, renderer)?,
            other => return Err(AudioError::UnsupportedSampleFormat(other)),
        };
        stream.play()?;
        info!(device = device_name, "Output stream started");

        Ok(Output {
            _stream: stream,
            device_name,
            sample_rate: stream_config.sample_rate.0,
            channels,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// f32 devices: the renderer mixes straight into the cpal buffer.
fn build_f32_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> Result<cpal::Stream, AudioError> {
    let channels = usize::from(config.channels);
    let priority = callback_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;

    Ok(device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(priority, rt_audio, &mut priority_set);
            renderer.render(data, channels);
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?)
}

/// Integer devices: mix into a preallocated scratch buffer, then convert.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = usize::from(config.channels);
    let priority = callback_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;
    let mut scratch = vec![0.0f32; SCRATCH_FRAMES * channels.max(1)];

    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(priority, rt_audio, &mut priority_set);
            for chunk in data.chunks_mut(scratch.len()) {
                let mixed = &mut scratch[..chunk.len()];
                renderer.render(mixed, channels);
                for (dst, &src) in chunk.iter_mut().zip(mixed.iter()) {
                    *dst = T::from_sample(src);
                }
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?)
}
