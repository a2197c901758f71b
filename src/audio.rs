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

//! Audio egress: a live cpal stream or an offline WAV render.

use thiserror::Error;

pub mod cpal;
pub mod render;
mod thread_priority;

pub use self::cpal::{list_devices, DeviceInfo, Output};
pub use self::render::{render_schedule, render_to_wav, RenderStats};

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no output device found with name {0}")]
    NoDevice(String),

    #[error("the host has no default output device")]
    NoDefaultDevice,

    #[error("device does not support {sample_rate} Hz output with a usable sample format ({channels} channels requested)")]
    UnsupportedConfig { sample_rate: u32, channels: u16 },

    #[error("unsupported sample format {0:?}")]
    UnsupportedSampleFormat(::cpal::SampleFormat),

    #[error(transparent)]
    HostUnavailable(#[from] ::cpal::HostUnavailable),

    #[error(transparent)]
    Devices(#[from] ::cpal::DevicesError),

    #[error(transparent)]
    DeviceName(#[from] ::cpal::DeviceNameError),

    #[error(transparent)]
    SupportedConfigs(#[from] ::cpal::SupportedStreamConfigsError),

    #[error(transparent)]
    BuildStream(#[from] ::cpal::BuildStreamError),

    #[error(transparent)]
    PlayStream(#[from] ::cpal::PlayStreamError),

    #[error("unable to write WAV output: {0}")]
    Wav(#[from] hound::Error),
}
