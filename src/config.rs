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
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

mod audio;
mod envelope;
mod error;
mod keyboard;
mod midi;
mod samples;
mod transport;

pub use self::audio::{Audio, DEFAULT_SAMPLE_RATE};
pub use self::envelope::Envelope;
pub use self::error::ConfigError;
pub use self::keyboard::{
    Keyboard, Velocity, DEFAULT_BOARDS, DEFAULT_EXTRA_KEY_ADDRESS, DEFAULT_KEYS_PER_BOARD,
    DEFAULT_PEDAL_ADDRESS,
};
pub use self::midi::{Demo, Midi};
pub use self::samples::Samples;
pub use self::transport::Transport;

/// The YAML representation of a piano. Every section and field is optional.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PianoConfig {
    audio: Audio,
    samples: Samples,
    keyboard: Keyboard,
    velocity: Velocity,
    envelope: Envelope,
    midi: Midi,
    transport: Transport,
    demo: Demo,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_path: Option<PathBuf>,
}

impl PianoConfig {
    /// Parse a piano configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<PianoConfig, ConfigError> {
        let mut config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<PianoConfig>()?;
        config.base_path = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn velocity(&self) -> &Velocity {
        &self.velocity
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn midi(&self) -> &Midi {
        &self.midi
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn demo(&self) -> &Demo {
        &self.demo
    }

    /// Resolves a configured path against the configuration file's directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
impl PianoConfig {
    pub fn with_samples(samples: Samples) -> PianoConfig {
        PianoConfig {
            samples,
            ..Default::default()
        }
    }

    pub fn with_base_path(mut self, base_path: &Path) -> PianoConfig {
        self.base_path = Some(base_path.to_path_buf());
        self
    }
}

/// Parses an optional duration string such as `"250ms"`, falling back to a default.
fn parse_duration(
    field: &'static str,
    value: Option<&str>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.to_string())
            .map_err(|e| ConfigError::Duration {
                field,
                value: value.to_string(),
                reason: e.to_string(),
            })?
            .into()),
        None => Ok(default),
    }
}
