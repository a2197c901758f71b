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
use std::time::Duration;

use serde::Deserialize;

use super::{parse_duration, ConfigError};
use crate::engine::DEFAULT_POLYPHONY_DIVISOR;

const DEFAULT_ATTACK: Duration = Duration::from_millis(10);
const DEFAULT_RELEASE: Duration = Duration::from_millis(250);

/// Amplitude envelope applied to every voice.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Envelope {
    /// Fade-in at the start of every sound (default: 10ms).
    attack: Option<String>,

    /// Fade-out after release and before the end of a sample (default: 250ms).
    release: Option<String>,

    /// Every voice is divided by this to leave headroom for chords (default: 10).
    polyphony_divisor: Option<u16>,
}

impl Envelope {
    pub fn attack(&self) -> Result<Duration, ConfigError> {
        parse_duration("envelope.attack", self.attack.as_deref(), DEFAULT_ATTACK)
    }

    pub fn release(&self) -> Result<Duration, ConfigError> {
        parse_duration("envelope.release", self.release.as_deref(), DEFAULT_RELEASE)
    }

    pub fn polyphony_divisor(&self) -> u16 {
        self.polyphony_divisor
            .unwrap_or(DEFAULT_POLYPHONY_DIVISOR)
            .max(1)
    }
}
