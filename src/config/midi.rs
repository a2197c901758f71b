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

const DEFAULT_LOWEST_NOTE: u8 = 25;
const DEFAULT_FULL_VELOCITY: u8 = 80;

const DEFAULT_DEMO_ATTACK_TIME: u32 = 20_000;
const DEFAULT_DEMO_HOLD: Duration = Duration::from_secs(1);
const DEFAULT_DEMO_GAP: Duration = Duration::from_millis(250);

/// MIDI file playback.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Midi {
    /// MIDI note number of the lowest key (default: 25).
    lowest_note: Option<u8>,

    /// Velocity that plays at full gain (default: 80).
    full_velocity: Option<u8>,
}

impl Midi {
    pub fn lowest_note(&self) -> u8 {
        self.lowest_note.unwrap_or(DEFAULT_LOWEST_NOTE)
    }

    pub fn full_velocity(&self) -> u8 {
        self.full_velocity.unwrap_or(DEFAULT_FULL_VELOCITY)
    }
}

/// The demo sweep across every key.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Demo {
    /// Attack time every key is struck with (default: 20000).
    attack_time: Option<u32>,

    /// How long each key is held (default: 1s).
    hold: Option<String>,

    /// Silence between keys (default: 250ms).
    gap: Option<String>,
}

impl Demo {
    pub fn attack_time(&self) -> u32 {
        self.attack_time.unwrap_or(DEFAULT_DEMO_ATTACK_TIME)
    }

    pub fn hold(&self) -> Result<Duration, ConfigError> {
        parse_duration("demo.hold", self.hold.as_deref(), DEFAULT_DEMO_HOLD)
    }

    pub fn gap(&self) -> Result<Duration, ConfigError> {
        parse_duration("demo.gap", self.gap.as_deref(), DEFAULT_DEMO_GAP)
    }
}
