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
use serde::Deserialize;

pub const DEFAULT_KEYS_PER_BOARD: u16 = 7;
pub const DEFAULT_BOARDS: u16 = 14;
pub const DEFAULT_EXTRA_KEY_ADDRESS: u16 = 6;
pub const DEFAULT_PEDAL_ADDRESS: u16 = 48;

const DEFAULT_MIN_ATTACK_TIME: u32 = 10_000;
const DEFAULT_MAX_ATTACK_TIME: u32 = 100_000;
const DEFAULT_MIN_GAIN: f32 = 0.1;
const DEFAULT_MAX_GAIN: f32 = 1.0;

/// Layout of the key scanner.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Keyboard {
    /// Inputs per scanner board, the last one being spare (default: 7).
    keys_per_board: Option<u16>,

    /// Number of scanner boards (default: 14).
    boards: Option<u16>,

    /// Spare input wired to the lowest key (default: 6).
    extra_key_address: Option<u16>,

    /// Spare input wired to the sustain pedal (default: 48).
    pedal_address: Option<u16>,
}

impl Keyboard {
    pub fn keys_per_board(&self) -> u16 {
        self.keys_per_board.unwrap_or(DEFAULT_KEYS_PER_BOARD)
    }

    pub fn boards(&self) -> u16 {
        self.boards.unwrap_or(DEFAULT_BOARDS)
    }

    pub fn extra_key_address(&self) -> u16 {
        self.extra_key_address.unwrap_or(DEFAULT_EXTRA_KEY_ADDRESS)
    }

    pub fn pedal_address(&self) -> u16 {
        self.pedal_address.unwrap_or(DEFAULT_PEDAL_ADDRESS)
    }
}

/// Attack time to gain curve. Attack times are in scanner ticks.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Velocity {
    /// Attack time at or below which keys play at `max_gain` (default: 10000).
    min_attack_time: Option<u32>,

    /// Attack time at or above which keys play at `min_gain` (default: 100000).
    max_attack_time: Option<u32>,

    /// Quietest gain (default: 0.1).
    min_gain: Option<f32>,

    /// Loudest gain (default: 1.0).
    max_gain: Option<f32>,
}

impl Velocity {
    pub fn min_attack_time(&self) -> u32 {
        self.min_attack_time.unwrap_or(DEFAULT_MIN_ATTACK_TIME)
    }

    pub fn max_attack_time(&self) -> u32 {
        self.max_attack_time.unwrap_or(DEFAULT_MAX_ATTACK_TIME)
    }

    pub fn min_gain(&self) -> f32 {
        self.min_gain.unwrap_or(DEFAULT_MIN_GAIN)
    }

    pub fn max_gain(&self) -> f32 {
        self.max_gain.unwrap_or(DEFAULT_MAX_GAIN)
    }
}

#[cfg(test)]
impl Velocity {
    pub fn with_gains(min_gain: f32, max_gain: f32) -> Velocity {
        Velocity {
            min_gain: Some(min_gain),
            max_gain: Some(max_gain),
            ..Default::default()
        }
    }
}
