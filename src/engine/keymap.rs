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

//! Scanner address to logical key mapping.
//!
//! The scanner is built from identical boards of `keys_per_board` inputs. The last
//! input of every board is spare. Two spare inputs are wired: one to the lowest
//! key of the keyboard and one to the sustain pedal.

use thiserror::Error;

use crate::config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyMapError {
    #[error("scanner address {0} is past the last board")]
    OutOfRange(u16),

    #[error("scanner address {0} is a spare input with nothing connected")]
    Unconnected(u16),

    #[error("invalid key layout: {0}")]
    InvalidLayout(String),
}

/// What a logical index addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Note(usize),
    Pedal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMap {
    keys_per_board: u16,
    boards: u16,
    extra_key_address: u16,
    pedal_address: u16,
}

impl KeyMap {
    pub fn new(
        keys_per_board: u16,
        boards: u16,
        extra_key_address: u16,
        pedal_address: u16,
    ) -> Result<KeyMap, KeyMapError> {
        if keys_per_board < 2 || boards == 0 {
            return Err(KeyMapError::InvalidLayout(format!(
                "{} boards of {} keys",
                boards, keys_per_board
            )));
        }
        let map = KeyMap {
            keys_per_board,
            boards,
            extra_key_address,
            pedal_address,
        };
        for (name, address) in [("extra key", extra_key_address), ("pedal", pedal_address)] {
            if !map.is_spare(address) || address >= map.address_count() {
                return Err(KeyMapError::InvalidLayout(format!(
                    "{} address {} is not a spare input",
                    name, address
                )));
            }
        }
        if extra_key_address == pedal_address {
            return Err(KeyMapError::InvalidLayout(
                "extra key and pedal share an address".to_string(),
            ));
        }
        Ok(map)
    }

    pub fn from_config(keyboard: &config::Keyboard) -> Result<KeyMap, KeyMapError> {
        KeyMap::new(
            keyboard.keys_per_board(),
            keyboard.boards(),
            keyboard.extra_key_address(),
            keyboard.pedal_address(),
        )
    }

    /// Number of note keys, which is also the pedal's logical index.
    pub fn note_count(&self) -> usize {
        1 + usize::from(self.boards) * usize::from(self.keys_per_board - 1)
    }

    pub fn pedal_index(&self) -> usize {
        self.note_count()
    }

    fn address_count(&self) -> u16 {
        self.boards.saturating_mul(self.keys_per_board)
    }

    fn is_spare(&self, address: u16) -> bool {
        address % self.keys_per_board == self.keys_per_board - 1
    }

    /// Maps a raw scanner address to a logical index in `0..=pedal_index()`.
    pub fn map_physical_to_logical(&self, raw: u16) -> Result<usize, KeyMapError> {
        if raw >= self.address_count() {
            return Err(KeyMapError::OutOfRange(raw));
        }
        if raw == self.extra_key_address {
            return Ok(0);
        }
        if raw == self.pedal_address {
            return Ok(self.pedal_index());
        }
        if self.is_spare(raw) {
            return Err(KeyMapError::Unconnected(raw));
        }
        let raw = usize::from(raw);
        Ok(raw + 1 - raw / usize::from(self.keys_per_board))
    }

    /// Maps a raw scanner address to what it addresses.
    pub fn key(&self, raw: u16) -> Result<Key, KeyMapError> {
        let index = self.map_physical_to_logical(raw)?;
        if index == self.pedal_index() {
            Ok(Key::Pedal)
        } else {
            Ok(Key::Note(index))
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        KeyMap {
            keys_per_board: config::DEFAULT_KEYS_PER_BOARD,
            boards: config::DEFAULT_BOARDS,
            extra_key_address: config::DEFAULT_EXTRA_KEY_ADDRESS,
            pedal_address: config::DEFAULT_PEDAL_ADDRESS,
        }
    }
}
