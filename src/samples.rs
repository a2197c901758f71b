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

//! Sample storage for the piano sounds.
//!
//! This module provides:
//! - A fixed-capacity store holding every sound's 16-bit PCM back to back
//! - Loading of numbered WAV directories into the store

mod loader;
mod store;

pub use loader::{scan_directory, LoadError, LoadReport, SampleLoader};
pub use store::{Region, SampleStore, StoreError, DEFAULT_CAPACITY_BYTES};
