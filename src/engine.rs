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

//! The polyphonic sample playback engine.
//!
//! This module provides:
//! - One voice per sound with attack and release envelopes
//! - The mixer run from the audio callback
//! - The dispatcher that turns keyboard events into voice commands
//! - Key address mapping and the attack-time gain curve
//!
//! The dispatcher and the renderer only talk through a bounded command queue.
//! The renderer owns the voice table outright.

mod dispatcher;
mod envelope;
mod keymap;
mod mixer;
mod table;
mod velocity;
mod voice;

pub use dispatcher::{DispatchError, Dispatcher};
pub use envelope::{voice_phase, Envelope, VoicePhase};
pub use keymap::{Key, KeyMap, KeyMapError};
pub use mixer::{command_queue, Renderer, VoiceCommand, DEFAULT_POLYPHONY_DIVISOR};
pub use table::{Special, VoiceTable};
pub use velocity::{midi_volume, VelocityCurve};
pub use voice::Voice;
