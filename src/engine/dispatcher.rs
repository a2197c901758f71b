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
use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, info};

use super::mixer::VoiceCommand;
use super::table::Special;
use super::velocity::{midi_volume, VelocityCurve};
use crate::events::{Event, Strike};
use crate::program::{ProgramBank, ProgramError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("key {key} is outside the keyboard ({count} keys)")]
    UnknownKey { key: usize, count: usize },

    #[error("voice command queue is full, event dropped")]
    QueueFull,

    #[error("the audio context has gone away")]
    Disconnected,

    #[error("no programs are configured")]
    NoPrograms,

    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// The foreground half of the engine: turns events into voice commands.
pub struct Dispatcher {
    commands: Sender<VoiceCommand>,
    velocity: VelocityCurve,
    full_velocity: u8,
    note_count: usize,
    programs: Option<ProgramBank>,
}

impl Dispatcher {
    pub fn new(
        commands: Sender<VoiceCommand>,
        velocity: VelocityCurve,
        full_velocity: u8,
        note_count: usize,
    ) -> Dispatcher {
        Dispatcher {
            commands,
            velocity,
            full_velocity,
            note_count,
            programs: None,
        }
    }

    /// Enables program changes.
    pub fn with_programs(mut self, programs: ProgramBank) -> Dispatcher {
        self.programs = Some(programs);
        self
    }

    pub fn programs(&self) -> Option<&ProgramBank> {
        self.programs.as_ref()
    }

    /// Gain for a strike.
    pub fn volume(&self, strike: Strike) -> f32 {
        match strike {
            Strike::AttackTime(attack_time) => self.velocity.compute_volume(attack_time),
            Strike::Velocity(velocity) => midi_volume(velocity, self.full_velocity),
        }
    }

    pub fn dispatch(&mut self, event: Event) -> Result<(), DispatchError> {
        match event {
            Event::KeyDown { key, strike } => {
                self.check_key(key)?;
                let volume = self.volume(strike);
                debug!(key, volume, "Key down");
                send(&self.commands, VoiceCommand::KeyDown { index: key, volume })
            }
            Event::KeyUp { key } => {
                self.check_key(key)?;
                debug!(key, "Key up");
                send(&self.commands, VoiceCommand::KeyUp { index: key })
            }
            Event::PedalDown => {
                debug!("Pedal down");
                send(&self.commands, VoiceCommand::PedalDown)
            }
            Event::PedalUp => {
                debug!("Pedal up");
                send(&self.commands, VoiceCommand::PedalUp)
            }
            Event::Program(program) => self.change_program(program),
        }
    }

    pub fn play_special(&self, special: Special) -> Result<(), DispatchError> {
        send(&self.commands, VoiceCommand::Special(special))
    }

    /// Releases sample stores the audio context no longer uses.
    pub fn housekeeping(&mut self) {
        if let Some(programs) = self.programs.as_mut() {
            programs.collect_retired();
        }
    }

    fn change_program(&mut self, program: u8) -> Result<(), DispatchError> {
        let Some(programs) = self.programs.as_mut() else {
            return Err(DispatchError::NoPrograms);
        };
        programs.check(program)?;

        info!(program, "Loading program");
        send(&self.commands, VoiceCommand::Special(Special::ProgramLoading))?;
        let store = programs.prepare(program)?;
        // Commit only once the audio context is guaranteed to receive the store.
        send(&self.commands, VoiceCommand::Reload(store.clone()))?;
        programs.commit(program, store);
        send(&self.commands, VoiceCommand::Special(Special::Ready))
    }

    fn check_key(&self, key: usize) -> Result<(), DispatchError> {
        if key < self.note_count {
            Ok(())
        } else {
            Err(DispatchError::UnknownKey {
                key,
                count: self.note_count,
            })
        }
    }
}

fn send(commands: &Sender<VoiceCommand>, command: VoiceCommand) -> Result<(), DispatchError> {
    commands.try_send(command).map_err(|e| match e {
        TrySendError::Full(_) => DispatchError::QueueFull,
        TrySendError::Disconnected(_) => DispatchError::Disconnected,
    })
}
