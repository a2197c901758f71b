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
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, span, warn, Level, Span};

use crate::config::{ConfigError, PianoConfig};
use crate::engine::{
    command_queue, DispatchError, Dispatcher, Envelope, KeyMap, KeyMapError, Renderer, Special,
    VelocityCurve,
};
use crate::events::{Event, EventSource, Next};
use crate::program::{ProgramBank, ProgramStore};
use crate::samples::SampleLoader;

/// Commands that may be in flight between the dispatcher and the audio context.
const COMMAND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum PianoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    KeyMap(#[from] KeyMapError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// What a run through an event source did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events: usize,
    pub dropped: usize,
    pub idle: usize,
}

/// The foreground side of a piano: configuration, key map and the dispatcher
/// feeding its renderer.
pub struct Piano {
    dispatcher: Dispatcher,
    keymap: KeyMap,
    envelope: Envelope,
    sample_rate: u32,
    span: Span,
}

impl Piano {
    /// Loads the sounds and wires a dispatcher to a new renderer. The renderer
    /// goes to whatever produces audio.
    pub fn build(config: &PianoConfig) -> Result<(Piano, Renderer), PianoError> {
        let span = span!(Level::INFO, "piano");
        let guard = span.enter();

        let keymap = KeyMap::from_config(config.keyboard())?;
        let note_count = keymap.note_count();
        let sample_rate = config.audio().sample_rate();
        let envelope = Envelope::from_durations(
            config.envelope().attack()?,
            config.envelope().release()?,
            sample_rate,
        );

        let samples = config.samples();
        let directories: Vec<PathBuf> = samples
            .programs()
            .iter()
            .map(|dir| config.resolve(dir))
            .collect();
        let specials = samples.specials().map(|dir| config.resolve(dir));
        let state = ProgramStore::new(samples.program_file().map(|file| config.resolve(file)));
        let bank = ProgramBank::open(
            directories,
            specials.as_deref(),
            samples.capacity_bytes(),
            note_count,
            SampleLoader::new(sample_rate),
            state,
        );
        info!(
            notes = note_count,
            programs = bank.count(),
            program = bank.program(),
            attack = envelope.attack_len(),
            release = envelope.release_len(),
            "Piano built"
        );

        let (tx, rx) = command_queue(COMMAND_QUEUE_CAPACITY);
        let renderer = Renderer::new(
            bank.current().clone(),
            note_count,
            envelope,
            config.envelope().polyphony_divisor(),
            rx,
        );
        let dispatcher = Dispatcher::new(
            tx,
            VelocityCurve::from_config(config.velocity())?,
            config.midi().full_velocity(),
            note_count,
        )
        .with_programs(bank);

        drop(guard);
        Ok((
            Piano {
                dispatcher,
                keymap,
                envelope,
                sample_rate,
                span,
            },
            renderer,
        ))
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn note_count(&self) -> usize {
        self.keymap.note_count()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// How long a released note can keep sounding.
    pub fn release_tail(&self) -> Duration {
        let frames = (self.envelope.attack_len() + self.envelope.release_len()) as u64;
        Duration::from_nanos(frames * 1_000_000_000 / u64::from(self.sample_rate.max(1)))
    }

    /// Plays the ready sound.
    pub fn ready(&self) -> Result<(), PianoError> {
        Ok(self.dispatcher.play_special(Special::Ready)?)
    }

    /// Feeds every event from a source to the dispatcher until the source ends.
    /// Events that cannot be dispatched are logged and dropped.
    pub fn run(&mut self, source: &mut dyn EventSource) -> RunStats {
        let _enter = self.span.enter();
        let mut stats = RunStats::default();

        loop {
            match source.next_event() {
                Next::Event(event) => {
                    match self.dispatcher.dispatch(event) {
                        Ok(()) => stats.events += 1,
                        Err(e) => {
                            warn!(err = %e, event = ?event, "Dropping event");
                            stats.dropped += 1;
                        }
                    }
                    if matches!(event, Event::Program(_)) {
                        self.dispatcher.housekeeping();
                    }
                }
                Next::Idle => {
                    stats.idle += 1;
                    self.dispatcher.housekeeping();
                }
                Next::EndOfStream => {
                    info!("Event stream ended");
                    break;
                }
            }
        }

        info!(
            events = stats.events,
            dropped = stats.dropped,
            "Finished playing"
        );
        stats
    }
}
