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

// Core mixing logic shared by the cpal callback and the offline renderer.
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::envelope::Envelope;
use super::table::{Special, VoiceTable};
use crate::samples::SampleStore;

/// Full-scale value of a 16-bit sample.
const SAMPLE_SCALE: f32 = 1.0 / 32768.0;

/// Default headroom divisor applied to every voice.
pub const DEFAULT_POLYPHONY_DIVISOR: u16 = 10;

/// A voice table mutation sent from the dispatcher to the audio context.
#[derive(Debug)]
pub enum VoiceCommand {
    KeyDown { index: usize, volume: f32 },
    KeyUp { index: usize },
    PedalDown,
    PedalUp,
    Special(Special),
    /// Swap in a new store. Note voices rest on its regions.
    Reload(Arc<SampleStore>),
}

/// Creates the bounded queue between a dispatcher and a renderer.
pub fn command_queue(capacity: usize) -> (Sender<VoiceCommand>, Receiver<VoiceCommand>) {
    crossbeam_channel::bounded(capacity)
}

/// The audio-context half of the engine. Owns the voice table and mixes it.
///
/// Nothing here allocates, blocks, or drops the last reference to a store.
pub struct Renderer {
    table: VoiceTable,
    store: Arc<SampleStore>,
    envelope: Envelope,
    /// Scale from a raw 16-bit sample to its attenuated float value.
    sample_gain: f32,
    commands: Receiver<VoiceCommand>,
}

impl Renderer {
    pub fn new(
        store: Arc<SampleStore>,
        note_count: usize,
        envelope: Envelope,
        polyphony_divisor: u16,
        commands: Receiver<VoiceCommand>,
    ) -> Renderer {
        Renderer {
            table: VoiceTable::new(&store, note_count),
            store,
            envelope,
            sample_gain: SAMPLE_SCALE / f32::from(polyphony_divisor.max(1)),
            commands,
        }
    }

    /// Applies every queued command in arrival order.
    pub fn apply_pending(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
    }

    pub fn apply(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::KeyDown { index, volume } => self.table.key_down(index, volume),
            VoiceCommand::KeyUp { index } => self.table.key_up(index),
            VoiceCommand::PedalDown => self.table.pedal_down(),
            VoiceCommand::PedalUp => self.table.pedal_up(),
            VoiceCommand::Special(special) => self.table.play_special(special),
            VoiceCommand::Reload(store) => {
                self.table.reassign_notes(&store);
                // The dispatcher still holds the outgoing store, so this drop only
                // decrements its count.
                self.store = store;
            }
        }
    }

    /// Mixes one mono frame and advances every playing voice.
    pub fn mix_frame(&mut self) -> f32 {
        let pedal_up = self.table.is_pedal_up();
        let mut mix = 0.0;
        for voice in self.table.voices_mut() {
            if !voice.is_playing() {
                continue;
            }
            let sample = f32::from(voice.current_sample(&self.store)) * self.sample_gain;
            mix += voice.render(sample, &self.envelope, pedal_up);
        }
        mix
    }

    /// Fills an interleaved buffer, writing the same mix to every channel.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.apply_pending();
        if channels == 0 {
            return;
        }
        for frame in out.chunks_exact_mut(channels) {
            let sample = self.mix_frame();
            frame.fill(sample);
        }
    }

    pub fn table(&self) -> &VoiceTable {
        &self.table
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn store(&self) -> &Arc<SampleStore> {
        &self.store
    }

    /// Whether any voice is still sounding.
    pub fn is_active(&self) -> bool {
        self.table.active() > 0
    }
}
