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
use super::voice::Voice;
use crate::samples::SampleStore;

/// Sounds that are not piano notes. They follow the notes in the voice table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Special {
    /// Played at startup and after a program finishes loading.
    Ready,
    /// Played while a program is loading.
    ProgramLoading,
}

impl Special {
    pub const COUNT: usize = 2;

    /// Offset of the sound among the specials.
    pub fn offset(self) -> usize {
        match self {
            Special::Ready => 0,
            Special::ProgramLoading => 1,
        }
    }
}

/// The fixed set of voices, one per sound: notes first, then specials.
///
/// The table also carries the global sustain pedal state. Out-of-range indices
/// are ignored.
#[derive(Debug)]
pub struct VoiceTable {
    voices: Box<[Voice]>,
    note_count: usize,
    pedal_up: bool,
}

impl VoiceTable {
    /// Builds a resting table over the regions recorded in a store.
    pub fn new(store: &SampleStore, note_count: usize) -> VoiceTable {
        let voices = (0..note_count + Special::COUNT)
            .map(|sound| Voice::at_rest(store.region(sound)))
            .collect();
        VoiceTable {
            voices,
            note_count,
            pedal_up: true,
        }
    }

    /// Points the note voices at a new store's regions and puts them at rest.
    /// Special voices are left untouched.
    pub fn reassign_notes(&mut self, store: &SampleStore) {
        for (sound, voice) in self.voices[..self.note_count].iter_mut().enumerate() {
            voice.assign(store.region(sound));
        }
    }

    pub fn key_down(&mut self, index: usize, volume: f32) {
        if let Some(voice) = self.note_mut(index) {
            voice.trigger(volume);
        }
    }

    pub fn key_up(&mut self, index: usize) {
        if let Some(voice) = self.note_mut(index) {
            voice.release_key();
        }
    }

    pub fn pedal_down(&mut self) {
        self.pedal_up = false;
        for voice in self.voices[..self.note_count].iter_mut() {
            voice.engage_pedal();
        }
    }

    pub fn pedal_up(&mut self) {
        for voice in self.voices[..self.note_count].iter_mut() {
            voice.lift_pedal();
        }
        self.pedal_up = true;
    }

    pub fn play_special(&mut self, special: Special) {
        if let Some(voice) = self.voices.get_mut(self.note_count + special.offset()) {
            voice.trigger(1.0);
        }
    }

    fn note_mut(&mut self, index: usize) -> Option<&mut Voice> {
        if index < self.note_count {
            self.voices.get_mut(index)
        } else {
            None
        }
    }

    pub fn is_pedal_up(&self) -> bool {
        self.pedal_up
    }

    pub fn note_count(&self) -> usize {
        self.note_count
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn special(&self, special: Special) -> Option<&Voice> {
        self.voices.get(self.note_count + special.offset())
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Number of voices currently sounding.
    pub fn active(&self) -> usize {
        self.voices.iter().filter(|v| v.is_playing()).count()
    }
}
