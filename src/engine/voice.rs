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

//! Per-sound playback state.
//!
//! There is exactly one voice per sound. Pressing a key that is already sounding
//! restarts its voice from the beginning rather than stacking a second one.

use std::fmt;

use super::envelope::Envelope;
use crate::samples::{Region, SampleStore};

/// Playback state of one sound.
///
/// At rest a voice sits at `first_sample_pos` with every release marker there
/// too and zero volume. Positions only move forward while playing.
#[derive(Clone, Default, PartialEq)]
pub struct Voice {
    /// First sample of the sound in the store.
    first_sample_pos: usize,
    /// One past the last sample of the sound.
    last_sample_pos: usize,
    /// Length of the sound.
    nb_samples: usize,
    /// Whether the voice contributes to the mix.
    playing: bool,
    /// Next sample to play.
    cur_playing_pos: usize,
    /// Whether the key has been released since the last trigger.
    key_up: bool,
    /// Position at which the key was released.
    key_up_pos: usize,
    /// Position at which the pedal was last lifted while sounding.
    pedal_up_pos: usize,
    /// Whether the voice is within one release window of the end of its sample.
    sound_end_soon: bool,
    /// Gain chosen at trigger time.
    volume: f32,
}

impl Voice {
    /// Creates a resting voice over a store region.
    pub fn at_rest(region: Region) -> Voice {
        let mut voice = Voice::default();
        voice.assign(region);
        voice
    }

    /// Points the voice at a new region and puts it at rest.
    pub fn assign(&mut self, region: Region) {
        self.first_sample_pos = region.first();
        self.last_sample_pos = region.last();
        self.nb_samples = region.len();
        self.rest();
    }

    /// Returns the voice to rest at the start of its region.
    pub fn rest(&mut self) {
        self.playing = false;
        self.cur_playing_pos = self.first_sample_pos;
        self.key_up = false;
        self.key_up_pos = self.first_sample_pos;
        self.pedal_up_pos = self.first_sample_pos;
        self.sound_end_soon = false;
        self.volume = 0.0;
    }

    /// Starts (or restarts) the sound from its first sample. Any release in
    /// progress is discarded. `playing` is set last.
    pub fn trigger(&mut self, volume: f32) {
        self.volume = volume;
        self.cur_playing_pos = self.first_sample_pos;
        self.key_up_pos = self.first_sample_pos;
        self.pedal_up_pos = self.first_sample_pos;
        self.key_up = false;
        self.sound_end_soon = false;
        self.playing = true;
    }

    /// Records the key release at the current position.
    pub fn release_key(&mut self) {
        self.key_up_pos = self.cur_playing_pos;
        self.key_up = true;
    }

    /// The pedal went down: a later pedal release counts from scratch.
    pub fn engage_pedal(&mut self) {
        self.pedal_up_pos = self.first_sample_pos;
    }

    /// The pedal came up at the current position.
    pub fn lift_pedal(&mut self) {
        self.pedal_up_pos = self.cur_playing_pos;
    }

    /// Whether the voice is fading out, given the global pedal state.
    pub fn is_releasing(&self, pedal_up: bool) -> bool {
        (self.key_up && pedal_up) || self.sound_end_soon
    }

    /// The position the release ramp counts from: whichever of key and pedal
    /// let go last.
    pub fn release_pos(&self) -> usize {
        self.key_up_pos.max(self.pedal_up_pos)
    }

    /// The sample the voice reads next, or silence once it has run off its region.
    pub fn current_sample(&self, store: &SampleStore) -> i16 {
        if self.cur_playing_pos < self.last_sample_pos {
            store.sample(self.cur_playing_pos)
        } else {
            0
        }
    }

    /// Produces the voice's contribution to one frame and advances it.
    ///
    /// `sample` is the current sample already scaled to float and attenuated for
    /// polyphony. Once the release ramp completes the voice returns to rest and
    /// contributes nothing.
    pub fn render(&mut self, sample: f32, envelope: &Envelope, pedal_up: bool) -> f32 {
        if !self.playing {
            return 0.0;
        }

        let mut out = sample * self.volume;
        out *= envelope.attack_gain(self.cur_playing_pos - self.first_sample_pos);

        // Start fading before the sample runs out so it never cuts off abruptly.
        if !self.sound_end_soon
            && self.last_sample_pos - self.cur_playing_pos <= envelope.release_len()
        {
            // A release already under way keeps its start so the gain never jumps back up.
            let release_from = if self.is_releasing(pedal_up) {
                self.release_pos()
            } else {
                self.cur_playing_pos
            };
            self.key_up_pos = release_from;
            self.pedal_up_pos = release_from;
            self.sound_end_soon = true;
        }

        if self.is_releasing(pedal_up) {
            let elapsed = self.cur_playing_pos.saturating_sub(self.release_pos());
            let ran_out = self.sound_end_soon && self.cur_playing_pos >= self.last_sample_pos;
            if elapsed >= envelope.release_len() || ran_out {
                self.rest();
                return 0.0;
            }
            out *= envelope.release_gain(elapsed);
        }

        if self.cur_playing_pos < self.last_sample_pos {
            self.cur_playing_pos += 1;
        }
        out
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> usize {
        self.cur_playing_pos
    }

    pub fn first_sample_pos(&self) -> usize {
        self.first_sample_pos
    }

    pub fn last_sample_pos(&self) -> usize {
        self.last_sample_pos
    }

    pub fn nb_samples(&self) -> usize {
        self.nb_samples
    }

    pub fn key_up(&self) -> bool {
        self.key_up
    }

    pub fn key_up_pos(&self) -> usize {
        self.key_up_pos
    }

    pub fn pedal_up_pos(&self) -> usize {
        self.pedal_up_pos
    }

    pub fn sound_end_soon(&self) -> bool {
        self.sound_end_soon
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Checks the resting invariant.
    pub fn is_at_rest(&self) -> bool {
        !self.playing
            && self.cur_playing_pos == self.first_sample_pos
            && self.key_up_pos == self.first_sample_pos
            && self.pedal_up_pos == self.first_sample_pos
            && self.volume == 0.0
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("region", &(self.first_sample_pos..self.last_sample_pos))
            .field("playing", &self.playing)
            .field("pos", &self.cur_playing_pos)
            .field("key_up", &self.key_up)
            .field("key_up_pos", &self.key_up_pos)
            .field("pedal_up_pos", &self.pedal_up_pos)
            .field("end_soon", &self.sound_end_soon)
            .field("volume", &self.volume)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(voice: &mut Voice, envelope: &Envelope, pedal_up: bool, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|_| voice.render(1.0, envelope, pedal_up))
            .collect()
    }

    #[test]
    fn test_at_rest() {
        let voice = Voice::at_rest(Region::new(10, 5));
        assert!(voice.is_at_rest());
        assert_eq!(voice.position(), 10);
        assert_eq!(voice.last_sample_pos(), 15);
        assert_eq!(voice.nb_samples(), 5);
    }

    #[test]
    fn test_trigger_starts_at_first_sample() {
        let mut voice = Voice::at_rest(Region::new(10, 100));
        voice.trigger(0.5);
        assert!(voice.is_playing());
        assert_eq!(voice.position(), 10);
        assert_eq!(voice.volume(), 0.5);
        assert!(!voice.key_up());
    }

    #[test]
    fn test_attack_ramp() {
        let envelope = Envelope::new(4, 2);
        let mut voice = Voice::at_rest(Region::new(0, 100));
        voice.trigger(1.0);

        let out = run(&mut voice, &envelope, true, 6);
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
    }

    #[test]
    fn test_release_ramp_then_rest() {
        let envelope = Envelope::new(0, 4);
        let mut voice = Voice::at_rest(Region::new(0, 100));
        voice.trigger(1.0);
        run(&mut voice, &envelope, true, 10);

        voice.release_key();
        assert_eq!(voice.key_up_pos(), 10);
        let out = run(&mut voice, &envelope, true, 4);
        assert_eq!(out, vec![1.0, 0.75, 0.5, 0.25]);
        assert!(voice.is_playing());

        assert_eq!(voice.render(1.0, &envelope, true), 0.0);
        assert!(voice.is_at_rest());

        // Further frames change nothing.
        assert_eq!(run(&mut voice, &envelope, true, 3), vec![0.0; 3]);
        assert!(voice.is_at_rest());
    }

    #[test]
    fn test_pedal_sustains_released_key() {
        let envelope = Envelope::new(0, 4);
        let mut voice = Voice::at_rest(Region::new(0, 100));
        voice.trigger(1.0);
        voice.engage_pedal();
        run(&mut voice, &envelope, false, 5);
        voice.release_key();

        let out = run(&mut voice, &envelope, false, 20);
        assert!(out.iter().all(|s| *s == 1.0));

        voice.lift_pedal();
        assert_eq!(voice.release_pos(), 25);
        let out = run(&mut voice, &envelope, true, 4);
        assert_eq!(out, vec![1.0, 0.75, 0.5, 0.25]);
        voice.render(1.0, &envelope, true);
        assert!(voice.is_at_rest());
    }

    #[test]
    fn test_end_of_sample_pre_arm() {
        let envelope = Envelope::new(0, 4);
        let mut voice = Voice::at_rest(Region::new(0, 10));
        voice.trigger(1.0);

        let out = run(&mut voice, &envelope, true, 6);
        assert_eq!(out[..6], [1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(!voice.sound_end_soon());

        // At position 6 the end is one release window away.
        let out = run(&mut voice, &envelope, true, 4);
        assert!(voice.sound_end_soon());
        assert_eq!(out, vec![1.0, 0.75, 0.5, 0.25]);
        assert_eq!(voice.key_up_pos(), 6);

        voice.render(1.0, &envelope, true);
        assert!(voice.is_at_rest());
    }

    #[test]
    fn test_pre_arm_keeps_running_release() {
        let envelope = Envelope::new(0, 8);
        let mut voice = Voice::at_rest(Region::new(0, 20));
        voice.trigger(1.0);
        run(&mut voice, &envelope, true, 10);
        voice.release_key();
        run(&mut voice, &envelope, true, 2);
        assert!(!voice.sound_end_soon());

        // Position 12 is one window away from the end at 20.
        voice.render(1.0, &envelope, true);
        assert!(voice.sound_end_soon());
        assert_eq!(voice.key_up_pos(), 10);
        assert_eq!(voice.pedal_up_pos(), 10);
    }

    #[test]
    fn test_short_sample_completes() {
        let envelope = Envelope::new(0, 50);
        let mut voice = Voice::at_rest(Region::new(0, 5));
        voice.trigger(1.0);

        let out = run(&mut voice, &envelope, true, 6);
        assert_eq!(out[5], 0.0);
        assert!(voice.is_at_rest());
    }

    #[test]
    fn test_empty_region_never_sounds() {
        let envelope = Envelope::new(0, 4);
        let mut voice = Voice::at_rest(Region::new(3, 0));
        voice.trigger(1.0);
        assert_eq!(voice.render(1.0, &envelope, true), 0.0);
        assert!(voice.is_at_rest());
    }

    #[test]
    fn test_retrigger_mid_release() {
        let envelope = Envelope::new(0, 4);
        let mut voice = Voice::at_rest(Region::new(0, 100));
        voice.trigger(1.0);
        run(&mut voice, &envelope, true, 10);
        voice.release_key();
        run(&mut voice, &envelope, true, 2);

        voice.trigger(0.5);
        assert_eq!(voice.position(), 0);
        assert_eq!(voice.key_up_pos(), 0);
        assert_eq!(voice.pedal_up_pos(), 0);
        assert!(!voice.key_up());
        assert!(!voice.sound_end_soon());

        let out = run(&mut voice, &envelope, true, 10);
        assert!(out.iter().all(|s| *s == 0.5));
    }

    #[test]
    fn test_positions_stay_in_region() {
        let envelope = Envelope::new(3, 5);
        let mut voice = Voice::at_rest(Region::new(100, 30));
        voice.trigger(1.0);
        for frame in 0..200 {
            if frame == 7 {
                voice.release_key();
            }
            voice.render(1.0, &envelope, frame % 3 == 0);
            assert!(voice.position() >= voice.first_sample_pos());
            assert!(voice.position() <= voice.last_sample_pos());
            assert!(voice.release_pos() <= voice.position());
        }
    }
}
