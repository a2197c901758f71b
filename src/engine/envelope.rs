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

use super::voice::Voice;
use crate::util::duration_frames;

/// Attack and release windows, in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    attack_len: usize,
    release_len: usize,
}

impl Envelope {
    pub fn new(attack_len: usize, release_len: usize) -> Envelope {
        Envelope {
            attack_len,
            release_len,
        }
    }

    /// Converts attack and release durations to windows at a sample rate.
    pub fn from_durations(attack: Duration, release: Duration, sample_rate: u32) -> Envelope {
        let frames = |d| usize::try_from(duration_frames(d, sample_rate)).unwrap_or(usize::MAX);
        Envelope::new(frames(attack), frames(release))
    }

    pub fn attack_len(&self) -> usize {
        self.attack_len
    }

    pub fn release_len(&self) -> usize {
        self.release_len
    }

    /// Gain of the attack ramp `offset` samples into a sound.
    pub fn attack_gain(&self, offset: usize) -> f32 {
        if offset >= self.attack_len {
            1.0
        } else {
            offset as f32 / self.attack_len as f32
        }
    }

    /// Gain of the release ramp `elapsed` samples after the release point.
    pub fn release_gain(&self, elapsed: usize) -> f32 {
        if elapsed >= self.release_len {
            0.0
        } else {
            (self.release_len - elapsed) as f32 / self.release_len as f32
        }
    }
}

/// Where a voice is in its envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoicePhase {
    Rest,
    Attack,
    Sustain,
    Release,
}

/// Classifies a voice. A releasing voice reports `Release` even inside the attack window.
pub fn voice_phase(voice: &Voice, envelope: &Envelope, pedal_up: bool) -> VoicePhase {
    if !voice.is_playing() {
        VoicePhase::Rest
    } else if voice.is_releasing(pedal_up) {
        VoicePhase::Release
    } else if voice.position() - voice.first_sample_pos() < envelope.attack_len() {
        VoicePhase::Attack
    } else {
        VoicePhase::Sustain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Region;

    #[test]
    fn test_from_durations() {
        let envelope =
            Envelope::from_durations(Duration::from_millis(10), Duration::from_millis(250), 44100);
        assert_eq!(envelope.attack_len(), 441);
        assert_eq!(envelope.release_len(), 11025);
    }

    #[test]
    fn test_ramps() {
        let envelope = Envelope::new(4, 4);
        assert_eq!(envelope.attack_gain(0), 0.0);
        assert_eq!(envelope.attack_gain(2), 0.5);
        assert_eq!(envelope.attack_gain(4), 1.0);
        assert_eq!(envelope.release_gain(0), 1.0);
        assert_eq!(envelope.release_gain(1), 0.75);
        assert_eq!(envelope.release_gain(4), 0.0);
    }

    #[test]
    fn test_zero_windows() {
        let envelope = Envelope::new(0, 0);
        assert_eq!(envelope.attack_gain(0), 1.0);
        assert_eq!(envelope.release_gain(0), 0.0);
    }

    #[test]
    fn test_phases() {
        let envelope = Envelope::new(2, 2);
        let mut voice = Voice::at_rest(Region::new(0, 100));
        assert_eq!(voice_phase(&voice, &envelope, true), VoicePhase::Rest);

        voice.trigger(1.0);
        assert_eq!(voice_phase(&voice, &envelope, true), VoicePhase::Attack);

        voice.render(0.0, &envelope, true);
        voice.render(0.0, &envelope, true);
        assert_eq!(voice_phase(&voice, &envelope, true), VoicePhase::Sustain);

        voice.release_key();
        assert_eq!(voice_phase(&voice, &envelope, true), VoicePhase::Release);
        // A held pedal keeps the sound sustaining.
        assert_eq!(voice_phase(&voice, &envelope, false), VoicePhase::Sustain);
    }

    #[test]
    fn test_release_wins_over_attack() {
        let envelope = Envelope::new(10, 2);
        let mut voice = Voice::at_rest(Region::new(0, 100));
        voice.trigger(1.0);
        voice.release_key();
        assert_eq!(voice_phase(&voice, &envelope, true), VoicePhase::Release);
    }
}
