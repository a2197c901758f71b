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
use crate::config::{self, ConfigError};

/// Maps a key's attack time to a playback gain.
///
/// Fast strikes (short attack times) play loud, slow ones quiet. The curve is
/// linear between `(min_attack_time, max_gain)` and `(max_attack_time, min_gain)`
/// and flat outside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityCurve {
    min_attack_time: u32,
    max_attack_time: u32,
    min_gain: f32,
    max_gain: f32,
}

impl VelocityCurve {
    pub fn new(min_attack_time: u32, max_attack_time: u32, min_gain: f32, max_gain: f32) -> Self {
        VelocityCurve {
            min_attack_time,
            max_attack_time,
            min_gain,
            max_gain,
        }
    }

    /// Builds the curve from configuration. Gains must be finite with
    /// `0 <= min_gain <= max_gain`.
    pub fn from_config(velocity: &config::Velocity) -> Result<Self, ConfigError> {
        let (min_gain, max_gain) = (velocity.min_gain(), velocity.max_gain());
        if !min_gain.is_finite() || !max_gain.is_finite() {
            return Err(ConfigError::Invalid {
                field: "velocity",
                reason: format!("gains must be finite, got {} and {}", min_gain, max_gain),
            });
        }
        if min_gain < 0.0 || min_gain > max_gain {
            return Err(ConfigError::Invalid {
                field: "velocity.min_gain",
                reason: format!(
                    "must be between 0 and max_gain ({}), got {}",
                    max_gain, min_gain
                ),
            });
        }
        Ok(VelocityCurve::from_values(velocity))
    }

    fn from_values(velocity: &config::Velocity) -> Self {
        VelocityCurve::new(
            velocity.min_attack_time(),
            velocity.max_attack_time(),
            velocity.min_gain(),
            velocity.max_gain(),
        )
    }

    /// Computes the gain for an attack time.
    pub fn compute_volume(&self, attack_time: u32) -> f32 {
        if self.max_attack_time <= self.min_attack_time {
            return if attack_time <= self.min_attack_time {
                self.max_gain
            } else {
                self.min_gain
            };
        }

        let t = attack_time.clamp(self.min_attack_time, self.max_attack_time);
        let ratio = f64::from(t - self.min_attack_time)
            / f64::from(self.max_attack_time - self.min_attack_time);
        let gain = f64::from(self.min_gain) * ratio + f64::from(self.max_gain) * (1.0 - ratio);
        let (lo, hi) = if self.min_gain <= self.max_gain {
            (self.min_gain, self.max_gain)
        } else {
            (self.max_gain, self.min_gain)
        };
        // f32::clamp panics when lo > hi or either bound is NaN.
        (gain as f32).max(lo).min(hi)
    }
}

impl Default for VelocityCurve {
    fn default() -> Self {
        VelocityCurve::from_values(&config::Velocity::default())
    }
}

/// Maps a MIDI velocity to a gain, reaching full gain at `full_velocity`.
pub fn midi_volume(velocity: u8, full_velocity: u8) -> f32 {
    if full_velocity == 0 {
        return 1.0;
    }
    (f32::from(velocity) / f32::from(full_velocity)).clamp(0.0, 1.0)
}
