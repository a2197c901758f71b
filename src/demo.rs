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
use std::ops::Range;
use std::time::Duration;

use crate::config::{self, ConfigError};
use crate::events::{Event, ScheduledSource, Strike, TimedEvent};

/// Strikes each key in turn: key down, hold, key up, gap.
pub fn sweep(keys: Range<usize>, attack_time: u32, hold: Duration, gap: Duration) -> Vec<TimedEvent> {
    let mut events = Vec::with_capacity(keys.len() * 2);
    let mut delay = Duration::ZERO;
    for key in keys {
        events.push(TimedEvent::new(
            delay,
            Event::KeyDown {
                key,
                strike: Strike::AttackTime(attack_time),
            },
        ));
        events.push(TimedEvent::new(hold, Event::KeyUp { key }));
        delay = gap;
    }
    events
}

/// Plays the sweep across the whole keyboard in real time.
pub fn sweep_source(demo: &config::Demo, note_count: usize) -> Result<ScheduledSource, ConfigError> {
    Ok(ScheduledSource::new(sweep_from_config(demo, note_count)?))
}

pub fn sweep_from_config(demo: &config::Demo, note_count: usize) -> Result<Vec<TimedEvent>, ConfigError> {
    Ok(sweep(0..note_count, demo.attack_time(), demo.hold()?, demo.gap()?))
}
