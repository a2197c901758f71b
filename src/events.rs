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

//! Keyboard events and the sources that produce them.

use std::time::{Duration, Instant};

/// How hard a key was struck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strike {
    /// Time the hammer took between the two scanner contacts. Smaller is louder.
    AttackTime(u32),
    /// A MIDI velocity.
    Velocity(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    KeyDown { key: usize, strike: Strike },
    KeyUp { key: usize },
    PedalDown,
    PedalUp,
    /// Select a sound program.
    Program(u8),
}

/// The result of polling a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    Event(Event),
    /// Nothing arrived within the source's receive timeout.
    Idle,
    EndOfStream,
}

/// Anything that produces keyboard events.
pub trait EventSource {
    /// Returns the next event. Blocks for at most the source's timeout or the
    /// delay until its next scheduled event.
    fn next_event(&mut self) -> Next;
}

/// An event preceded by a delay relative to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedEvent {
    pub delay: Duration,
    pub event: Event,
}

impl TimedEvent {
    pub fn new(delay: Duration, event: Event) -> TimedEvent {
        TimedEvent { delay, event }
    }
}

/// Total length of a schedule.
pub fn schedule_duration(events: &[TimedEvent]) -> Duration {
    events.iter().map(|e| e.delay).sum()
}

/// Plays a precomputed schedule in real time.
///
/// Deadlines are tracked from the first poll, so time spent dispatching does
/// not accumulate as drift.
pub struct ScheduledSource {
    events: std::vec::IntoIter<TimedEvent>,
    deadline: Option<Instant>,
}

impl ScheduledSource {
    pub fn new(events: Vec<TimedEvent>) -> ScheduledSource {
        ScheduledSource {
            events: events.into_iter(),
            deadline: None,
        }
    }
}

impl EventSource for ScheduledSource {
    fn next_event(&mut self) -> Next {
        let Some(timed) = self.events.next() else {
            return Next::EndOfStream;
        };
        let deadline = self.deadline.unwrap_or_else(Instant::now) + timed.delay;
        self.deadline = Some(deadline);
        let now = Instant::now();
        if deadline > now {
            spin_sleep::sleep(deadline - now);
        }
        Next::Event(timed.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_source_paces_events() {
        let events = vec![
            TimedEvent::new(Duration::ZERO, Event::PedalDown),
            TimedEvent::new(Duration::from_millis(20), Event::PedalUp),
        ];
        assert_eq!(schedule_duration(&events), Duration::from_millis(20));

        let mut source = ScheduledSource::new(events);
        let start = Instant::now();
        assert_eq!(source.next_event(), Next::Event(Event::PedalDown));
        assert_eq!(source.next_event(), Next::Event(Event::PedalUp));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(source.next_event(), Next::EndOfStream);
    }
}
