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

//! Standard MIDI File playback.
//!
//! Only note on and note off reach the engine. Tempo changes are honoured, every
//! other event is skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use thiserror::Error;
use tracing::{debug, info};

use crate::config;
use crate::events::{Event, ScheduledSource, Strike, TimedEvent};

/// Microseconds per quarter note until a tempo event says otherwise (120 bpm).
pub const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("unable to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid MIDI file: {0}")]
    Parse(#[from] midly::Error),

    #[error("SMPTE timecode timing is not supported")]
    UnsupportedTiming,

    #[error("MIDI file has zero ticks per quarter note")]
    ZeroTicksPerQuarter,
}

/// Which MIDI notes the keyboard covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteMapping {
    lowest_note: u8,
    key_count: usize,
}

impl NoteMapping {
    pub fn new(lowest_note: u8, key_count: usize) -> NoteMapping {
        NoteMapping {
            lowest_note,
            key_count,
        }
    }

    pub fn from_config(midi: &config::Midi, key_count: usize) -> NoteMapping {
        NoteMapping::new(midi.lowest_note(), key_count)
    }

    /// The key playing a note, if the note is on the keyboard.
    pub fn key(&self, note: u8) -> Option<usize> {
        let key = usize::from(note.checked_sub(self.lowest_note)?);
        (key < self.key_count).then_some(key)
    }
}

/// Converts a tick delta to wall-clock time at a tempo.
pub fn ticks_to_duration(ticks: u32, tempo: u32, ticks_per_quarter: u16) -> Duration {
    let micros = u64::from(tempo) * u64::from(ticks) / u64::from(ticks_per_quarter.max(1));
    Duration::from_micros(micros)
}

#[derive(Clone, Copy, Debug)]
enum Item {
    Tempo(u32),
    Note(Event),
}

/// A parsed MIDI file, flattened to a schedule of keyboard events.
#[derive(Clone, Debug)]
pub struct MidiSequence {
    events: Vec<TimedEvent>,
    ticks_per_quarter: u16,
    skipped_notes: usize,
}

impl MidiSequence {
    pub fn from_file(path: &Path, mapping: NoteMapping) -> Result<MidiSequence, MidiError> {
        let buf = fs::read(path).map_err(|source| MidiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sequence = MidiSequence::parse(&buf, mapping)?;
        info!(
            path = ?path,
            events = sequence.events.len(),
            skipped_notes = sequence.skipped_notes,
            duration_ms = sequence.duration().as_millis(),
            "MIDI file loaded"
        );
        Ok(sequence)
    }

    pub fn parse(bytes: &[u8], mapping: NoteMapping) -> Result<MidiSequence, MidiError> {
        let smf = Smf::parse(bytes)?;
        let ticks_per_quarter = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int(),
            Timing::Timecode(..) => return Err(MidiError::UnsupportedTiming),
        };
        if ticks_per_quarter == 0 {
            return Err(MidiError::ZeroTicksPerQuarter);
        }

        let mut skipped_notes = 0;
        let mut items: Vec<(u64, Item)> = Vec::new();
        let mut track_start = 0;
        for track in &smf.tracks {
            let end = collect_track(track, track_start, mapping, &mut items, &mut skipped_notes);
            if smf.header.format != Format::Parallel {
                track_start = end;
            }
        }
        // Stable, so events at the same tick keep track then file order.
        items.sort_by_key(|(tick, _)| *tick);

        let mut events = Vec::new();
        let mut tempo = DEFAULT_TEMPO;
        let mut last_tick = 0;
        let mut pending = Duration::ZERO;
        for (tick, item) in items {
            let delta = u32::try_from(tick - last_tick).unwrap_or(u32::MAX);
            pending += ticks_to_duration(delta, tempo, ticks_per_quarter);
            last_tick = tick;
            match item {
                Item::Tempo(new_tempo) => {
                    debug!(tick, tempo = new_tempo, "Tempo change");
                    tempo = new_tempo;
                }
                Item::Note(event) => {
                    events.push(TimedEvent::new(pending, event));
                    pending = Duration::ZERO;
                }
            }
        }

        Ok(MidiSequence {
            events,
            ticks_per_quarter,
            skipped_notes,
        })
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TimedEvent> {
        self.events
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }

    /// Notes that fell outside the keyboard.
    pub fn skipped_notes(&self) -> usize {
        self.skipped_notes
    }

    pub fn duration(&self) -> Duration {
        crate::events::schedule_duration(&self.events)
    }
}

/// Appends a track's items with absolute ticks. Returns the tick the track ends on.
fn collect_track(
    track: &[TrackEvent],
    start: u64,
    mapping: NoteMapping,
    items: &mut Vec<(u64, Item)>,
    skipped_notes: &mut usize,
) -> u64 {
    let mut tick = start;
    for event in track {
        tick += u64::from(event.delta.as_int());
        let item = match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Item::Tempo(tempo.as_int()),
            TrackEventKind::Midi { message, .. } => {
                let (note, event) = match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => (
                        key.as_int(),
                        Some(Strike::Velocity(vel.as_int())),
                    ),
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        (key.as_int(), None)
                    }
                    _ => continue,
                };
                let Some(key) = mapping.key(note) else {
                    *skipped_notes += 1;
                    continue;
                };
                Item::Note(match event {
                    Some(strike) => Event::KeyDown { key, strike },
                    None => Event::KeyUp { key },
                })
            }
            _ => continue,
        };
        items.push((tick, item));
    }
    tick
}

/// Plays a MIDI file in real time.
pub fn midi_source(sequence: MidiSequence) -> ScheduledSource {
    ScheduledSource::new(sequence.into_events())
}
