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
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::events::{Event, EventSource, Next};

/// Writes interleaved 16-bit samples to a WAV file.
pub fn write_wav(
    path: &Path,
    samples: &[i16],
    channels: u16,
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()
}

/// Writes a sound directory with one constant-valued file per entry of `lengths`.
/// File `i` holds `lengths[i]` samples of value `i + 1`.
pub fn write_sound_dir(dir: &Path, lengths: &[usize], sample_rate: u32) -> Result<(), hound::Error> {
    for (i, len) in lengths.iter().enumerate() {
        let value = i16::try_from(i + 1).unwrap_or(i16::MAX);
        write_wav(
            &dir.join(format!("{:03}.wav", i + 1)),
            &vec![value; *len],
            1,
            sample_rate,
        )?;
    }
    Ok(())
}

/// An event source replaying a fixed script, reporting `Idle` where the script has `None`.
pub struct ScriptedSource {
    script: std::vec::IntoIter<Option<Event>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Option<Event>>) -> ScriptedSource {
        ScriptedSource {
            script: script.into_iter(),
        }
    }
}

impl EventSource for ScriptedSource {
    fn next_event(&mut self) -> Next {
        match self.script.next() {
            Some(Some(event)) => Next::Event(event),
            Some(None) => Next::Idle,
            None => Next::EndOfStream,
        }
    }
}
