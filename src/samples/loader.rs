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

//! WAV directory loading into the sample store.
//!
//! A sound directory holds one file per sound, named with a leading 1-based
//! index (`001_a0.wav`, `002_a#0.wav`, ...). Files are decoded with hound and
//! appended to the store in index order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hound::{SampleFormat, WavReader};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::store::{SampleStore, StoreError};
use crate::util::filename_display;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("unable to decode {}: {source}", .path.display())]
    Wav {
        path: PathBuf,
        source: hound::Error,
    },

    #[error("{} is {bits}-bit {format:?}, only 16-bit integer PCM is supported", .path.display())]
    UnsupportedFormat {
        path: PathBuf,
        bits: u16,
        format: SampleFormat,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of a directory load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Sounds that were decoded and stored.
    pub loaded: usize,
    /// Sounds with no matching file.
    pub missing: usize,
    /// Sounds whose file failed to decode or did not fit.
    pub failed: usize,
}

/// Decodes WAV files and appends them to a sample store.
pub struct SampleLoader {
    /// Rate the output runs at. Files at other rates are loaded as-is with a warning.
    sample_rate: u32,
}

impl SampleLoader {
    pub fn new(sample_rate: u32) -> SampleLoader {
        SampleLoader { sample_rate }
    }

    /// Decodes the first channel of a 16-bit integer WAV file.
    pub fn decode(&self, path: &Path) -> Result<Vec<i16>, LoadError> {
        let reader = WavReader::open(path).map_err(|source| LoadError::Wav {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                bits: spec.bits_per_sample,
                format: spec.sample_format,
            });
        }
        if spec.sample_rate != self.sample_rate {
            warn!(
                file = filename_display(path),
                file_rate = spec.sample_rate,
                output_rate = self.sample_rate,
                "Sample rate mismatch, sound will play at the wrong pitch"
            );
        }

        let channels = usize::from(spec.channels.max(1));
        reader
            .into_samples::<i16>()
            .step_by(channels)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| LoadError::Wav {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Loads `count` sounds from a directory into consecutive store slots
    /// starting at `first_sound`. File index 1 lands in `first_sound`.
    ///
    /// Per-file problems are logged and leave that sound empty. Only a directory
    /// that cannot be read is an error.
    pub fn load_directory(
        &self,
        store: &mut SampleStore,
        dir: &Path,
        first_sound: usize,
        count: usize,
    ) -> Result<LoadReport, LoadError> {
        info!(dir = ?dir, first_sound, count, "Loading sound directory");
        let files = scan_directory(dir, count)?;
        let mut report = LoadReport::default();

        for (offset, file) in files.iter().enumerate() {
            let sound = first_sound + offset;
            let Some(path) = file else {
                debug!(sound, "No file for sound");
                report.missing += 1;
                continue;
            };

            match self.load_file(store, sound, path) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    error!(sound, err = %e, "Failed to load sound");
                    report.failed += 1;
                }
            }
        }

        info!(
            dir = ?dir,
            loaded = report.loaded,
            missing = report.missing,
            failed = report.failed,
            used_mb = store.used() * 2 / 1_000_000,
            "Sound directory loaded"
        );
        Ok(report)
    }

    fn load_file(&self, store: &mut SampleStore, sound: usize, path: &Path) -> Result<(), LoadError> {
        let samples = self.decode(path)?;
        let region = store.load_samples(sound, &samples)?;
        let duration = Duration::from_secs_f64(region.len() as f64 / f64::from(self.sample_rate.max(1)));
        debug!(
            sound,
            file = filename_display(path),
            samples = region.len(),
            duration_ms = duration.as_millis(),
            "Sound loaded"
        );
        Ok(())
    }
}

/// Lists the WAV files of a sound directory by slot. Slot `i` holds the file
/// whose leading index is `i + 1`. Hidden files, directories, other extensions
/// and out-of-range indices are skipped.
pub fn scan_directory(dir: &Path, count: usize) -> Result<Vec<Option<PathBuf>>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut slots = vec![None; count];

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') || path.is_dir() || !is_wav(&path) {
            continue;
        }

        match sound_index(name) {
            Some(index) if index < count => {
                if slots[index].is_some() {
                    warn!(file = name, index = index + 1, "Duplicate sound index, keeping the first");
                } else {
                    slots[index] = Some(path);
                }
            }
            _ => warn!(file = name, "Skipping file without a usable sound index"),
        }
    }

    Ok(slots)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// Parses the leading 1-based index of a file name into a 0-based slot.
fn sound_index(name: &str) -> Option<usize> {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    name[..digits].parse::<usize>().ok()?.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_sound_index() {
        assert_eq!(sound_index("001_a0.wav"), Some(0));
        assert_eq!(sound_index("85.wav"), Some(84));
        assert_eq!(sound_index("000.wav"), None);
        assert_eq!(sound_index("a0.wav"), None);
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("002_b.wav"), &[1], 1, 44100).unwrap();
        write_wav(&dir.path().join("001_a.WAV"), &[1], 1, 44100).unwrap();
        write_wav(&dir.path().join("009_far.wav"), &[1], 1, 44100).unwrap();
        write_wav(&dir.path().join(".003_hidden.wav"), &[1], 1, 44100).unwrap();
        fs::write(dir.path().join("003_notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("004.wav")).unwrap();

        let slots = scan_directory(dir.path(), 4).unwrap();
        assert_eq!(slots.len(), 4);
        assert!(slots[0].as_ref().unwrap().ends_with("001_a.WAV"));
        assert!(slots[1].as_ref().unwrap().ends_with("002_b.wav"));
        assert!(slots[2].is_none());
        assert!(slots[3].is_none());
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_directory(&dir.path().join("nope"), 2);
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_decode_takes_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.wav");
        write_wav(&path, &[10, -10, 20, -20, 30, -30], 2, 44100).unwrap();

        let samples = SampleLoader::new(44100).decode(&path).unwrap();
        assert_eq!(samples, vec![10, 20, 30]);
    }

    #[test]
    fn test_decode_rejects_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        let result = SampleLoader::new(44100).decode(&path);
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedFormat { bits: 32, .. })
        ));
    }

    #[test]
    fn test_load_directory_into_slots() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("001.wav"), &[1, 2, 3], 1, 44100).unwrap();
        write_wav(&dir.path().join("003.wav"), &[4, 5], 1, 44100).unwrap();
        fs::write(dir.path().join("002.wav"), "not a wav").unwrap();

        let mut store = SampleStore::new(100, 5);
        let report = SampleLoader::new(44100)
            .load_directory(&mut store, dir.path(), 2, 3)
            .unwrap();

        assert_eq!(
            report,
            LoadReport {
                loaded: 2,
                missing: 0,
                failed: 1
            }
        );
        assert_eq!(store.region(2).len(), 3);
        assert!(store.region(3).is_empty());
        assert_eq!(store.region(4).first(), 3);
        assert_eq!(store.sample(4), 5);
    }

    #[test]
    fn test_load_directory_overflow_leaves_sound_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("001.wav"), &[1, 2, 3], 1, 44100).unwrap();
        write_wav(&dir.path().join("002.wav"), &[4, 5, 6], 1, 44100).unwrap();

        let mut store = SampleStore::new(4, 2);
        let report = SampleLoader::new(44100)
            .load_directory(&mut store, dir.path(), 0, 2)
            .unwrap();

        assert_eq!(report.loaded, 1);
        assert_eq!(report.failed, 1);
        assert!(store.region(1).is_empty());
    }
}
