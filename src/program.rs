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

//! Sound programs.
//!
//! A program is one directory of note samples. The selected program survives
//! restarts as a single byte in a state file. Switching programs builds a fresh
//! sample store that keeps the special sounds where they were and hands it to
//! the audio context.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::engine::Special;
use crate::samples::{LoadError, SampleLoader, SampleStore};

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program {program} does not exist ({count} configured)")]
    Unknown { program: u8, count: usize },

    #[error("unable to access program file {}: {source}", .path.display())]
    State { path: PathBuf, source: io::Error },

    #[error("program file {} is empty", .path.display())]
    EmptyState { path: PathBuf },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Persists the selected program as one byte.
#[derive(Clone, Debug, Default)]
pub struct ProgramStore {
    path: Option<PathBuf>,
}

impl ProgramStore {
    /// A store backed by a file, or one that remembers nothing.
    pub fn new(path: Option<PathBuf>) -> ProgramStore {
        ProgramStore { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the persisted program. Without a file the program is 0.
    pub fn read(&self) -> Result<u8, ProgramError> {
        let Some(path) = &self.path else {
            return Ok(0);
        };
        let bytes = fs::read(path).map_err(|source| ProgramError::State {
            path: path.clone(),
            source,
        })?;
        bytes
            .first()
            .copied()
            .ok_or_else(|| ProgramError::EmptyState { path: path.clone() })
    }

    /// Reads the persisted program, falling back to 0 on any problem.
    pub fn load(&self) -> u8 {
        match self.read() {
            Ok(program) => program,
            Err(ProgramError::State { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("No program file yet, using program 0");
                0
            }
            Err(e) => {
                warn!(err = %e, "Unable to read program file, using program 0");
                0
            }
        }
    }

    pub fn save(&self, program: u8) -> Result<(), ProgramError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        fs::write(path, [program]).map_err(|source| ProgramError::State {
            path: path.clone(),
            source,
        })
    }
}

/// The configured programs and the store currently handed to the audio context.
pub struct ProgramBank {
    directories: Vec<PathBuf>,
    loader: SampleLoader,
    state: ProgramStore,
    current: Arc<SampleStore>,
    /// Stores replaced by a switch that the audio context may still hold.
    retired: Vec<Arc<SampleStore>>,
    note_count: usize,
    program: u8,
}

impl ProgramBank {
    /// Builds the initial store: the special sounds first, then the notes of the
    /// persisted program. Loading problems are logged and leave sounds empty.
    pub fn open(
        directories: Vec<PathBuf>,
        specials: Option<&Path>,
        capacity_bytes: usize,
        note_count: usize,
        loader: SampleLoader,
        state: ProgramStore,
    ) -> ProgramBank {
        let mut store = SampleStore::with_capacity_bytes(capacity_bytes, note_count + Special::COUNT);
        match specials {
            Some(dir) => {
                if let Err(e) = loader.load_directory(&mut store, dir, note_count, Special::COUNT) {
                    error!(err = %e, "Unable to load special sounds");
                }
            }
            None => warn!("No special sounds configured"),
        }

        let mut program = state.load();
        if usize::from(program) >= directories.len() {
            if !directories.is_empty() {
                warn!(program, count = directories.len(), "Persisted program does not exist, using program 0");
            }
            program = 0;
        }
        match directories.get(usize::from(program)) {
            Some(dir) => {
                if let Err(e) = loader.load_directory(&mut store, dir, 0, note_count) {
                    error!(program, err = %e, "Unable to load program");
                }
            }
            None => warn!("No programs configured, the keyboard will be silent"),
        }

        ProgramBank {
            directories,
            loader,
            state,
            current: Arc::new(store),
            retired: Vec::new(),
            note_count,
            program,
        }
    }

    /// The store the audio context should be playing from.
    pub fn current(&self) -> &Arc<SampleStore> {
        &self.current
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    pub fn count(&self) -> usize {
        self.directories.len()
    }

    pub fn check(&self, program: u8) -> Result<&Path, ProgramError> {
        self.directories
            .get(usize::from(program))
            .map(PathBuf::as_path)
            .ok_or(ProgramError::Unknown {
                program,
                count: self.directories.len(),
            })
    }

    /// Loads a program into a new store without making it current. The store
    /// keeps the special sounds of the current one.
    pub fn prepare(&mut self, program: u8) -> Result<Arc<SampleStore>, ProgramError> {
        let dir = self.check(program)?.to_path_buf();
        self.collect_retired();

        let specials = self.note_count..self.note_count + Special::COUNT;
        let mut store = self.current.fork(specials);
        let report = self
            .loader
            .load_directory(&mut store, &dir, 0, self.note_count)?;
        info!(program, loaded = report.loaded, "Program loaded");
        Ok(Arc::new(store))
    }

    /// Makes a prepared store current once the audio context has it. The
    /// previous store is kept until the audio context lets go of it.
    pub fn commit(&mut self, program: u8, store: Arc<SampleStore>) {
        let previous = std::mem::replace(&mut self.current, store);
        self.retired.push(previous);
        self.program = program;
        if let Err(e) = self.state.save(program) {
            warn!(err = %e, "Unable to persist program");
        }
        info!(program, "Program switched");
    }

    /// Drops retired stores nobody else references any more.
    pub fn collect_retired(&mut self) {
        self.retired.retain(|store| Arc::strong_count(store) > 1);
    }

    pub fn retired(&self) -> usize {
        self.retired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_sound_dir;

    const NOTES: usize = 3;

    fn switch(bank: &mut ProgramBank, program: u8) -> Result<Arc<SampleStore>, ProgramError> {
        let store = bank.prepare(program)?;
        bank.commit(program, store.clone());
        Ok(store)
    }

    fn bank(dir: &Path, programs: usize, state: ProgramStore) -> ProgramBank {
        let directories = (0..programs)
            .map(|p| dir.join(format!("program{}", p)))
            .collect();
        ProgramBank::open(
            directories,
            Some(&dir.join("specials")),
            1000,
            NOTES,
            SampleLoader::new(44100),
            state,
        )
    }

    fn make_dirs(dir: &Path) {
        fs::create_dir(dir.join("specials")).unwrap();
        write_sound_dir(&dir.join("specials"), &[4, 4], 44100).unwrap();
        for (p, len) in [(0, 10), (1, 20)] {
            let program = dir.join(format!("program{}", p));
            fs::create_dir(&program).unwrap();
            write_sound_dir(&program, &[len; NOTES], 44100).unwrap();
        }
    }

    #[test]
    fn test_program_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgramStore::new(Some(dir.path().join("program")));
        assert_eq!(store.load(), 0);
        store.save(3).unwrap();
        assert_eq!(store.read().unwrap(), 3);
    }

    #[test]
    fn test_program_store_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program");
        fs::write(&path, b"").unwrap();
        let store = ProgramStore::new(Some(path));
        assert!(matches!(store.read(), Err(ProgramError::EmptyState { .. })));
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn test_program_store_without_file() {
        let store = ProgramStore::default();
        assert_eq!(store.read().unwrap(), 0);
        store.save(2).unwrap();
        assert_eq!(store.read().unwrap(), 0);
    }

    #[test]
    fn test_open_loads_specials_first() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let bank = bank(dir.path(), 2, ProgramStore::default());

        let store = bank.current();
        assert_eq!(store.region(NOTES).first(), 0);
        assert_eq!(store.region(NOTES + 1).first(), 4);
        assert_eq!(store.region(0).first(), 8);
        assert_eq!(store.region(0).len(), 10);
        assert_eq!(bank.program(), 0);
    }

    #[test]
    fn test_open_uses_persisted_program() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let state = ProgramStore::new(Some(dir.path().join("program")));
        state.save(1).unwrap();

        let opened = bank(dir.path(), 2, state.clone());
        assert_eq!(opened.program(), 1);
        assert_eq!(opened.current().region(0).len(), 20);

        state.save(9).unwrap();
        let opened = bank(dir.path(), 2, state);
        assert_eq!(opened.program(), 0);
    }

    #[test]
    fn test_switch_keeps_specials_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let state = ProgramStore::new(Some(dir.path().join("program")));
        let mut bank = bank(dir.path(), 2, state.clone());
        let before = bank.current().clone();

        let store = switch(&mut bank, 1).unwrap();
        assert_eq!(store.region(NOTES), before.region(NOTES));
        assert_eq!(store.region(NOTES + 1), before.region(NOTES + 1));
        assert_eq!(store.region(0).len(), 20);
        assert_eq!(bank.program(), 1);
        assert_eq!(state.read().unwrap(), 1);
        assert!(Arc::ptr_eq(bank.current(), &store));

        // The old store is retained while someone else holds it.
        assert_eq!(bank.retired(), 1);
        bank.collect_retired();
        assert_eq!(bank.retired(), 1);
        drop(before);
        bank.collect_retired();
        assert_eq!(bank.retired(), 0);
    }

    #[test]
    fn test_prepare_changes_nothing_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let state = ProgramStore::new(Some(dir.path().join("program")));
        let mut bank = bank(dir.path(), 2, state.clone());
        let before = bank.current().clone();

        let prepared = bank.prepare(1).unwrap();
        assert_eq!(prepared.region(0).len(), 20);
        assert!(Arc::ptr_eq(bank.current(), &before));
        assert_eq!(bank.program(), 0);
        assert_eq!(bank.retired(), 0);
        assert!(state.read().is_err());
    }

    #[test]
    fn test_switch_unknown_program() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let mut bank = bank(dir.path(), 2, ProgramStore::default());

        assert!(matches!(
            switch(&mut bank, 5),
            Err(ProgramError::Unknown {
                program: 5,
                count: 2
            })
        ));
        assert_eq!(bank.program(), 0);
        assert_eq!(bank.retired(), 0);
    }

    #[test]
    fn test_switch_missing_directory_keeps_program() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let mut bank = bank(dir.path(), 3, ProgramStore::default());

        assert!(matches!(switch(&mut bank, 2), Err(ProgramError::Load(_))));
        assert_eq!(bank.program(), 0);
        assert_eq!(bank.current().region(0).len(), 10);
    }
}
