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
use serde::Deserialize;

use crate::samples::DEFAULT_CAPACITY_BYTES;

/// Where the sounds live.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Samples {
    /// Directory holding the special sounds (`001` ready, `002` program loading).
    specials: Option<String>,

    /// Note directories, one per program. Program 0 is the first entry.
    #[serde(default)]
    programs: Vec<String>,

    /// Sample store capacity in bytes (default: 60000000).
    capacity_bytes: Option<usize>,

    /// File persisting the selected program. Programs are not remembered when unset.
    program_file: Option<String>,
}

impl Samples {
    pub fn specials(&self) -> Option<&str> {
        self.specials.as_deref()
    }

    pub fn programs(&self) -> &[String] {
        &self.programs
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes.unwrap_or(DEFAULT_CAPACITY_BYTES)
    }

    pub fn program_file(&self) -> Option<&str> {
        self.program_file.as_deref()
    }
}

#[cfg(test)]
impl Samples {
    pub fn new(specials: Option<&str>, programs: &[&str], capacity_bytes: usize) -> Samples {
        Samples {
            specials: specials.map(str::to_string),
            programs: programs.iter().map(|p| p.to_string()).collect(),
            capacity_bytes: Some(capacity_bytes),
            program_file: None,
        }
    }

    pub fn with_program_file(mut self, path: &str) -> Samples {
        self.program_file = Some(path.to_string());
        self
    }
}
