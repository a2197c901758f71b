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
use std::fmt;
use std::ops::Range;

use thiserror::Error;
use tracing::debug;

/// Default store capacity in bytes (60 MB of 16-bit PCM).
pub const DEFAULT_CAPACITY_BYTES: usize = 60_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("sample store full: sound {sound} needs {requested} samples, {free} free")]
    CapacityExceeded {
        sound: usize,
        requested: usize,
        free: usize,
    },

    #[error("sound {sound} does not exist (store holds {count} sounds)")]
    UnknownSound { sound: usize, count: usize },
}

/// The span of the store occupied by one sound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    first: usize,
    len: usize,
}

impl Region {
    pub fn new(first: usize, len: usize) -> Region {
        Region { first, len }
    }

    /// Position of the first sample.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Position one past the last sample.
    pub fn last(&self) -> usize {
        self.first + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A fixed-capacity, append-only buffer of 16-bit samples shared by every sound.
///
/// The full capacity is allocated up front. Sounds are appended in load order and
/// each one records the region it occupies, so a store can be handed to the audio
/// context as a single self-describing object.
pub struct SampleStore {
    data: Box<[i16]>,
    len: usize,
    regions: Vec<Region>,
}

impl SampleStore {
    /// Creates a store holding up to `capacity` samples for `sound_count` sounds.
    pub fn new(capacity: usize, sound_count: usize) -> SampleStore {
        SampleStore {
            data: vec![0; capacity].into_boxed_slice(),
            len: 0,
            regions: vec![Region::default(); sound_count],
        }
    }

    /// Creates a store from a capacity expressed in bytes of 16-bit PCM.
    pub fn with_capacity_bytes(capacity_bytes: usize, sound_count: usize) -> SampleStore {
        SampleStore::new(capacity_bytes / 2, sound_count)
    }

    /// Appends raw little-endian 16-bit PCM for a sound. A trailing odd byte is dropped.
    pub fn load(&mut self, sound: usize, bytes: &[u8]) -> Result<Region, StoreError> {
        let requested = bytes.len() / 2;
        let first = self.reserve(sound, requested)?;
        for (slot, pair) in self.data[first..first + requested]
            .iter_mut()
            .zip(bytes.chunks_exact(2))
        {
            *slot = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(self.commit(sound, first, requested))
    }

    /// Appends already decoded samples for a sound.
    pub fn load_samples(&mut self, sound: usize, samples: &[i16]) -> Result<Region, StoreError> {
        let first = self.reserve(sound, samples.len())?;
        self.data[first..first + samples.len()].copy_from_slice(samples);
        Ok(self.commit(sound, first, samples.len()))
    }

    fn reserve(&self, sound: usize, requested: usize) -> Result<usize, StoreError> {
        if sound >= self.regions.len() {
            return Err(StoreError::UnknownSound {
                sound,
                count: self.regions.len(),
            });
        }
        let free = self.free();
        if requested > free {
            return Err(StoreError::CapacityExceeded {
                sound,
                requested,
                free,
            });
        }
        Ok(self.len)
    }

    fn commit(&mut self, sound: usize, first: usize, len: usize) -> Region {
        let region = Region::new(first, len);
        self.regions[sound] = region;
        self.len += len;
        debug!(sound, first, len, used = self.len, "Sound stored");
        region
    }

    /// The region of a sound. Unknown or unloaded sounds have a zero-length region.
    pub fn region(&self, sound: usize) -> Region {
        self.regions.get(sound).copied().unwrap_or_default()
    }

    /// The sample at an absolute position, or silence past the written data.
    pub fn sample(&self, pos: usize) -> i16 {
        if pos < self.len {
            self.data[pos]
        } else {
            0
        }
    }

    pub fn sound_count(&self) -> usize {
        self.regions.len()
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.len
    }

    pub fn free(&self) -> usize {
        self.data.len() - self.len
    }

    /// Creates a store of the same shape that keeps the given sounds at their
    /// current positions. Every other sound starts out empty.
    pub fn fork(&self, keep: Range<usize>) -> SampleStore {
        let mut forked = SampleStore::new(self.capacity(), self.sound_count());
        let mut end = 0;
        for sound in keep {
            if let Some(region) = self.regions.get(sound) {
                forked.regions[sound] = *region;
                end = end.max(region.last());
            }
        }
        forked.data[..end].copy_from_slice(&self.data[..end]);
        forked.len = end;
        forked
    }
}

impl fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStore")
            .field("capacity", &self.capacity())
            .field("used", &self.len)
            .field("sounds", &self.regions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_appends_sequentially() {
        let mut store = SampleStore::new(100, 3);

        let a = store.load_samples(0, &[1, 2, 3]).unwrap();
        let b = store.load_samples(1, &[4, 5]).unwrap();

        assert_eq!(a, Region::new(0, 3));
        assert_eq!(b, Region::new(3, 2));
        assert_eq!(store.used(), 5);
        assert_eq!(store.sample(3), 4);
        assert_eq!(store.region(1).last(), 5);
    }

    #[test]
    fn test_load_little_endian_bytes() {
        let mut store = SampleStore::new(10, 1);
        let region = store.load(0, &[0x34, 0x12, 0xff, 0xff, 0x07]).unwrap();

        // The odd trailing byte is dropped.
        assert_eq!(region.len(), 2);
        assert_eq!(store.sample(0), 0x1234);
        assert_eq!(store.sample(1), -1);
    }

    #[test]
    fn test_capacity_exceeded_leaves_empty_region() {
        let mut store = SampleStore::new(4, 2);
        store.load_samples(0, &[1, 2, 3]).unwrap();

        let err = store.load_samples(1, &[9, 9]).unwrap_err();
        assert_eq!(
            err,
            StoreError::CapacityExceeded {
                sound: 1,
                requested: 2,
                free: 1
            }
        );
        assert!(store.region(1).is_empty());
        assert_eq!(store.used(), 3);
        assert_eq!(store.sample(3), 0);
    }

    #[test]
    fn test_exact_fit() {
        let mut store = SampleStore::with_capacity_bytes(8, 1);
        assert_eq!(store.capacity(), 4);
        store.load_samples(0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(store.free(), 0);
    }

    #[test]
    fn test_unknown_sound() {
        let mut store = SampleStore::new(4, 1);
        assert_eq!(
            store.load_samples(2, &[1]),
            Err(StoreError::UnknownSound { sound: 2, count: 1 })
        );
        assert!(store.region(7).is_empty());
    }

    #[test]
    fn test_fork_keeps_prefix_sounds() {
        let mut store = SampleStore::new(16, 4);
        // Sounds 2 and 3 are loaded first, as specials are.
        store.load_samples(2, &[7, 7]).unwrap();
        store.load_samples(3, &[8]).unwrap();
        store.load_samples(0, &[1, 1, 1]).unwrap();

        let mut forked = store.fork(2..4);
        assert_eq!(forked.region(2), store.region(2));
        assert_eq!(forked.region(3), store.region(3));
        assert!(forked.region(0).is_empty());
        assert_eq!(forked.used(), 3);
        assert_eq!(forked.sample(2), 8);

        let region = forked.load_samples(0, &[5, 5]).unwrap();
        assert_eq!(region.first(), 3);
        assert_eq!(forked.capacity(), 16);
    }
}
