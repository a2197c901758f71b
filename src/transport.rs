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

//! The live link to the key scanner.
//!
//! A reader thread pulls bytes from a device node, a file, or stdin, runs them
//! through the line decoder and forwards each decoded record over a channel.
//! The event source side waits on that channel with a bounded timeout.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{info, span, warn, Level};

use crate::engine::{Key, KeyMap, KeyMapError};
use crate::events::{Event, EventSource, Next, Strike};

mod line;

pub use line::{parse_record, LineDecoder, LineError, Record, MAX_MESSAGE_SIZE};

/// The port name that reads from stdin.
pub const STDIN_PORT: &str = "-";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("read error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Line(#[from] LineError),

    #[error(transparent)]
    Key(#[from] KeyMapError),
}

/// Events from the scanner's line protocol.
pub struct LineSource {
    records: Receiver<Result<Record, TransportError>>,
    keymap: KeyMap,
    timeout: Duration,
}

impl LineSource {
    /// Opens a port: `-` for stdin, anything else as a path.
    pub fn open(port: &str, keymap: KeyMap, timeout: Duration) -> Result<LineSource, TransportError> {
        if port == STDIN_PORT {
            return Ok(LineSource::from_reader(io::stdin(), keymap, timeout));
        }
        let file = File::open(port).map_err(|source| TransportError::Open {
            path: PathBuf::from(port),
            source,
        })?;
        Ok(LineSource::from_reader(file, keymap, timeout))
    }

    /// Starts a reader thread over any byte stream.
    pub fn from_reader<R>(reader: R, keymap: KeyMap, timeout: Duration) -> LineSource
    where
        R: Read + Send + 'static,
    {
        let (records_tx, records) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            let span = span!(Level::INFO, "line reader");
            let _enter = span.enter();

            info!("Line reader started.");
            if let Err(e) = monitor_io(&records_tx, reader) {
                // The source may already be gone.
                let _ = records_tx.send(Err(e.into()));
            }
            info!("Line reader stopped.");
        });
        LineSource {
            records,
            keymap,
            timeout,
        }
    }

    /// Turns a record into an event, mapping the scanner address.
    pub fn to_event(&self, record: Record) -> Result<Event, TransportError> {
        let event = match record {
            Record::KeyDown {
                address,
                attack_time,
            } => match self.keymap.key(address)? {
                Key::Note(key) => Event::KeyDown {
                    key,
                    strike: Strike::AttackTime(attack_time),
                },
                Key::Pedal => Event::PedalDown,
            },
            Record::KeyUp { address } => match self.keymap.key(address)? {
                Key::Note(key) => Event::KeyUp { key },
                Key::Pedal => Event::PedalUp,
            },
            Record::Program(program) => Event::Program(program),
        };
        Ok(event)
    }
}

impl EventSource for LineSource {
    fn next_event(&mut self) -> Next {
        loop {
            match self.records.recv_timeout(self.timeout) {
                Ok(Ok(record)) => match self.to_event(record) {
                    Ok(event) => return Next::Event(event),
                    Err(e) => warn!(record = ?record, err = %e, "Dropping message"),
                },
                Ok(Err(e)) => warn!(err = %e, "Dropping message"),
                Err(RecvTimeoutError::Timeout) => return Next::Idle,
                Err(RecvTimeoutError::Disconnected) => return Next::EndOfStream,
            }
        }
    }
}

/// Decodes a byte stream until it ends, forwarding every decoded record.
fn monitor_io<R: Read>(
    records_tx: &Sender<Result<Record, TransportError>>,
    reader: R,
) -> Result<(), io::Error> {
    let mut decoder = LineDecoder::new();
    for byte in io::BufReader::new(reader).bytes() {
        let byte = match byte {
            Ok(byte) => byte,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if let Some(result) = decoder.push(byte) {
            if records_tx.send(result.map_err(TransportError::from)).is_err() {
                // Nobody is listening anymore.
                return Ok(());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn source(bytes: &'static [u8]) -> LineSource {
        LineSource::from_reader(
            Cursor::new(bytes),
            KeyMap::default(),
            Duration::from_millis(500),
        )
    }

    fn drain(mut source: LineSource) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match source.next_event() {
                Next::Event(event) => events.push(event),
                Next::Idle => continue,
                Next::EndOfStream => return events,
            }
        }
    }

    #[test]
    fn test_monitor_io() {
        let (tx, rx) = crossbeam_channel::unbounded();
        monitor_io(&tx, Cursor::new(b"SD 0 10000\r\nSU 0\r\n".as_slice())).unwrap();
        drop(tx);

        let records: Vec<Record> = rx.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            records,
            vec![
                Record::KeyDown {
                    address: 0,
                    attack_time: 10000
                },
                Record::KeyUp { address: 0 }
            ]
        );
    }

    #[test]
    fn test_events_are_mapped() {
        let events = drain(source(b"SD 0 10000\r\nSD 48 0\r\nSU 48\r\nSU 6\r\nSP 1\r\n"));
        assert_eq!(
            events,
            vec![
                Event::KeyDown {
                    key: 1,
                    strike: Strike::AttackTime(10000)
                },
                Event::PedalDown,
                Event::PedalUp,
                Event::KeyUp { key: 0 },
                Event::Program(1),
            ]
        );
    }

    #[test]
    fn test_bad_messages_are_dropped() {
        let events = drain(source(b"SD 13 100\r\nSD 200 100\r\nSQ\r\nSU 1\r\n"));
        assert_eq!(events, vec![Event::KeyUp { key: 2 }]);
    }

    #[test]
    fn test_idle_when_nothing_arrives() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut source = LineSource {
            records: rx,
            keymap: KeyMap::default(),
            timeout: Duration::from_millis(10),
        };
        assert_eq!(source.next_event(), Next::Idle);
    }

    #[test]
    fn test_open_missing_port() {
        let dir = tempfile::tempdir().unwrap();
        let port = dir.path().join("ttyMissing");
        let result = LineSource::open(
            port.to_str().unwrap(),
            KeyMap::default(),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}
