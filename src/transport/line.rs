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

//! Byte-at-a-time decoder for the scanner's line protocol.
//!
//! Messages look like `SD 12 45000\r\n` (key down), `SU 12\r\n` (key up) and
//! `SP 1\r\n` (program select). Bytes outside a message are ignored until the
//! next `S`.

use std::str::FromStr;

use thiserror::Error;

pub const START_MARKER: u8 = b'S';
pub const TERMINATOR: u8 = b'\n';
/// Longest message body accepted, excluding the start marker.
pub const MAX_MESSAGE_SIZE: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("message longer than {limit} bytes")]
    TooLong { limit: usize },

    #[error("malformed message {0:?}")]
    Malformed(String),

    #[error("unknown message kind {0:?}")]
    UnknownKind(char),

    #[error("bad {name}: {source}")]
    Field {
        name: &'static str,
        source: std::num::ParseIntError,
    },
}

/// One decoded message, with the raw scanner address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    KeyDown { address: u16, attack_time: u32 },
    KeyUp { address: u16 },
    Program(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Waiting for a start marker.
    Idle,
    Receiving,
    /// Dropping an oversized message up to its terminator.
    Discarding,
}

pub struct LineDecoder {
    state: State,
    buf: [u8; MAX_MESSAGE_SIZE],
    len: usize,
}

impl LineDecoder {
    pub fn new() -> LineDecoder {
        LineDecoder {
            state: State::Idle,
            buf: [0; MAX_MESSAGE_SIZE],
            len: 0,
        }
    }

    /// Feeds one byte. Returns a result when a message ends.
    pub fn push(&mut self, byte: u8) -> Option<Result<Record, LineError>> {
        match self.state {
            State::Idle => {
                if byte == START_MARKER {
                    self.state = State::Receiving;
                    self.len = 0;
                }
                None
            }
            State::Receiving if byte == TERMINATOR => {
                self.state = State::Idle;
                let mut body = &self.buf[..self.len];
                if let [rest @ .., b'\r'] = body {
                    body = rest;
                }
                Some(parse_record(body))
            }
            State::Receiving => {
                if self.len == MAX_MESSAGE_SIZE {
                    self.state = State::Discarding;
                } else {
                    self.buf[self.len] = byte;
                    self.len += 1;
                }
                None
            }
            State::Discarding => {
                if byte == TERMINATOR {
                    self.state = State::Idle;
                    Some(Err(LineError::TooLong {
                        limit: MAX_MESSAGE_SIZE,
                    }))
                } else {
                    None
                }
            }
        }
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        LineDecoder::new()
    }
}

/// Parses a message body (everything between the start marker and the terminator).
pub fn parse_record(body: &[u8]) -> Result<Record, LineError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| LineError::Malformed(String::from_utf8_lossy(body).into_owned()))?;
    let text = text.trim_start();
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| LineError::Malformed(String::new()))?;
    let mut fields = chars.as_str().split_whitespace();

    let record = match kind {
        'D' => Record::KeyDown {
            address: field(&mut fields, "key", text)?,
            attack_time: field(&mut fields, "attack time", text)?,
        },
        'U' => Record::KeyUp {
            address: field(&mut fields, "key", text)?,
        },
        'P' => Record::Program(field(&mut fields, "program", text)?),
        other => return Err(LineError::UnknownKind(other)),
    };

    if fields.next().is_some() {
        return Err(LineError::Malformed(text.to_string()));
    }
    Ok(record)
}

fn field<'a, T: FromStr<Err = std::num::ParseIntError>>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
    message: &str,
) -> Result<T, LineError> {
    let value = fields
        .next()
        .ok_or_else(|| LineError::Malformed(message.to_string()))?;
    value
        .parse()
        .map_err(|source| LineError::Field { name, source })
}
