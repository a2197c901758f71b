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
use std::time::Duration;

use serde::Deserialize;

use super::{parse_duration, ConfigError};

const DEFAULT_PORT: &str = "-";
const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// The link to the key scanner.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Transport {
    /// Device node or file the scanner writes to. `-` reads stdin (default).
    port: Option<String>,

    /// How long to wait for a byte before reporting idle (default: 100ms).
    receive_timeout: Option<String>,
}

impl Transport {
    pub fn port(&self) -> &str {
        self.port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    pub fn receive_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "transport.receive_timeout",
            self.receive_timeout.as_deref(),
            DEFAULT_RECEIVE_TIMEOUT,
        )
    }
}
