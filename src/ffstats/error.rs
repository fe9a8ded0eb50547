// ffstats - Freifunk mesh and DHCP statistics for Graphite
//
// Copyright 2026 The ffstats Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use std::error::Error;
use std::fmt::{self, Formatter};

/// Potential kinds of errors that can end a collection run
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy)]
pub enum StatsErrorKind {
    Fetch,
    Decode,
    Connect,
    Send,
    LeaseFile,
    Hostname,
}

impl StatsErrorKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            StatsErrorKind::Fetch => "fetch",
            StatsErrorKind::Decode => "decode",
            StatsErrorKind::Connect => "connect",
            StatsErrorKind::Send => "send",
            StatsErrorKind::LeaseFile => "lease_file",
            StatsErrorKind::Hostname => "hostname",
        }
    }
}

/// Error fetching node data, reading leases, or writing to Graphite
#[derive(Debug)]
pub enum StatsError {
    KindMsg(StatsErrorKind, &'static str),
    KindMsgCause(StatsErrorKind, &'static str, Box<dyn Error + Send + Sync>),
    Parse(usize, String),
}

impl StatsError {
    pub fn kind(&self) -> StatsErrorKind {
        match self {
            StatsError::KindMsg(kind, _) => *kind,
            StatsError::KindMsgCause(kind, _, _) => *kind,
            StatsError::Parse(_, _) => StatsErrorKind::LeaseFile,
        }
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::KindMsg(_, msg) => msg.fmt(f),
            StatsError::KindMsgCause(_, msg, ref e) => write!(f, "{}: {}", msg, e),
            StatsError::Parse(line, msg) => write!(f, "parse error on line {}: {}", line, msg),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StatsError::KindMsgCause(_, _, ref e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{StatsError, StatsErrorKind};
    use std::error::Error;
    use std::io;

    #[test]
    fn test_display_with_cause() {
        let cause = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err = StatsError::KindMsgCause(StatsErrorKind::Connect, "unable to connect", Box::new(cause));

        assert_eq!("unable to connect: connection refused", err.to_string());
        assert_eq!(StatsErrorKind::Connect, err.kind());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_parse_error_kind() {
        let err = StatsError::Parse(12, "unterminated lease block".to_owned());

        assert_eq!(StatsErrorKind::LeaseFile, err.kind());
        assert_eq!("parse error on line 12: unterminated lease block", err.to_string());
        assert!(err.source().is_none());
    }
}
