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

//! Parser for the ISC dhcpd (IPv4) lease database format.
//!
//! The database is a journal of statements, most of which are `lease` blocks:
//!
//! ```text
//! lease 10.0.0.5 {
//!   starts 4 2026/10/15 19:48:36;
//!   ends 4 2026/10/15 20:48:36;
//!   binding state active;
//!   hardware ethernet 60:a4:4c:b5:6a:dd;
//!   client-hostname "laptop";
//! }
//! ```
//!
//! Statements other than `lease` blocks are parsed (to find where they end) and
//! then ignored, as are any statements within a lease that aren't needed to
//! determine if the lease is current.

use crate::error::StatsError;
use crate::leases::Lease;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
    Semi,
}

#[derive(Debug)]
struct Spanned {
    token: Token,
    line: usize,
}

/// Split the input into words, quoted strings (returned as words without the
/// quotes), braces, and semicolons. Comments run from `#` to the end of the line.
fn tokenize(input: &str) -> Result<Vec<Spanned>, StatsError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '#' => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '{' => tokens.push(Spanned { token: Token::Open, line }),
            '}' => tokens.push(Spanned { token: Token::Close, line }),
            ';' => tokens.push(Spanned { token: Token::Semi, line }),
            '"' => {
                let start = line;
                let mut word = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => {
                            // Escapes are kept verbatim, we only need to skip past them
                            word.push('\\');
                            if let Some(e) = chars.next() {
                                if e == '\n' {
                                    line += 1;
                                }
                                word.push(e);
                            }
                        }
                        Some(n) => {
                            if n == '\n' {
                                line += 1;
                            }
                            word.push(n);
                        }
                        None => return Err(StatsError::Parse(start, "unterminated string".to_owned())),
                    }
                }

                tokens.push(Spanned {
                    token: Token::Word(word),
                    line: start,
                });
            }
            c => {
                let mut word = String::new();
                word.push(c);
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || matches!(n, '{' | '}' | ';' | '"' | '#') {
                        break;
                    }
                    word.push(n);
                    chars.next();
                }

                tokens.push(Spanned {
                    token: Token::Word(word),
                    line,
                });
            }
        }
    }

    Ok(tokens)
}

/// A statement terminated by either a semicolon or a block in braces.
#[derive(Debug)]
struct Statement {
    line: usize,
    words: Vec<String>,
    block: Option<Vec<Statement>>,
}

struct Parser {
    tokens: std::vec::IntoIter<Spanned>,
    line: usize,
}

impl Parser {
    fn statements(&mut self, nested: bool) -> Result<Vec<Statement>, StatsError> {
        let mut out = Vec::new();
        let mut words = Vec::new();
        let mut start = None;

        loop {
            let Spanned { token, line } = match self.tokens.next() {
                Some(t) => t,
                None if nested => {
                    return Err(StatsError::Parse(self.line, "unexpected end of file in block".to_owned()))
                }
                None if !words.is_empty() => {
                    return Err(StatsError::Parse(self.line, "unexpected end of file in statement".to_owned()))
                }
                None => return Ok(out),
            };

            self.line = line;
            match token {
                Token::Word(w) => {
                    start.get_or_insert(line);
                    words.push(w);
                }
                Token::Semi => {
                    if !words.is_empty() {
                        out.push(Statement {
                            line: start.take().unwrap_or(line),
                            words: std::mem::take(&mut words),
                            block: None,
                        });
                    }
                }
                Token::Open => {
                    let block = self.statements(true)?;
                    out.push(Statement {
                        line: start.take().unwrap_or(line),
                        words: std::mem::take(&mut words),
                        block: Some(block),
                    });
                }
                Token::Close if nested => {
                    if !words.is_empty() {
                        return Err(StatsError::Parse(line, "missing semicolon before end of block".to_owned()));
                    }
                    return Ok(out);
                }
                Token::Close => return Err(StatsError::Parse(line, "unexpected end of block".to_owned())),
            }
        }
    }
}

/// Parse a date as written by dhcpd: `<weekday> YYYY/MM/DD HH:MM:SS` (UTC),
/// `epoch <seconds>`, or `never`. `never` is returned as `None`.
fn parse_date(line: usize, words: &[String]) -> Result<Option<DateTime<Utc>>, StatsError> {
    match words {
        [never] if never == "never" => Ok(None),
        [epoch, secs] if epoch == "epoch" => secs
            .parse::<i64>()
            .ok()
            .and_then(|s| Utc.timestamp_opt(s, 0).single())
            .map(Some)
            .ok_or_else(|| StatsError::Parse(line, format!("invalid epoch date '{}'", secs))),
        [_weekday, date, time] => NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y/%m/%d %H:%M:%S")
            .map(|n| Some(Utc.from_utc_datetime(&n)))
            .map_err(|e| StatsError::Parse(line, format!("invalid date '{} {}': {}", date, time, e))),
        _ => Err(StatsError::Parse(line, format!("invalid date '{}'", words.join(" ")))),
    }
}

fn lease_from_block(line: usize, addr: &str, block: &[Statement]) -> Result<Lease, StatsError> {
    let ip: Ipv4Addr = addr
        .parse()
        .map_err(|_| StatsError::Parse(line, format!("invalid lease address '{}'", addr)))?;

    let mut lease = Lease::new(ip);
    for stmt in block {
        let words: Vec<&str> = stmt.words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["starts", ..] => lease.starts = parse_date(stmt.line, &stmt.words[1..])?,
            ["ends", ..] => lease.ends = parse_date(stmt.line, &stmt.words[1..])?,
            ["binding", "state", state] => lease.binding_state = Some((*state).to_owned()),
            ["hardware", _kind, mac] => lease.hardware = Some(mac.to_ascii_lowercase()),
            ["client-hostname", name] => lease.client_hostname = Some((*name).to_owned()),
            _ => {}
        }
    }

    Ok(lease)
}

/// Parse all `lease` blocks from the contents of a lease database, in the order
/// they appear.
pub fn parse(input: &str) -> Result<Vec<Lease>, StatsError> {
    let mut parser = Parser {
        tokens: tokenize(input)?.into_iter(),
        line: 1,
    };

    let mut leases = Vec::new();
    for stmt in parser.statements(false)? {
        if let (Some(block), [kind, addr]) = (&stmt.block, stmt.words.as_slice()) {
            if kind == "lease" {
                leases.push(lease_from_block(stmt.line, addr, block)?);
            }
        }
    }

    Ok(leases)
}

#[cfg(test)]
mod test {
    use super::{parse, parse_date};
    use crate::error::StatsError;
    use chrono::{TimeZone, Utc};
    use std::net::Ipv4Addr;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(|w| w.to_owned()).collect()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2026, 10, 15, 19, 48, 36).unwrap()),
            parse_date(1, &words("4 2026/10/15 19:48:36")).unwrap()
        );
        assert_eq!(
            Some(Utc.timestamp_opt(1760557716, 0).unwrap()),
            parse_date(1, &words("epoch 1760557716")).unwrap()
        );
        assert_eq!(None, parse_date(1, &words("never")).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(3, &words("4 2026/13/45 19:48:36")).is_err());
        assert!(parse_date(3, &words("epoch soon")).is_err());
        assert!(parse_date(3, &words("tomorrow")).is_err());
    }

    #[test]
    fn test_parse_lease_file() {
        let contents = r#"
# The format of this file is documented in the dhcpd.leases(5) manual page.
# This lease file was written by isc-dhcp-4.4.3

# authoring-byte-order entry is generated, DO NOT DELETE
authoring-byte-order little-endian;

server-duid "\000\001\000\001)\243\215\220RT\000\022\0344";

lease 10.0.0.5 {
  starts 4 2026/10/15 19:48:36;
  ends 4 2026/10/15 20:48:36;
  cltt 4 2026/10/15 19:48:36;
  binding state active;
  next binding state free;
  rewind binding state free;
  hardware ethernet 60:A4:4C:B5:6A:DD;
  uid "\001`\244L\265j\335";
  set vendor-class-identifier = "android-dhcp-14";
  client-hostname "weird { name }";
}
lease 10.0.0.6 {
  starts epoch 1760557716; # Wed Oct 15 19:48:36 2026
  ends never;
  binding state free;
}
"#;

        let leases = parse(contents).unwrap();
        assert_eq!(2, leases.len());

        let first = &leases[0];
        assert_eq!(Ipv4Addr::new(10, 0, 0, 5), first.ip);
        assert_eq!(Some(Utc.with_ymd_and_hms(2026, 10, 15, 19, 48, 36).unwrap()), first.starts);
        assert_eq!(Some(Utc.with_ymd_and_hms(2026, 10, 15, 20, 48, 36).unwrap()), first.ends);
        assert_eq!(Some("active"), first.binding_state.as_deref());
        assert_eq!(Some("60:a4:4c:b5:6a:dd"), first.hardware.as_deref());
        assert_eq!(Some("weird { name }"), first.client_hostname.as_deref());

        let second = &leases[1];
        assert_eq!(Ipv4Addr::new(10, 0, 0, 6), second.ip);
        assert_eq!(Some(Utc.timestamp_opt(1760557716, 0).unwrap()), second.starts);
        assert_eq!(None, second.ends);
        assert_eq!(None, second.hardware);
    }

    #[test]
    fn test_parse_ignores_other_blocks() {
        let contents = r#"
failover peer "dhcp-failover" state {
  my state normal at 4 2026/10/15 19:00:00;
  partner state normal at 4 2026/10/15 19:00:00;
}
lease 10.0.0.7 {
  binding state active;
}
"#;

        let leases = parse(contents).unwrap();
        assert_eq!(1, leases.len());
        assert_eq!(Ipv4Addr::new(10, 0, 0, 7), leases[0].ip);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# nothing here yet\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_unterminated_block() {
        let res = parse("lease 10.0.0.5 {\n  binding state active;\n");

        match res.unwrap_err() {
            StatsError::Parse(line, _) => assert_eq!(2, line),
            e => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_parse_invalid_address() {
        let res = parse("lease 10.0.0.300 {\n  binding state active;\n}\n");

        match res.unwrap_err() {
            StatsError::Parse(line, msg) => {
                assert_eq!(1, line);
                assert!(msg.contains("10.0.0.300"));
            }
            e => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_parse_invalid_date_line() {
        let res = parse("lease 10.0.0.5 {\n  binding state active;\n  ends 4 2026/10/15;\n}\n");

        match res.unwrap_err() {
            StatsError::Parse(line, _) => assert_eq!(3, line),
            e => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_parse_unexpected_close() {
        assert!(parse("}\n").is_err());
        assert!(parse("lease 10.0.0.5 { binding state active }\n").is_err());
    }
}
