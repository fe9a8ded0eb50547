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

mod isc;

pub use crate::leases::isc::parse;

use crate::error::{StatsError, StatsErrorKind};
use crate::graphite::format_record;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// Default location of the ISC dhcpd lease database on Debian based systems.
pub const DEFAULT_LEASES_PATH: &str = "/var/lib/dhcp/dhcpd.leases";

/// A single entry from the lease database.
///
/// The same address may appear several times in a database since entries are
/// appended to it as leases change. Later entries supersede earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    pub ip: Ipv4Addr,
    pub starts: Option<DateTime<Utc>>,
    /// End of the lease, `None` if the lease never ends.
    pub ends: Option<DateTime<Utc>>,
    pub binding_state: Option<String>,
    pub hardware: Option<String>,
    pub client_hostname: Option<String>,
}

impl Lease {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            starts: None,
            ends: None,
            binding_state: None,
            hardware: None,
            client_hostname: None,
        }
    }

    /// True if `now` is within the start and end of the lease.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.starts.map_or(true, |s| s <= now) && self.ends.map_or(true, |e| now <= e)
    }

    /// True if the server considers the lease bound to a client.
    pub fn is_active(&self) -> bool {
        self.binding_state.as_deref() == Some("active")
    }
}

/// Return leases that are active and valid at `now`, only the latest entry for each
/// client (by hardware address, or by IP address for leases without one).
pub fn current(leases: &[Lease], now: DateTime<Utc>) -> Vec<&Lease> {
    let mut by_client: BTreeMap<String, &Lease> = BTreeMap::new();

    for lease in leases.iter().filter(|l| l.is_active() && l.is_valid_at(now)) {
        let key = lease.hardware.clone().unwrap_or_else(|| lease.ip.to_string());
        tracing::trace!(
            message = "current lease",
            ip = %lease.ip,
            client = %key,
            hostname = ?lease.client_hostname,
        );
        by_client.insert(key, lease);
    }

    by_client.into_values().collect()
}

/// An ISC dhcpd lease database on disk.
#[derive(Debug, Clone)]
pub struct LeaseFile {
    path: PathBuf,
}

impl LeaseFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse every lease in the database.
    pub fn read(&self) -> Result<Vec<Lease>, StatsError> {
        let bytes = fs::read(&self.path).map_err(|e| {
            StatsError::KindMsgCause(StatsErrorKind::LeaseFile, "unable to read lease file", Box::new(e))
        })?;

        let leases = parse(&String::from_utf8_lossy(&bytes))?;
        tracing::debug!(message = "read lease file", path = %self.path.display(), num_leases = leases.len());
        Ok(leases)
    }

    /// Number of current leases in the database at `now`.
    pub fn count_current(&self, now: DateTime<Utc>) -> Result<usize, StatsError> {
        let leases = self.read()?;
        Ok(current(&leases, now).len())
    }
}

/// Fully qualified name of this host, used as part of the metric path.
pub fn system_hostname() -> Result<String, StatsError> {
    let name = hostname::get().map_err(|e| {
        StatsError::KindMsgCause(StatsErrorKind::Hostname, "unable to get system hostname", Box::new(e))
    })?;

    let name = name
        .into_string()
        .map_err(|_| StatsError::KindMsg(StatsErrorKind::Hostname, "system hostname is not valid unicode"))?;

    Ok(fully_qualified(&name))
}

/// Resolve `name` and return the first reverse lookup result of its addresses that
/// is a qualified domain name. If there is none, or resolution fails, `name` is
/// returned unchanged.
pub fn fully_qualified(name: &str) -> String {
    let addrs = match dns_lookup::lookup_host(name) {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::debug!(message = "unable to resolve hostname", hostname = name, error = %e);
            return name.to_owned();
        }
    };

    let candidates = addrs.into_iter().filter_map(|addr| match dns_lookup::lookup_addr(&addr) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::debug!(message = "reverse lookup failed", address = %addr, error = %e);
            None
        }
    });

    pick_qualified(name, candidates)
}

/// First candidate that contains a dot and isn't a bare IP address (reverse lookups
/// return the numeric address when no name is known), otherwise `name`.
fn pick_qualified<I>(name: &str, candidates: I) -> String
where
    I: IntoIterator<Item = String>,
{
    candidates
        .into_iter()
        .find(|c| c.contains('.') && c.parse::<IpAddr>().is_err())
        .unwrap_or_else(|| name.to_owned())
}

/// Path of the active lease count metric for the given host, without prefix.
pub fn active_leases_path(hostname: &str) -> String {
    format!("{}.dhcp.active_leases", hostname)
}

/// Graphite record with the active lease count of `hostname` at `now`. Times
/// before the UNIX epoch are written as zero.
pub fn active_leases_record(prefix: &str, hostname: &str, count: usize, now: DateTime<Utc>) -> String {
    let timestamp = u64::try_from(now.timestamp()).unwrap_or(0);
    format_record(prefix, &active_leases_path(hostname), count, timestamp)
}

#[cfg(test)]
mod test {
    use super::{active_leases_record, current, fully_qualified, parse, pick_qualified, Lease, LeaseFile};
    use crate::error::StatsErrorKind;
    use chrono::{DateTime, TimeZone, Utc};
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::PathBuf;
    use std::{env, fs, process};

    const LEASES: &str = r#"
lease 10.0.0.10 {
  starts 4 2026/10/15 06:00:00;
  ends 4 2026/10/15 08:00:00;
  binding state active;
  hardware ethernet aa:aa:aa:aa:aa:01;
}
lease 10.0.0.11 {
  starts 4 2026/10/15 06:30:00;
  ends 4 2026/10/15 08:30:00;
  binding state active;
  hardware ethernet aa:aa:aa:aa:aa:02;
}
lease 10.0.0.12 {
  starts 4 2026/10/15 06:45:00;
  ends never;
  binding state active;
  hardware ethernet aa:aa:aa:aa:aa:03;
}
lease 10.0.0.13 {
  starts 3 2026/10/14 06:00:00;
  ends 3 2026/10/14 08:00:00;
  binding state active;
  hardware ethernet aa:aa:aa:aa:aa:04;
}
lease 10.0.0.14 {
  starts 3 2026/10/14 09:00:00;
  ends 3 2026/10/14 11:00:00;
  binding state free;
  hardware ethernet aa:aa:aa:aa:aa:05;
}
"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 7, 0, 0).unwrap()
    }

    fn lease(ip: [u8; 4], state: &str, hardware: Option<&str>) -> Lease {
        let mut l = Lease::new(Ipv4Addr::from(ip));
        l.binding_state = Some(state.to_owned());
        l.hardware = hardware.map(|h| h.to_owned());
        l
    }

    #[test]
    fn test_three_active_two_expired() {
        let leases = parse(LEASES).unwrap();
        assert_eq!(5, leases.len());
        assert_eq!(3, current(&leases, now()).len());
    }

    #[test]
    fn test_lease_validity() {
        let mut l = lease([10, 0, 0, 1], "active", None);
        assert!(l.is_valid_at(now()));

        l.starts = Some(Utc.with_ymd_and_hms(2026, 10, 15, 7, 0, 1).unwrap());
        assert!(!l.is_valid_at(now()));

        l.starts = Some(Utc.with_ymd_and_hms(2026, 10, 15, 6, 0, 0).unwrap());
        l.ends = Some(now());
        assert!(l.is_valid_at(now()));

        l.ends = Some(Utc.with_ymd_and_hms(2026, 10, 15, 6, 59, 59).unwrap());
        assert!(!l.is_valid_at(now()));
    }

    #[test]
    fn test_lease_active() {
        assert!(lease([10, 0, 0, 1], "active", None).is_active());
        assert!(!lease([10, 0, 0, 1], "free", None).is_active());
        assert!(!lease([10, 0, 0, 1], "backup", None).is_active());
        assert!(!Lease::new(Ipv4Addr::new(10, 0, 0, 1)).is_active());
    }

    #[test]
    fn test_current_latest_entry_per_client() {
        let leases = vec![
            lease([10, 0, 0, 1], "active", Some("aa:aa:aa:aa:aa:01")),
            lease([10, 0, 0, 2], "active", Some("aa:aa:aa:aa:aa:01")),
            lease([10, 0, 0, 3], "active", None),
            lease([10, 0, 0, 3], "active", None),
            lease([10, 0, 0, 4], "active", None),
        ];

        let current = current(&leases, now());
        assert_eq!(3, current.len());
        assert!(current.iter().any(|l| l.ip == Ipv4Addr::new(10, 0, 0, 2)));
        assert!(!current.iter().any(|l| l.ip == Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_lease_file_count() {
        let path: PathBuf = env::temp_dir().join(format!("ffstats-dhcpd-{}.leases", process::id()));
        fs::write(&path, LEASES).unwrap();

        let count = LeaseFile::new(&path).count_current(now());
        fs::remove_file(&path).unwrap();

        assert_eq!(3, count.unwrap());
    }

    #[test]
    fn test_lease_file_missing() {
        let file = LeaseFile::new("/nonexistent/ffstats/dhcpd.leases");
        let res = file.read();

        assert_eq!(StatsErrorKind::LeaseFile, res.unwrap_err().kind());
    }

    #[test]
    fn test_active_leases_record() {
        assert_eq!(
            "ffrn.gw01.ffrn.de.dhcp.active_leases 3 1792047600\n",
            active_leases_record("ffrn", "gw01.ffrn.de", 3, now())
        );
    }

    #[test]
    fn test_active_leases_record_before_epoch() {
        let then = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            "ffrn.gw01.dhcp.active_leases 0 0\n",
            active_leases_record("ffrn", "gw01", 0, then)
        );
    }

    #[test]
    fn test_pick_qualified() {
        let found = pick_qualified("gw01", vec!["gw01".to_owned(), "gw01.ffrn.de".to_owned()]);
        assert_eq!("gw01.ffrn.de", found);
    }

    #[test]
    fn test_pick_qualified_skips_addresses() {
        let found = pick_qualified("gw01", vec!["10.0.0.1".to_owned(), "fe80::1".to_owned()]);
        assert_eq!("gw01", found);

        let found = pick_qualified("gw01", vec!["192.168.1.1".to_owned(), "gw01.local.lan".to_owned()]);
        assert_eq!("gw01.local.lan", found);
    }

    #[test]
    fn test_pick_qualified_no_candidates() {
        assert_eq!("gw01", pick_qualified("gw01", Vec::<String>::new()));
    }

    #[test]
    fn test_fully_qualified_localhost() {
        let name = fully_qualified("localhost");
        assert!(!name.is_empty());
        assert!(name.parse::<IpAddr>().is_err());
    }

    #[test]
    fn test_fully_qualified_unresolvable() {
        assert_eq!("ffstats-no-such-host.invalid", fully_qualified("ffstats-no-such-host.invalid"));
    }
}
