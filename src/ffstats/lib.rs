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

//! Forward Freifunk mesh node statistics and DHCP lease counts to Graphite.
//!
//! ## Features
//!
//! `ffstats` contains two small programs meant to be run periodically from cron.
//! Neither keeps any state between runs.
//!
//! ### `mesh-stats`
//!
//! Fetches the `nodes.json` document of a mesh map server and writes statistics
//! for each node to a Graphite (carbon) plaintext listener. The following metrics
//! are written for each node, if the node reports them:
//!
//! * `ffrn.<id>.<hostname>.loadavg` - Load average of the node.
//! * `ffrn.<id>.<hostname>.uptime` - Uptime of the node in seconds.
//! * `ffrn.<id>.<hostname>.clients` - Number of clients connected to the node.
//! * `ffrn.<id>.<hostname>.mem` - Fraction of memory in use.
//! * `ffrn.<id>.<hostname>.traffic.<direction>.{packets,bytes}` - Traffic counters for
//!   `tx`, `rx`, `mgmt_tx`, `mgmt_rx`, and `forward`.
//!
//! Umlauts in hostnames are written as their ASCII spelling (`ä` becomes `ae`). Along
//! with the per-node metrics, the following totals are written:
//!
//! * `ffrn.clients` - Clients connected to all nodes.
//! * `ffrn.known_nodes` - Nodes in the document.
//! * `ffrn.online_nodes` - Nodes flagged as online.
//! * `ffrn.gateways` - Nodes flagged as gateways.
//!
//! Nodes that are missing required information are skipped and logged. Nodes that
//! report no statistics still count towards the online and gateway totals. Records that
//! can't be written as ISO-8859-1 are dropped. If the document can't be fetched or
//! Graphite can't be reached, the error is logged and nothing is retried.
//!
//! ### `dhcp-leases`
//!
//! Counts the current leases in an ISC dhcpd lease database and prints a single
//! Graphite record to standard output, meant to be piped to a carbon relay.
//!
//! ```text
//! ffrn.<hostname>.dhcp.active_leases <count> <timestamp>
//! ```
//!
//! The hostname is the fully qualified name of the host as resolved through DNS,
//! unless given with `--hostname`.
//!
//! ## Build
//!
//! `ffstats` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Install
//!
//! Copy both binaries to `/usr/local/bin` and run them from cron. `mesh-stats` waits
//! ten seconds before fetching node data by default so that many hosts started by
//! cron at the same time don't all hit the map server at once.
//!
//! ```text
//! * * * * * /usr/local/bin/mesh-stats
//! * * * * * /usr/local/bin/dhcp-leases | nc -q0 s.ffrn.de 2003
//! ```
//!

pub mod batch;
pub mod error;
pub mod fetch;
pub mod forward;
pub mod graphite;
pub mod leases;
pub mod nodes;
pub mod translit;
