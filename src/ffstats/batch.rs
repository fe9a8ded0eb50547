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

use crate::nodes::{NodeRecord, NodesDocument};
use crate::translit::transliterate;
use serde_json::{Number, Value};
use std::fmt;

/// A single value to be written to Graphite, identified by a dot-delimited path
/// (without the global prefix).
#[derive(Debug, Clone, PartialEq)]
pub struct Datapoint {
    pub path: String,
    pub value: Number,
}

impl Datapoint {
    pub fn new<S, V>(path: S, value: V) -> Self
    where
        S: Into<String>,
        V: Into<Number>,
    {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Datapoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.value)
    }
}

/// Accumulator for all metrics produced during a single run.
///
/// Per-node metrics are added in the order nodes are processed. Totals across
/// all nodes are kept alongside and appended by [`MetricBatch::finish`].
#[derive(Debug, Default)]
pub struct MetricBatch {
    datapoints: Vec<Datapoint>,
    clients: u64,
    known_nodes: u64,
    online_nodes: u64,
    gateway_count: u64,
    gateways: Vec<String>,
    skipped: Vec<String>,
}

impl MetricBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from every node in the document.
    pub fn from_document(doc: NodesDocument) -> Self {
        let mut batch = Self::new();
        for (id, raw) in doc.nodes {
            batch.add_node(&id, raw);
        }

        batch
    }

    /// Decode and add a single node. Nodes that can't be decoded (missing `nodeinfo`
    /// or `flags`) are counted as known but otherwise skipped. Nodes without
    /// `statistics` still count towards online nodes and gateways but don't produce
    /// any metrics of their own.
    pub fn add_node(&mut self, id: &str, raw: Value) {
        self.known_nodes += 1;

        match NodeRecord::from_value(raw) {
            Ok(node) => self.add_record(id, &node),
            Err(e) => {
                tracing::warn!(message = "error while reading node, skipping", node = id, error = %e);
                self.skipped.push(id.to_owned());
            }
        }
    }

    fn add_record(&mut self, id: &str, node: &NodeRecord) {
        let hostname = transliterate(&node.nodeinfo.hostname);
        let base = format!("{}.{}", id, hostname);

        if node.flags.online {
            self.online_nodes += 1;
        }

        if node.flags.gateway {
            self.gateway_count += 1;
            self.gateways.push(hostname.clone());
        }

        let stats = match &node.statistics {
            Some(s) => s,
            None => {
                tracing::warn!(message = "node has no statistics, skipping", node = id);
                self.skipped.push(id.to_owned());
                return;
            }
        };

        if let Some(v) = &stats.loadavg {
            self.push(format!("{}.loadavg", base), v.clone());
        }

        if let Some(v) = &stats.uptime {
            self.push(format!("{}.uptime", base), v.clone());
        }

        if let Some(v) = &stats.clients {
            self.clients += client_count(v);
            self.push(format!("{}.clients", base), v.clone());
        }

        if let Some(v) = &stats.memory_usage {
            self.push(format!("{}.mem", base), v.clone());
        }

        if let Some(traffic) = &stats.traffic {
            for (direction, counters) in traffic.directions() {
                self.push(
                    format!("{}.traffic.{}.packets", base, direction),
                    counters.packets.clone(),
                );
                self.push(format!("{}.traffic.{}.bytes", base, direction), counters.bytes.clone());
            }
        }

        tracing::trace!(message = "flattened node", node = id, hostname = %hostname);
    }

    fn push(&mut self, path: String, value: Number) {
        self.datapoints.push(Datapoint { path, value });
    }

    /// Per-node datapoints added so far, not including totals.
    pub fn datapoints(&self) -> &[Datapoint] {
        &self.datapoints
    }

    pub fn clients(&self) -> u64 {
        self.clients
    }

    pub fn known_nodes(&self) -> u64 {
        self.known_nodes
    }

    pub fn online_nodes(&self) -> u64 {
        self.online_nodes
    }

    /// Hostnames of all nodes flagged as gateways.
    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    /// Identifiers of nodes that were skipped because they couldn't be decoded or
    /// had no statistics.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Append totals across all nodes and return every datapoint in the batch.
    pub fn finish(mut self) -> Vec<Datapoint> {
        self.datapoints.push(Datapoint::new("clients", self.clients));
        self.datapoints.push(Datapoint::new("known_nodes", self.known_nodes));
        self.datapoints.push(Datapoint::new("online_nodes", self.online_nodes));
        self.datapoints.push(Datapoint::new("gateways", self.gateway_count));
        self.datapoints
    }
}

/// Number of clients to add to the running total. Fractional counts are truncated
/// and anything negative is ignored.
fn client_count(v: &Number) -> u64 {
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
        .unwrap_or(0)
}
