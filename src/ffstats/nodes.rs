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

use crate::error::{StatsError, StatsErrorKind};
use serde::{de, Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Top level of the `nodes.json` document published by the map server.
///
/// Individual nodes are kept as raw JSON so that a single malformed node can be
/// skipped without rejecting the rest of the document.
#[derive(Debug, Deserialize)]
pub struct NodesDocument {
    pub nodes: BTreeMap<String, Value>,
}

impl NodesDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, StatsError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StatsError::KindMsgCause(StatsErrorKind::Decode, "unable to decode nodes document", Box::new(e))
        })
    }
}

/// A single mesh node. `nodeinfo` and `flags` must be present for a node to be
/// decoded. `statistics` is `None` when it is missing or isn't an object, in which
/// case no metrics are written for the node but its flags still count.
#[derive(Debug, Deserialize)]
pub struct NodeRecord {
    pub nodeinfo: NodeInfo,
    pub flags: Flags,
    #[serde(default, deserialize_with = "statistics_or_none")]
    pub statistics: Option<Statistics>,
}

impl NodeRecord {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeInfo {
    pub hostname: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Flags {
    pub online: bool,
    pub gateway: bool,
}

/// Statistics reported by a node.
///
/// Every field is optional and decoded on its own: a missing or non-numeric value
/// only results in `None` for that field. Numbers sent as strings (`"0.5"`) are
/// accepted.
#[derive(Debug, Default, Deserialize)]
pub struct Statistics {
    #[serde(default, deserialize_with = "number_or_none")]
    pub loadavg: Option<Number>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub uptime: Option<Number>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub clients: Option<Number>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub memory_usage: Option<Number>,
    #[serde(default, deserialize_with = "traffic_or_none")]
    pub traffic: Option<Traffic>,
}

/// Traffic counters of a node. All five directions are required, a partial
/// traffic block is treated the same as a missing one.
#[derive(Debug, Deserialize)]
pub struct Traffic {
    pub tx: Counters,
    pub rx: Counters,
    pub mgmt_tx: Counters,
    pub mgmt_rx: Counters,
    pub forward: Counters,
}

impl Traffic {
    /// Counters for each direction, in the order they are emitted.
    pub fn directions(&self) -> [(&'static str, &Counters); 5] {
        [
            ("tx", &self.tx),
            ("rx", &self.rx),
            ("mgmt_tx", &self.mgmt_tx),
            ("mgmt_rx", &self.mgmt_rx),
            ("forward", &self.forward),
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct Counters {
    #[serde(deserialize_with = "number")]
    pub packets: Number,
    #[serde(deserialize_with = "number")]
    pub bytes: Number,
}

fn as_number(value: Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number<'de, D>(deserializer: D) -> Result<Number, D::Error>
where
    D: Deserializer<'de>,
{
    as_number(Value::deserialize(deserializer)?).ok_or_else(|| de::Error::custom("expected a number"))
}

fn number_or_none<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_number(Value::deserialize(deserializer)?))
}

fn statistics_or_none<'de, D>(deserializer: D) -> Result<Option<Statistics>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn traffic_or_none<'de, D>(deserializer: D) -> Result<Option<Traffic>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
