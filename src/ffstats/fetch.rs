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
use crate::nodes::NodesDocument;
use std::time::Duration;

/// Location of the `nodes.json` document of the Freifunk Rhein-Neckar map.
pub const DEFAULT_NODES_URL: &str = "https://map.ffrn.de/data/nodes.json";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the `nodes.json` document of a mesh map server.
#[derive(Debug, Clone)]
pub struct NodesClient {
    client: reqwest::Client,
    url: String,
}

impl NodesClient {
    /// Create a new client for the given URL. `timeout` applies to the entire
    /// request, including reading the response body.
    pub fn new<U: Into<String>>(url: U, timeout: Duration) -> Result<Self, StatsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StatsError::KindMsgCause(StatsErrorKind::Fetch, "unable to create HTTP client", Box::new(e)))?;

        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the document, returning an error if the request failed, the
    /// server responded with a non-success status, or the body isn't a nodes document.
    pub async fn fetch(&self) -> Result<NodesDocument, StatsError> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StatsError::KindMsgCause(StatsErrorKind::Fetch, "unable to fetch nodes", Box::new(e)))?;

        let body = res.bytes().await.map_err(|e| {
            StatsError::KindMsgCause(StatsErrorKind::Fetch, "unable to read nodes response", Box::new(e))
        })?;

        tracing::debug!(message = "fetched nodes document", url = %self.url, bytes = body.len());
        NodesDocument::from_slice(&body)
    }
}
