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

use crate::batch::MetricBatch;
use crate::error::StatsError;
use crate::fetch::NodesClient;
use crate::graphite::{GraphiteClient, Summary};

/// A single run of the mesh forwarder: fetch the nodes document, flatten every node,
/// and write the resulting batch to Graphite.
#[derive(Debug, Clone)]
pub struct Forwarder {
    nodes: NodesClient,
    graphite: GraphiteClient,
}

impl Forwarder {
    pub fn new(nodes: NodesClient, graphite: GraphiteClient) -> Self {
        Self { nodes, graphite }
    }

    /// Run once. Nothing is written to Graphite if the document can't be fetched.
    pub async fn run(&self) -> Result<Summary, StatsError> {
        let doc = self.nodes.fetch().await?;

        let batch = MetricBatch::from_document(doc);
        tracing::info!(
            message = "flattened node statistics",
            url = self.nodes.url(),
            known_nodes = batch.known_nodes(),
            online_nodes = batch.online_nodes(),
            gateways = ?batch.gateways(),
            skipped = batch.skipped().len(),
        );

        self.graphite.send(&batch.finish()).await
    }
}

#[cfg(test)]
mod test {
    use super::Forwarder;
    use crate::error::StatsErrorKind;
    use crate::fetch::NodesClient;
    use crate::graphite::{GraphiteClient, Summary};
    use crate::test::serve_http;
    use hyper::StatusCode;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(1);

    const TWO_NODES: &str = r#"{"nodes": {
        "A": {"nodeinfo": {"hostname": "alpha"}, "flags": {"online": true, "gateway": false},
              "statistics": {"clients": 5, "uptime": 100}},
        "B": {"nodeinfo": {"hostname": "beta"}, "flags": {"online": false, "gateway": true},
              "statistics": {}}
    }}"#;

    fn nodes_client(status: StatusCode, body: &'static str) -> NodesClient {
        let addr = serve_http(status, body);
        NodesClient::new(format!("http://{}/data/nodes.json", addr), TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_run_two_nodes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let carbon = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let forwarder = Forwarder::new(
            nodes_client(StatusCode::OK, TWO_NODES),
            GraphiteClient::new(carbon.to_string(), "ffrn", TIMEOUT),
        );
        let summary = forwarder.run().await.unwrap();
        assert_eq!(Summary { sent: 6, skipped: 0 }, summary);

        let received = server.await.unwrap();
        let records: Vec<Vec<&str>> = received.lines().map(|l| l.split(' ').collect()).collect();
        let metrics: Vec<(&str, &str)> = records.iter().map(|r| (r[0], r[1])).collect();
        assert_eq!(
            vec![
                ("ffrn.A.alpha.uptime", "100"),
                ("ffrn.A.alpha.clients", "5"),
                ("ffrn.clients", "5"),
                ("ffrn.known_nodes", "2"),
                ("ffrn.online_nodes", "1"),
                ("ffrn.gateways", "1"),
            ],
            metrics
        );
        assert!(records.iter().all(|r| r.len() == 3 && r[2] == records[0][2]));
        assert!(!received.contains(".beta."));
    }

    #[tokio::test]
    async fn test_run_fetch_failure_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let carbon = listener.local_addr().unwrap();

        let forwarder = Forwarder::new(
            nodes_client(StatusCode::SERVICE_UNAVAILABLE, "maintenance"),
            GraphiteClient::new(carbon.to_string(), "ffrn", TIMEOUT),
        );
        let res = forwarder.run().await;
        assert_eq!(StatsErrorKind::Fetch, res.unwrap_err().kind());

        let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err());
    }

    #[tokio::test]
    async fn test_run_graphite_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let carbon = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = Forwarder::new(
            nodes_client(StatusCode::OK, TWO_NODES),
            GraphiteClient::new(carbon.to_string(), "ffrn", TIMEOUT),
        );
        let res = forwarder.run().await;

        assert_eq!(StatsErrorKind::Connect, res.unwrap_err().kind());
    }
}
