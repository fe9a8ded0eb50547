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

use clap::Parser;
use ffstats::fetch::{NodesClient, DEFAULT_NODES_URL};
use ffstats::forward::Forwarder;
use ffstats::graphite::{GraphiteClient, DEFAULT_PREFIX};
use std::time::Duration;
use tracing::{Instrument, Level};

const DEFAULT_CARBON_ADDR: &str = "s.ffrn.de:2003";
const DEFAULT_STARTUP_DELAY_SECS: u64 = 10;
const DEFAULT_FETCH_TIMEOUT_MILLIS: u64 = 1000;
const DEFAULT_SEND_TIMEOUT_MILLIS: u64 = 1000;
const DEFAULT_LOG_LEVEL: Level = Level::WARN;

/// Forward statistics of Freifunk mesh nodes to Graphite
///
/// Fetch the nodes.json document of a mesh map server, flatten the statistics of
/// each node into Graphite metric paths, and write them along with totals across
/// all nodes to a carbon plaintext listener. Meant to be run periodically from cron,
/// each run is independent and failures are logged but not retried.
#[derive(Debug, Parser)]
#[clap(name = "mesh-stats", version = clap::crate_version!())]
struct MeshStatsApplication {
    /// URL of the nodes.json document to read node statistics from
    #[arg(long, default_value_t = DEFAULT_NODES_URL.to_owned())]
    nodes_url: String,

    /// Address (host:port) of the carbon plaintext listener to write metrics to
    #[arg(long, default_value_t = DEFAULT_CARBON_ADDR.to_owned())]
    carbon_addr: String,

    /// Prefix for all metric paths written
    #[arg(long, default_value_t = DEFAULT_PREFIX.to_owned())]
    prefix: String,

    /// Wait this long before fetching node data, in seconds. Spreads out requests
    /// to the map server when many hosts run on the same schedule
    #[arg(long, default_value_t = DEFAULT_STARTUP_DELAY_SECS)]
    startup_delay_secs: u64,

    /// Timeout for fetching the nodes document, in milliseconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_MILLIS)]
    fetch_timeout_millis: u64,

    /// Timeout for connecting and writing to the carbon listener, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SEND_TIMEOUT_MILLIS)]
    send_timeout_millis: u64,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[arg(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opts = MeshStatsApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let nodes = match NodesClient::new(&opts.nodes_url, Duration::from_millis(opts.fetch_timeout_millis)) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(message = "failed to initialize HTTP client", kind = e.kind().as_label(), error = %e);
            return;
        }
    };
    let graphite = GraphiteClient::new(
        &opts.carbon_addr,
        &opts.prefix,
        Duration::from_millis(opts.send_timeout_millis),
    );
    let forwarder = Forwarder::new(nodes, graphite);

    tokio::time::sleep(Duration::from_secs(opts.startup_delay_secs)).await;

    // Failed runs are logged but never reported through the exit code, the
    // next scheduled run simply tries again.
    match forwarder
        .run()
        .instrument(tracing::span!(Level::DEBUG, "mesh_stats_run"))
        .await
    {
        Ok(summary) => {
            tracing::info!(
                message = "wrote metrics to graphite",
                address = %opts.carbon_addr,
                sent = summary.sent,
                skipped = summary.skipped,
            );
        }
        Err(e) => {
            tracing::error!(message = "unable to forward node statistics", kind = e.kind().as_label(), error = %e);
        }
    }
}
