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

use chrono::Utc;
use clap::Parser;
use ffstats::graphite::DEFAULT_PREFIX;
use ffstats::leases::{active_leases_record, system_hostname, LeaseFile, DEFAULT_LEASES_PATH};
use std::path::PathBuf;
use std::process;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::WARN;

/// Print the number of active DHCP leases as a Graphite record
///
/// Read an ISC dhcpd lease database, count the leases that are currently active
/// (the latest lease of each client that is bound and has not expired), and print
/// the count as a single Graphite plaintext record to standard output.
#[derive(Debug, Parser)]
#[clap(name = "dhcp-leases", version = clap::crate_version!())]
struct DhcpLeasesApplication {
    /// Path to the ISC dhcpd lease database
    #[arg(long, default_value = DEFAULT_LEASES_PATH)]
    leases_file: PathBuf,

    /// Prefix for the metric path written
    #[arg(long, default_value_t = DEFAULT_PREFIX.to_owned())]
    prefix: String,

    /// Hostname to use in the metric path instead of the name of this host
    #[arg(long)]
    hostname: Option<String>,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[arg(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,
}

fn main() {
    let opts = DhcpLeasesApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let hostname = match opts.hostname.clone() {
        Some(h) => h,
        None => system_hostname().unwrap_or_else(|e| {
            tracing::error!(message = "unable to determine hostname", error = %e);
            process::exit(1)
        }),
    };

    let file = LeaseFile::new(&opts.leases_file);
    let now = Utc::now();
    let count = file.count_current(now).unwrap_or_else(|e| {
        tracing::error!(
            message = "unable to count active leases",
            path = %file.path().display(),
            kind = e.kind().as_label(),
            error = %e,
        );
        process::exit(1)
    });

    tracing::info!(message = "counted active leases", path = %file.path().display(), count = count);
    print!("{}", active_leases_record(&opts.prefix, &hostname, count, now));
}
