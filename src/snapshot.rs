//! Point-in-time copy of a node's statistics.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::NoLookups;

/// All counters of a [Statistician](crate::Statistician), copied out at a
/// single point in time.
///
/// The lookup triple (`num_content_lookups`, `total_content_lookup_time_ns`,
/// `total_route_length`) is always mutually consistent. Serializable so
/// monitoring consumers don't have to scrape the display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cumulative bytes sent over the network.
    pub total_data_sent: u64,
    /// Number of send events recorded.
    pub num_data_sent: u64,
    /// Cumulative bytes received over the network.
    pub total_data_received: u64,
    /// Number of receive events recorded.
    pub num_data_received: u64,
    /// Duration of the most recent bootstrap, in nanoseconds.
    pub bootstrap_time_ns: u64,
    /// Number of completed content lookups.
    pub num_content_lookups: u64,
    /// Cumulative lookup latency, in nanoseconds.
    pub total_content_lookup_time_ns: u64,
    /// Cumulative routing hops across all lookups.
    pub total_route_length: u64,
}

impl Snapshot {
    /// The average time a content lookup took, in milliseconds rounded
    /// half-up to two decimal places.
    ///
    /// Returns [NoLookups] if no lookup was recorded.
    pub fn average_content_lookup_time(&self) -> Result<f64, NoLookups> {
        if self.num_content_lookups == 0 {
            return Err(NoLookups);
        }

        // Nanoseconds over (lookups * 1_000_000) is milliseconds.
        Ok(round2(
            self.total_content_lookup_time_ns as u128,
            self.num_content_lookups as u128 * 1_000_000,
        ))
    }

    /// The average route length of a content lookup in hops, rounded
    /// half-up to two decimal places.
    ///
    /// Returns [NoLookups] if no lookup was recorded.
    pub fn average_content_lookup_route_length(&self) -> Result<f64, NoLookups> {
        if self.num_content_lookups == 0 {
            return Err(NoLookups);
        }

        Ok(round2(
            self.total_route_length as u128,
            self.num_content_lookups as u128,
        ))
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Statistician: [Bootstrap Time: {}; Data Sent: ({}) {} bytes; Data Received: ({}) {} bytes; Num Content Lookups: {}; Avg Content Lookup Time: {}; Avg Content Lookup Route Lth: {}; ]",
            self.bootstrap_time_ns,
            self.num_data_sent,
            self.total_data_sent,
            self.num_data_received,
            self.total_data_received,
            self.num_content_lookups,
            fmt_average(self.average_content_lookup_time()),
            fmt_average(self.average_content_lookup_route_length()),
        )
    }
}

/// Undefined averages render as a placeholder, the summary never fails.
fn fmt_average(average: Result<f64, NoLookups>) -> String {
    match average {
        Ok(value) => format!("{:.2}", value),
        Err(NoLookups) => "N/A".to_string(),
    }
}

/// `numer / denom` rounded half-up to two decimal places.
///
/// Computed as integer hundredths so a raw .005 tie always rounds up,
/// independent of binary float representation.
fn round2(numer: u128, denom: u128) -> f64 {
    let hundredths = (numer * 100 + denom / 2) / denom;

    hundredths as f64 / 100.0
}
