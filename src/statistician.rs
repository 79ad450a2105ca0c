//! Operational statistics for a running DHT node.
//!
//! These statistics are session-scoped and are lost when the node is shut
//! down.

use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{NoLookups, Snapshot};

/// Statistics for this DHT node.
///
/// Updated concurrently by the transport (send/receive volume), the
/// bootstrap procedure (bootstrap latency), and lookup orchestration
/// (lookup count, latency, and route length). All methods take `&self`,
/// so one instance is shared behind an [`Arc`](std::sync::Arc).
#[derive(Debug, Default)]
pub struct Statistician {
    total_data_sent: AtomicU64,
    num_data_sent: AtomicU64,
    total_data_received: AtomicU64,
    num_data_received: AtomicU64,

    /// Duration of the most recent bootstrap in nanoseconds, last write wins.
    bootstrap_time_ns: AtomicU64,

    /// Content lookup counters, only ever updated as one unit.
    lookups: Mutex<LookupCounters>,
}

#[derive(Debug, Default, Clone, Copy)]
struct LookupCounters {
    count: u64,
    total_time_ns: u64,
    total_route_length: u64,
}

impl Statistician {
    /// Create a new statistician with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // === Public Methods ===

    /// Record that `size` bytes were sent over the network.
    pub fn record_sent(&self, size: u64) {
        self.total_data_sent.fetch_add(size, Ordering::Relaxed);
        self.num_data_sent.fetch_add(1, Ordering::Relaxed);

        trace!(size, "Recorded sent data");
    }

    /// The total data sent in bytes.
    pub fn total_data_sent(&self) -> u64 {
        self.total_data_sent.load(Ordering::Relaxed)
    }

    /// The number of send events recorded.
    pub fn num_data_sent(&self) -> u64 {
        self.num_data_sent.load(Ordering::Relaxed)
    }

    /// Record that `size` bytes were received over the network.
    pub fn record_received(&self, size: u64) {
        self.total_data_received.fetch_add(size, Ordering::Relaxed);
        self.num_data_received.fetch_add(1, Ordering::Relaxed);

        trace!(size, "Recorded received data");
    }

    /// The total data received in bytes.
    pub fn total_data_received(&self) -> u64 {
        self.total_data_received.load(Ordering::Relaxed)
    }

    /// The number of receive events recorded.
    pub fn num_data_received(&self) -> u64 {
        self.num_data_received.load(Ordering::Relaxed)
    }

    /// Set the time the bootstrap procedure took.
    ///
    /// The value is replaced, not accumulated; a node that re-bootstraps
    /// keeps only the most recent measurement.
    pub fn set_bootstrap_time(&self, time: Duration) {
        self.bootstrap_time_ns.store(as_nanos(time), Ordering::Relaxed);

        debug!(?time, "Node bootstrap complete");
    }

    /// The duration of the most recent bootstrap.
    pub fn bootstrap_time(&self) -> Duration {
        Duration::from_nanos(self.bootstrap_time_ns.load(Ordering::Relaxed))
    }

    /// Record a completed content lookup, how long it took and how many
    /// hops its route traversed.
    ///
    /// The lookup count, total time, and total route length advance
    /// together under one critical section; concurrent readers never
    /// observe one without the others.
    pub fn record_content_lookup(&self, time: Duration, route_length: u64) {
        let mut lookups = self.lookups();

        lookups.count += 1;
        lookups.total_time_ns += as_nanos(time);
        lookups.total_route_length += route_length;

        drop(lookups);

        trace!(?time, route_length, "Recorded content lookup");
    }

    /// The number of completed content lookups recorded.
    pub fn num_content_lookups(&self) -> u64 {
        self.lookups().count
    }

    /// The cumulative latency across all recorded content lookups.
    pub fn total_content_lookup_time(&self) -> Duration {
        Duration::from_nanos(self.lookups().total_time_ns)
    }

    /// The average time a content lookup took, in milliseconds rounded
    /// half-up to two decimal places.
    ///
    /// Returns [NoLookups] until the first lookup is recorded.
    pub fn average_content_lookup_time(&self) -> Result<f64, NoLookups> {
        self.snapshot().average_content_lookup_time()
    }

    /// The average route length of a content lookup in hops, rounded
    /// half-up to two decimal places.
    ///
    /// Returns [NoLookups] until the first lookup is recorded.
    pub fn average_content_lookup_route_length(&self) -> Result<f64, NoLookups> {
        self.snapshot().average_content_lookup_route_length()
    }

    /// Copy all counters out as a plain [Snapshot].
    ///
    /// The lookup triple is read under its critical section. The remaining
    /// fields are read individually and may be staggered by a few
    /// concurrent updates.
    pub fn snapshot(&self) -> Snapshot {
        let lookups = *self.lookups();

        Snapshot {
            total_data_sent: self.total_data_sent.load(Ordering::Relaxed),
            num_data_sent: self.num_data_sent.load(Ordering::Relaxed),
            total_data_received: self.total_data_received.load(Ordering::Relaxed),
            num_data_received: self.num_data_received.load(Ordering::Relaxed),
            bootstrap_time_ns: self.bootstrap_time_ns.load(Ordering::Relaxed),
            num_content_lookups: lookups.count,
            total_content_lookup_time_ns: lookups.total_time_ns,
            total_route_length: lookups.total_route_length,
        }
    }

    /// Start timing a content lookup.
    pub fn lookup_timer(&self) -> LookupTimer<'_> {
        LookupTimer {
            statistician: self,
            started: Instant::now(),
        }
    }

    // === Private Methods ===

    fn lookups(&self) -> MutexGuard<'_, LookupCounters> {
        // The critical section is pure arithmetic, a poisoned guard still
        // holds valid counters.
        self.lookups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Display for Statistician {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.snapshot(), f)
    }
}

/// Times a single content lookup.
///
/// Create one with [Statistician::lookup_timer] when a lookup starts and
/// call [LookupTimer::finish] with the route length once it completes.
/// A timer dropped without `finish` records nothing, only completed
/// lookups are counted.
#[derive(Debug)]
pub struct LookupTimer<'a> {
    statistician: &'a Statistician,
    started: Instant,
}

impl LookupTimer<'_> {
    /// Stop the clock and record the lookup.
    pub fn finish(self, route_length: u64) {
        self.statistician
            .record_content_lookup(self.started.elapsed(), route_length);
    }
}

// Duration::as_nanos is u128 but the counters are u64. Saturate on overflow.
fn as_nanos(time: Duration) -> u64 {
    u64::try_from(time.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_at_zero() {
        let stats = Statistician::new();

        assert_eq!(stats.total_data_sent(), 0);
        assert_eq!(stats.num_data_sent(), 0);
        assert_eq!(stats.total_data_received(), 0);
        assert_eq!(stats.num_data_received(), 0);
        assert_eq!(stats.bootstrap_time(), Duration::from_nanos(0));
        assert_eq!(stats.num_content_lookups(), 0);
        assert_eq!(stats.total_content_lookup_time(), Duration::from_nanos(0));
    }

    #[test]
    fn sent_and_received_accumulate_separately() {
        let stats = Statistician::new();

        stats.record_sent(100);
        stats.record_sent(50);
        stats.record_received(30);

        assert_eq!(stats.total_data_sent(), 150);
        assert_eq!(stats.num_data_sent(), 2);
        assert_eq!(stats.total_data_received(), 30);
        assert_eq!(stats.num_data_received(), 1);
    }

    #[test]
    fn bootstrap_time_is_overwritten_not_accumulated() {
        let stats = Statistician::new();

        stats.set_bootstrap_time(Duration::from_nanos(500));
        stats.set_bootstrap_time(Duration::from_nanos(700));

        assert_eq!(stats.bootstrap_time(), Duration::from_nanos(700));
    }

    #[test]
    fn content_lookups_update_count_time_and_route_together() {
        let stats = Statistician::new();

        stats.record_content_lookup(Duration::from_nanos(2_000_000), 3);
        stats.record_content_lookup(Duration::from_nanos(4_000_000), 5);

        assert_eq!(stats.num_content_lookups(), 2);
        assert_eq!(
            stats.total_content_lookup_time(),
            Duration::from_nanos(6_000_000)
        );
        assert_eq!(stats.average_content_lookup_time(), Ok(3.0));
        assert_eq!(stats.average_content_lookup_route_length(), Ok(4.0));
    }

    #[test]
    fn averages_need_at_least_one_lookup() {
        let stats = Statistician::new();

        assert_eq!(stats.average_content_lookup_time(), Err(NoLookups));
        assert_eq!(stats.average_content_lookup_route_length(), Err(NoLookups));
    }

    #[test]
    fn lookup_timer_records_once_on_finish() {
        let stats = Statistician::new();

        stats.lookup_timer().finish(3);

        assert_eq!(stats.num_content_lookups(), 1);
        assert_eq!(stats.snapshot().total_route_length, 3);
    }

    #[test]
    fn dropped_lookup_timer_records_nothing() {
        let stats = Statistician::new();

        drop(stats.lookup_timer());

        assert_eq!(stats.num_content_lookups(), 0);
    }

    #[test]
    fn concurrent_sends_lose_no_updates() {
        let stats = Arc::new(Statistician::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        stats.record_sent(1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("sender thread panicked");
        }

        assert_eq!(stats.total_data_sent(), 8_000);
        assert_eq!(stats.num_data_sent(), 8_000);
    }
}
