//! Request outcome bookkeeping.

use std::fmt;
use std::time::Duration;

/// Outcomes collected by one simulated user.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub requests: u64,
    pub failures: u64,
    latencies: Vec<Duration>,
}

impl Stats {
    pub fn record(&mut self, success: bool, latency: Duration) {
        self.requests += 1;
        if !success {
            self.failures += 1;
        }
        self.latencies.push(latency);
    }

    pub fn merge(&mut self, other: Stats) {
        self.requests += other.requests;
        self.failures += other.failures;
        self.latencies.extend(other.latencies);
    }

    pub fn summary(&self) -> Summary {
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();

        let mean = if sorted.is_empty() {
            Duration::ZERO
        } else {
            let total: u128 = sorted.iter().map(Duration::as_nanos).sum();
            let nanos = total / sorted.len() as u128;
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };

        Summary {
            requests: self.requests,
            failures: self.failures,
            mean,
            p50: percentile(&sorted, 50),
            p95: percentile(&sorted, 95),
            max: sorted.last().copied().unwrap_or_default(),
        }
    }
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted[rank - 1]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub requests: u64,
    pub failures: u64,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub max: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "requests: {}", self.requests)?;
        writeln!(f, "failures: {}", self.failures)?;
        write!(
            f,
            "latency ms: mean {} / p50 {} / p95 {} / max {}",
            self.mean.as_millis(),
            self.p50.as_millis(),
            self.p95.as_millis(),
            self.max.as_millis()
        )
    }
}
