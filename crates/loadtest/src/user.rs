//! One simulated visitor.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::config::LoadTestConfig;
use crate::stats::Stats;

/// Random pause between two requests, uniform over `[min, max]`.
pub fn wait_between<R: Rng + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rng.random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

/// Client shared by all users. Development servers use self-signed
/// certificates, so certificate checks are off.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(30))
        .build()
}

/// Request `config.host` until `deadline`, pausing between requests.
pub async fn run(id: usize, client: reqwest::Client, config: LoadTestConfig, deadline: Instant) -> Stats {
    let mut stats = Stats::default();

    while Instant::now() < deadline {
        let started = Instant::now();
        let success = match client.get(&config.host).send().await {
            Ok(response) => {
                let status = response.status();
                // Drain the body so the timing covers the whole page.
                let drained = response.bytes().await.is_ok();
                if !status.is_success() {
                    tracing::warn!(user = id, %status, "Request failed");
                }
                status.is_success() && drained
            }
            Err(e) => {
                tracing::warn!(user = id, error = %e, "Request error");
                false
            }
        };
        stats.record(success, started.elapsed());

        let pause = wait_between(&mut rand::rng(), config.min_wait, config.max_wait);
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    tracing::debug!(user = id, requests = stats.requests, "User finished");
    stats
}
