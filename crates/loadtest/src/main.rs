//! `mysite-loadtest` -- hammer the site's front page with simulated users.
//!
//! Configuration is documented on
//! [`LoadTestConfig::from_lookup`](mysite_loadtest::config::LoadTestConfig::from_lookup).

use anyhow::Context;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mysite_loadtest::config::LoadTestConfig;
use mysite_loadtest::stats::Stats;
use mysite_loadtest::user;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mysite_loadtest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LoadTestConfig::from_lookup(|key| std::env::var(key).ok())
        .context("Invalid load-test configuration")?;
    let client = user::build_client().context("Failed to build HTTP client")?;

    tracing::info!(
        host = %config.host,
        users = config.users,
        run_secs = config.run_for.as_secs(),
        "Starting load test"
    );

    let deadline = Instant::now() + config.run_for;
    let handles: Vec<_> = (0..config.users)
        .map(|id| tokio::spawn(user::run(id, client.clone(), config.clone(), deadline)))
        .collect();

    let mut total = Stats::default();
    for handle in handles {
        total.merge(handle.await.context("Simulated user panicked")?);
    }

    println!("{}", total.summary());
    Ok(())
}
