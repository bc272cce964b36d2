use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod client;
mod config;

use client::ApiClient;
use config::SweeperConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting sweeper service");

    let config = SweeperConfig::from_env()?;
    let api = ApiClient::new(reqwest::Client::new(), config.api_base_url.clone());

    let mut scheduler = JobScheduler::new().await?;
    let mut jobs = 0;

    match config.cleanup_token.clone() {
        Some(token) => {
            scheduler
                .add(cleanup_job(&config.cleanup_schedule, api.clone(), token)?)
                .await?;
            info!("Gallery cleanup scheduled: {}", config.cleanup_schedule);
            jobs += 1;
        }
        None => warn!("GALLERY_CLEANUP_TOKEN not set, gallery cleanup disabled"),
    }

    match (&config.fixtures_warm_schedule, config.cron_secret.clone()) {
        (Some(schedule), Some(secret)) => {
            scheduler.add(warm_job(schedule, api.clone(), secret)?).await?;
            info!("Fixtures warming scheduled: {}", schedule);
            jobs += 1;
        }
        (Some(_), None) => warn!("FIXTURES_WARM_SCHEDULE set without CRON_SECRET, warming disabled"),
        _ => {}
    }

    if jobs == 0 {
        anyhow::bail!("No jobs configured");
    }

    scheduler.start().await?;
    info!("Sweeper started with {} job(s)", jobs);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down sweeper service");
    scheduler.shutdown().await?;

    Ok(())
}

fn cleanup_job(schedule: &str, api: ApiClient, token: String) -> Result<Job> {
    let job = Job::new_async(schedule, move |_, _| {
        let api = api.clone();
        let token = token.clone();
        Box::pin(async move {
            match api.run_cleanup(&token).await {
                Ok(report) => info!(
                    purged = report.purged,
                    revalidated = report.revalidated,
                    marked_deleted = report.marked_deleted,
                    "Gallery cleanup finished"
                ),
                Err(e) => error!("Gallery cleanup failed: {:#}", e),
            }
        })
    })?;
    Ok(job)
}

fn warm_job(schedule: &str, api: ApiClient, secret: String) -> Result<Job> {
    let job = Job::new_async(schedule, move |_, _| {
        let api = api.clone();
        let secret = secret.clone();
        Box::pin(async move {
            if let Err(e) = api.warm_fixtures(&secret).await {
                error!("Fixtures warming failed: {:#}", e);
            }
        })
    })?;
    Ok(job)
}
