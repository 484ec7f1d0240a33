use crate::shard::partition_interleaved;
use crate::worker::{HarvestOptions, ShardWorker, WorkerReport};
use recommender_core::{ConfigError, CoreError, CredentialPair, SubredditEntry};
use reddit_client::{RedditClient, RedditEndpoints, RedditOAuth2Config};
use std::path::Path;
use tracing::{error, info, info_span, Instrument};

/// Spreads `entries` over one worker per credential pair (capped by
/// `options.workers`) and waits for every worker to finish.
///
/// Shards are interleaved so each worker sees a mix of categories. Empty
/// shards are not started. A worker that panics is reported with its whole
/// shard failed.
pub async fn run_pool(
    entries: Vec<SubredditEntry>,
    credentials: &[CredentialPair],
    user_agent: &str,
    options: &HarvestOptions,
    root: &Path,
    endpoints: &RedditEndpoints,
) -> Result<Vec<WorkerReport>, CoreError> {
    if credentials.is_empty() {
        return Err(ConfigError::ValidationFailed {
            reason: "no Reddit credential pairs configured".to_string(),
        }
        .into());
    }

    let pool_size = options
        .workers
        .unwrap_or(credentials.len())
        .clamp(1, credentials.len());
    let total = entries.len();
    let shards = partition_interleaved(entries, pool_size);
    info!(
        "Harvesting {} subreddits with {} workers into {}",
        total,
        pool_size,
        root.display()
    );

    let mut handles = Vec::with_capacity(pool_size);
    for (id, (shard, credential)) in shards.into_iter().zip(credentials).enumerate() {
        if shard.is_empty() {
            continue;
        }

        let config = RedditOAuth2Config::from_credentials(credential, user_agent)
            .with_endpoints(endpoints.clone());
        let client = RedditClient::new(config)?;
        let worker = ShardWorker::new(id, client, options.clone(), root.to_path_buf());
        let shard_len = shard.len();

        let handle = tokio::spawn(
            worker
                .run(shard)
                .instrument(info_span!("worker", id = id)),
        );
        handles.push((id, shard_len, handle));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (id, shard_len, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("Worker {} did not finish: {}", id, e);
                reports.push(WorkerReport::crashed(id, shard_len));
            }
        }
    }

    let completed: usize = reports.iter().map(|r| r.completed).sum();
    let failed: usize = reports.iter().map(|r| r.failed).sum();
    info!(
        "Harvest finished: {} of {} subreddits completed, {} failed",
        completed, total, failed
    );
    Ok(reports)
}
