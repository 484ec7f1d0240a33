use crate::render::{render_submission, to_ascii_lossy};
use recommender_core::{sanitize_dirname, subreddit_dir, CoreError, Settings, SubredditEntry};
use reddit_client::api::RedditPostData;
use reddit_client::RedditClient;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

pub const DESCRIPTION_FILE: &str = "description";
pub const WIKI_FILE: &str = "wiki";

pub fn submission_file(index: usize) -> String {
    format!("sub_{index}")
}

/// What to download for each subreddit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOptions {
    pub top_n_submissions: usize,
    pub comment_depth: usize,
    pub max_comments: usize,
    pub more_comments_limit: usize,
    pub more_comments_threshold: u64,
    pub fetch_wiki: bool,
    pub skip_categories: Vec<String>,
    pub workers: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for HarvestOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            top_n_submissions: settings.top_n_submissions,
            comment_depth: settings.comment_depth,
            max_comments: settings.max_comments,
            more_comments_limit: settings.more_comments_limit,
            more_comments_threshold: settings.more_comments_threshold,
            fetch_wiki: settings.fetch_wiki,
            skip_categories: settings.skip_categories.clone(),
            workers: settings.workers,
        }
    }
}

impl HarvestOptions {
    fn skips(&self, entry: &SubredditEntry) -> bool {
        let category = sanitize_dirname(&entry.category);
        self.skip_categories.iter().any(|skip| *skip == category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Failed { reason: String },
    /// The worker stopped before it could report.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Subreddits the worker tried to download; skipped ones are not counted.
    pub attempted: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub submissions_written: usize,
    pub auth: AuthOutcome,
}

impl WorkerReport {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            attempted: 0,
            completed: 0,
            skipped: 0,
            failed: 0,
            submissions_written: 0,
            auth: AuthOutcome::Authenticated,
        }
    }

    /// A shard that never got going: every entry counts as failed.
    pub fn abandoned(worker_id: usize, shard_len: usize, reason: impl Into<String>) -> Self {
        Self {
            failed: shard_len,
            auth: AuthOutcome::Failed {
                reason: reason.into(),
            },
            ..Self::new(worker_id)
        }
    }

    /// A worker task that died: its shard is counted as failed.
    pub fn crashed(worker_id: usize, shard_len: usize) -> Self {
        Self {
            failed: shard_len,
            auth: AuthOutcome::Unknown,
            ..Self::new(worker_id)
        }
    }

    pub fn is_success(&self) -> bool {
        self.auth == AuthOutcome::Authenticated && self.failed == 0
    }
}

/// Downloads one shard sequentially over a single Reddit session.
#[derive(Debug)]
pub struct ShardWorker {
    id: usize,
    client: RedditClient,
    options: HarvestOptions,
    root: PathBuf,
}

impl ShardWorker {
    pub fn new(id: usize, client: RedditClient, options: HarvestOptions, root: PathBuf) -> Self {
        Self {
            id,
            client,
            options,
            root,
        }
    }

    pub async fn run(mut self, shard: Vec<SubredditEntry>) -> WorkerReport {
        if let Err(e) = self.client.authenticate().await {
            error!(
                "Worker {} could not authenticate as {}: {}",
                self.id,
                self.client.client_id(),
                e
            );
            return WorkerReport::abandoned(self.id, shard.len(), e.to_string());
        }
        info!("Worker {} starting on {} subreddits", self.id, shard.len());

        let mut report = WorkerReport::new(self.id);
        let total = shard.len();
        for (i, entry) in shard.iter().enumerate() {
            if self.options.skips(entry) {
                debug!("Skipping {}", entry);
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            let dir = match subreddit_dir(&self.root, entry) {
                Ok(dir) => dir,
                Err(e) => {
                    report.failed += 1;
                    warn!("Worker {} cannot store {}: {}", self.id, entry, e);
                    continue;
                }
            };
            match self.harvest_subreddit(entry, &dir).await {
                Ok(written) => {
                    report.completed += 1;
                    report.submissions_written += written;
                    info!("{} of {} subreddits complete", i + 1, total);
                    info!("Wrote: {}", dir.display());
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Worker {} failed on {}: {}", self.id, entry, e);
                }
            }
        }

        info!(
            "Worker {} finished: {} completed, {} failed, {} skipped",
            self.id, report.completed, report.failed, report.skipped
        );
        report
    }

    /// Writes description, optional wiki and submissions. Returns the number
    /// of submission files written.
    async fn harvest_subreddit(
        &mut self,
        entry: &SubredditEntry,
        dir: &Path,
    ) -> Result<usize, CoreError> {
        let name = sanitize_dirname(&entry.subreddit);
        fs::create_dir_all(dir).await?;

        let description = match self.client.subreddit_description(&name).await {
            Ok(text) => text,
            Err(e) => {
                warn!("No description for r/{}: {}", name, e);
                String::new()
            }
        };
        fs::write(dir.join(DESCRIPTION_FILE), to_ascii_lossy(&description)).await?;

        if self.options.fetch_wiki {
            let wiki = match self.client.wiki_text(&name).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("No wiki for r/{}: {}", name, e);
                    String::new()
                }
            };
            fs::write(dir.join(WIKI_FILE), to_ascii_lossy(&wiki)).await?;
        }

        let submissions = self
            .client
            .top_submissions(&name, self.options.top_n_submissions)
            .await?;
        let total = submissions.len();
        for (i, submission) in submissions.iter().enumerate() {
            let text = self.submission_text(submission).await?;
            fs::write(dir.join(submission_file(i)), to_ascii_lossy(&text)).await?;
            debug!(
                "{} of {} submissions extracted for {}",
                i + 1,
                total,
                to_ascii_lossy(&name)
            );
        }
        Ok(total)
    }

    async fn submission_text(&mut self, submission: &RedditPostData) -> Result<String, CoreError> {
        let mut forest = self.client.comment_forest(submission).await?;
        self.client
            .replace_more(
                &mut forest,
                self.options.more_comments_limit,
                self.options.more_comments_threshold,
            )
            .await?;
        let chains = forest.flatten(self.options.comment_depth, self.options.max_comments);
        Ok(render_submission(&submission.title, &chains))
    }
}
