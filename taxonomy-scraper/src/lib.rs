//! Builds the subreddit taxonomy from the r/ListOfSubreddits wiki.

mod parse;

pub use parse::parse_taxonomy;

use recommender_core::{
    CoreError, DataSubdir, ProjectLayout, RetryConfig, RetryExecutor, Settings, Taxonomy,
    TaxonomyError,
};
use reqwest::{Client, StatusCode};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SUBREDDIT_LIST_URL: &str =
    "https://www.reddit.com/r/ListOfSubreddits/wiki/listofsubreddits";

/// Copy of the scraped page kept next to the taxonomy for inspection.
pub const PAGE_FILE: &str = "pretty_subreddits.html";

#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub html: String,
    pub taxonomy: Taxonomy,
}

#[derive(Debug, Clone)]
pub struct TaxonomyScraper {
    client: Client,
    url: String,
    retry: RetryExecutor,
}

impl TaxonomyScraper {
    pub fn new(user_agent: &str) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: SUBREDDIT_LIST_URL.to_string(),
            retry: RetryExecutor::new(RetryConfig::taxonomy()),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Downloads the wiki page once. Throttled responses, whether signalled
    /// by status 429 or by the page title, become [`TaxonomyError::RateLimited`].
    pub async fn fetch_page(&self) -> Result<String, CoreError> {
        debug!("Fetching subreddit list from {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Subreddit list request was rate limited");
            return Err(TaxonomyError::RateLimited.into());
        }
        if !status.is_success() {
            return Err(TaxonomyError::UnexpectedStatus {
                url: self.url.clone(),
                status_code: status.as_u16(),
            }
            .into());
        }

        let html = response.text().await?;
        if parse::title_is_rate_limited(&html)? {
            warn!("Rate limit reached.");
            return Err(TaxonomyError::RateLimited.into());
        }
        Ok(html)
    }

    /// Fetches and parses the page, retrying while Reddit throttles us.
    pub async fn scrape(&self) -> Result<ScrapedPage, CoreError> {
        let html = self
            .retry
            .execute("subreddit list fetch", || self.fetch_page())
            .await?;

        let taxonomy = parse_taxonomy(&html)?;
        if taxonomy.is_empty() {
            return Err(TaxonomyError::EmptyTaxonomy.into());
        }

        info!(
            "Parsed {} subreddits in {} categories",
            taxonomy.len(),
            taxonomy.categories().count()
        );
        Ok(ScrapedPage { html, taxonomy })
    }
}

/// Writes the raw page under `data/processed` and the taxonomy JSON to its
/// configured path. Returns the taxonomy path.
pub fn persist(
    layout: &ProjectLayout,
    settings: &Settings,
    page: &ScrapedPage,
) -> Result<PathBuf, CoreError> {
    let page_path = layout.data_dir_file(PAGE_FILE, DataSubdir::Processed)?;
    fs::write(&page_path, &page.html)?;
    debug!("Wrote {}", page_path.display());

    let taxonomy_path = layout.taxonomy_path(settings);
    page.taxonomy.save(&taxonomy_path)?;
    info!("Wrote taxonomy to {}", taxonomy_path.display());
    Ok(taxonomy_path)
}
