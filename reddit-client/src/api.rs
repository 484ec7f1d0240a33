use crate::comments::{CommentListing, CommentThing, MoreChildrenResponse};
use crate::rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
use recommender_core::{ConfigError, CoreError, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit rejects larger `children` lists on `/api/morechildren`.
const MORE_CHILDREN_BATCH: usize = 100;

/// Reddit's rate-limit window; no reported reset is honoured beyond it.
const MAX_RESET_PAUSE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub stickied: bool,
}

impl RedditPostData {
    /// Fullname used as `link_id` by the comment endpoints.
    pub fn fullname(&self) -> String {
        if self.name.is_empty() {
            format!("t3_{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public_description: Option<String>,
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub over18: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct WikiPageList {
    data: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WikiPage {
    data: WikiPageData,
}

#[derive(Debug, Clone, Deserialize)]
struct WikiPageData {
    #[serde(default)]
    content_md: Option<String>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    api_base: String,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String, api_base: &str) -> Result<Self, CoreError> {
        Self::with_rate_limit(user_agent, api_base, RateLimitConfig::reddit_oauth())
    }

    pub fn with_rate_limit(
        user_agent: String,
        api_base: &str,
        rate_config: RateLimitConfig,
    ) -> Result<Self, CoreError> {
        Url::parse(api_base).map_err(|e| ConfigError::InvalidValue {
            field: "api_base".to_string(),
            value: format!("{api_base}: {e}"),
        })?;

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
            api_base: api_base.trim_end_matches('/').to_string(),
            user_agent,
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.api_base, endpoint);

        let _permit = self.rate_limiter.acquire_permit().await;
        debug!("Acquired rate limit permit for {} {}", method, endpoint);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .query(&[("raw_json", "1")]);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        self.observe_rate_limit_headers(&response).await;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        warn!("Request failed with status: {} for {}", status, endpoint);
        let error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })
            }
            401 => CoreError::RedditApi(RedditApiError::InvalidToken),
            403 => CoreError::RedditApi(RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            }),
            404 => CoreError::NotFound {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => {
                CoreError::RedditApi(RedditApiError::ServerError { status_code: code })
            }
            code => CoreError::RequestFailed {
                message: format!("{} {}", method, endpoint),
                status_code: Some(code),
            },
        };
        Err(error)
    }

    async fn observe_rate_limit_headers(&self, response: &Response) {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
        };
        if let (Some(remaining), Some(reset)) =
            (header("x-ratelimit-remaining"), header("x-ratelimit-reset"))
        {
            match reset_pause(reset) {
                Some(pause) => self.rate_limiter.observe_remaining(remaining, pause).await,
                None => warn!("Ignoring unusable x-ratelimit-reset value {}", reset),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, query_params)
            .await?;

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse response from {}", endpoint),
            })
        })
    }

    pub async fn get_subreddit_info(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<RedditSubredditData, CoreError> {
        let endpoint = format!("/r/{}/about", subreddit);

        let about: RedditListingChild<RedditSubredditData> = self
            .get_json(&endpoint, access_token, None)
            .await
            .map_err(|e| subreddit_not_found(e, subreddit))?;

        debug!("Retrieved info for r/{}", subreddit);
        Ok(about.data)
    }

    pub async fn get_top_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: usize,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/top", subreddit);
        let limit_str = limit.to_string();
        let params = [("t", "all"), ("limit", limit_str.as_str())];

        let listing: RedditListing<RedditPostData> = self
            .get_json(&endpoint, access_token, Some(&params[..]))
            .await
            .map_err(|e| subreddit_not_found(e, subreddit))?;

        info!(
            "Retrieved {} top posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    pub async fn get_wiki_pages(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<Vec<String>, CoreError> {
        let endpoint = format!("/r/{}/wiki/pages", subreddit);
        let pages: WikiPageList = self
            .get_json(&endpoint, access_token, None)
            .await
            .map_err(|e| subreddit_not_found(e, subreddit))?;
        Ok(pages.data)
    }

    pub async fn get_wiki_page(
        &self,
        access_token: &str,
        subreddit: &str,
        page: &str,
    ) -> Result<String, CoreError> {
        let endpoint = format!("/r/{}/wiki/{}", subreddit, page);
        let page: WikiPage = self.get_json(&endpoint, access_token, None).await?;
        Ok(page.data.content_md.unwrap_or_default())
    }

    /// Top-sorted comment listing of one submission.
    pub async fn get_comments(
        &self,
        access_token: &str,
        article_id: &str,
    ) -> Result<CommentListing, CoreError> {
        let endpoint = format!("/comments/{}", article_id);
        let params = [("sort", "top")];

        // The response is [submission listing, comment listing]
        let (_, comments): (IgnoredAny, CommentListing) = self
            .get_json(&endpoint, access_token, Some(&params[..]))
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => CoreError::RedditApi(RedditApiError::PostNotFound {
                    post_id: article_id.to_string(),
                }),
                other => other,
            })?;

        debug!(
            "Retrieved {} top-level comment entries for {}",
            comments.data.children.len(),
            article_id
        );
        Ok(comments)
    }

    pub async fn get_more_children(
        &self,
        access_token: &str,
        link_id: &str,
        children: &[String],
    ) -> Result<Vec<CommentThing>, CoreError> {
        let batch = &children[..children.len().min(MORE_CHILDREN_BATCH)];
        let children_param = batch.join(",");
        let params = [
            ("api_type", "json"),
            ("link_id", link_id),
            ("children", children_param.as_str()),
            ("sort", "top"),
            ("limit_children", "false"),
        ];

        let response: MoreChildrenResponse = self
            .get_json("/api/morechildren", access_token, Some(&params[..]))
            .await?;

        if !response.json.errors.is_empty() {
            return Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("morechildren errors: {:?}", response.json.errors),
            }));
        }

        Ok(response
            .json
            .data
            .map(|data| data.things)
            .unwrap_or_default())
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.get_rate_limit_status().await
    }
}

/// Converts an `x-ratelimit-reset` value into a pause, capped at one window.
/// `None` for NaN or infinite values.
pub(crate) fn reset_pause(reset: f64) -> Option<Duration> {
    if !reset.is_finite() {
        return None;
    }
    let pause = Duration::try_from_secs_f64(reset.max(0.0)).unwrap_or(MAX_RESET_PAUSE);
    Some(pause.min(MAX_RESET_PAUSE))
}

fn subreddit_not_found(error: CoreError, subreddit: &str) -> CoreError {
    match error {
        CoreError::NotFound { .. } => CoreError::RedditApi(RedditApiError::SubredditNotFound {
            subreddit: subreddit.to_string(),
        }),
        other => other,
    }
}
