pub mod api;
pub mod comments;
pub mod rate_limiter;


use api::{RedditApiClient, RedditPostData, REDDIT_API_BASE};
use comments::CommentForest;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError, TokenResponse,
    TokenUrl,
};
use recommender_core::{ConfigError, CoreError, CredentialPair, RedditApiError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub use rate_limiter::{RateLimitConfig, RateLimitStatus};

pub const REDDIT_AUTH_BASE: &str = "https://www.reddit.com";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Longest token lifetime we trust; Reddit issues one-day tokens.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditEndpoints {
    pub auth_base: String,
    pub api_base: String,
}

impl Default for RedditEndpoints {
    fn default() -> Self {
        Self {
            auth_base: REDDIT_AUTH_BASE.to_string(),
            api_base: REDDIT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub endpoints: RedditEndpoints,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
            endpoints: RedditEndpoints::default(),
        }
    }

    pub fn from_credentials(credentials: &CredentialPair, user_agent: &str) -> Self {
        Self::new(
            credentials.client_id.clone(),
            credentials.client_secret.clone(),
            user_agent.to_string(),
        )
    }

    pub fn with_endpoints(mut self, endpoints: RedditEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

/// An app-only Reddit session bound to one credential pair.
#[derive(Debug)]
pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    auth_state: AuthState,
    api: RedditApiClient,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(config.user_agent.clone(), &config.endpoints.api_base)?;
        Self::with_api(config, api)
    }

    pub fn with_api(config: RedditOAuth2Config, api: RedditApiClient) -> Result<Self, CoreError> {
        let auth_base = config.endpoints.auth_base.trim_end_matches('/');
        let invalid = |e: oauth2::url::ParseError| ConfigError::InvalidValue {
            field: "auth_base".to_string(),
            value: format!("{auth_base}: {e}"),
        };
        let auth_url = AuthUrl::new(format!("{auth_base}/api/v1/authorize")).map_err(invalid)?;
        let token_url =
            TokenUrl::new(format!("{auth_base}/api/v1/access_token")).map_err(invalid)?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            config,
            oauth_client,
            auth_state: AuthState::NotAuthenticated,
            api,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&self.auth_state, AuthState::Authenticated { token } if !token.is_expired())
    }

    pub fn needs_refresh(&self) -> bool {
        match &self.auth_state {
            AuthState::Authenticated { token } => token.is_expired(),
            AuthState::TokenExpired { .. } => true,
            AuthState::NotAuthenticated => false,
        }
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.auth_state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
    }

    /// Runs the client-credentials grant against `/api/v1/access_token`.
    pub async fn authenticate(&mut self) -> Result<(), CoreError> {
        info!("Requesting app-only token for client {}", self.config.client_id);
        let http = self.api.http_client();

        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_oauth_request(http, request))
            .await
            .map_err(|e| {
                let reason = match e {
                    RequestTokenError::ServerResponse(response) => {
                        format!("server rejected credentials: {response}")
                    }
                    RequestTokenError::Request(e) => format!("token request failed: {e}"),
                    RequestTokenError::Parse(e, _) => format!("unreadable token response: {e}"),
                    RequestTokenError::Other(message) => message,
                };
                CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
            })?;

        let lifetime = response
            .expires_in()
            .unwrap_or(Duration::from_secs(3600))
            .min(MAX_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        self.set_token(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: token_expiry(SystemTime::now(), lifetime),
            scope,
        });
        debug!("Token valid for {:?}", lifetime);
        Ok(())
    }

    /// Returns a usable access token, renewing it when it has expired.
    pub async fn ensure_authenticated(&mut self) -> Result<String, CoreError> {
        match &self.auth_state {
            AuthState::Authenticated { token } if !token.is_expired() => {
                return Ok(token.access_token.clone());
            }
            AuthState::NotAuthenticated => {
                return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: "Not authenticated".to_string(),
                }));
            }
            _ => {}
        }

        warn!("Access token expired, requesting a new one");
        self.authenticate().await?;
        match &self.auth_state {
            AuthState::Authenticated { token } => Ok(token.access_token.clone()),
            _ => Err(CoreError::RedditApi(RedditApiError::InvalidToken)),
        }
    }

    /// The subreddit's sidebar text; an empty string when it has none.
    pub async fn subreddit_description(&mut self, subreddit: &str) -> Result<String, CoreError> {
        let token = self.ensure_authenticated().await?;
        let about = self.api.get_subreddit_info(&token, subreddit).await?;
        Ok(about.description.unwrap_or_default())
    }

    /// Markdown of every wiki page, concatenated. Pages that cannot be read
    /// are skipped.
    pub async fn wiki_text(&mut self, subreddit: &str) -> Result<String, CoreError> {
        let token = self.ensure_authenticated().await?;
        let pages = self.api.get_wiki_pages(&token, subreddit).await?;

        let mut content = String::new();
        for page in &pages {
            match self.api.get_wiki_page(&token, subreddit, page).await {
                Ok(text) => content.push_str(&text),
                Err(e) => debug!("Skipping wiki page {} of r/{}: {}", page, subreddit, e),
            }
        }
        Ok(content)
    }

    pub async fn top_submissions(
        &mut self,
        subreddit: &str,
        limit: usize,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let token = self.ensure_authenticated().await?;
        let listing = self.api.get_top_posts(&token, subreddit, limit).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .take(limit)
            .collect())
    }

    pub async fn comment_forest(
        &mut self,
        submission: &RedditPostData,
    ) -> Result<CommentForest, CoreError> {
        let token = self.ensure_authenticated().await?;
        let listing = self.api.get_comments(&token, &submission.id).await?;
        Ok(CommentForest::from_things(
            submission.fullname(),
            listing.data.children,
        ))
    }

    /// Expands up to `limit` "more comments" placeholders, largest first,
    /// skipping those hiding fewer than `threshold` comments. Expansion is
    /// best effort: a failed request still uses up one of the `limit` slots.
    /// Returns the number of placeholders attempted.
    pub async fn replace_more(
        &mut self,
        forest: &mut CommentForest,
        limit: usize,
        threshold: u64,
    ) -> Result<usize, CoreError> {
        let mut attempted = 0;
        while attempted < limit {
            let Some(stub) = forest.take_expandable(threshold) else {
                break;
            };
            attempted += 1;

            let token = self.ensure_authenticated().await?;
            match self
                .api
                .get_more_children(&token, forest.link_id(), &stub.data.children)
                .await
            {
                Ok(things) => forest.graft(&stub, things),
                Err(e) => warn!(
                    "Could not expand {} more comments under {}: {}",
                    stub.data.count, stub.data.parent_id, e
                ),
            }
        }
        Ok(attempted)
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.api.get_rate_limit_status().await
    }
}

/// `now + lifetime` with the lifetime capped; `now` if the sum overflows.
pub(crate) fn token_expiry(now: SystemTime, lifetime: Duration) -> SystemTime {
    now.checked_add(lifetime.min(MAX_TOKEN_LIFETIME)).unwrap_or(now)
}

/// Executes an `oauth2` token request over the session's own client so the
/// user agent Reddit requires is sent along.
async fn send_oauth_request(
    client: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
