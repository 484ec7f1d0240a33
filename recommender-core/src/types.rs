use std::fmt;

/// One `(client_id, client_secret)` pair for an app-only Reddit session.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub client_id: String,
    pub client_secret: String,
}

impl CredentialPair {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A subreddit together with its place in the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubredditEntry {
    pub category: String,
    pub subcategory: String,
    pub subreddit: String,
}

impl SubredditEntry {
    pub fn new(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        subreddit: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            subreddit: subreddit.into(),
        }
    }
}

impl fmt::Display for SubredditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.category, self.subcategory, self.subreddit)
    }
}
