//! Comment trees as returned by `/comments/{id}` and `/api/morechildren`.
//!
//! Reddit nests replies inside each comment and leaves `more` placeholders
//! wherever it truncated the tree. [`CommentForest`] keeps the comments in an
//! arena with the placeholders on the side so they can be expanded later.

use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListing {
    pub kind: String,
    pub data: CommentListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListingData {
    #[serde(default)]
    pub children: Vec<CommentThing>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

/// `replies` is an empty string when a comment has none.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommentReplies {
    Listing(CommentListing),
    Empty(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub replies: Option<CommentReplies>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditMoreData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub parent_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<CommentThing>,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub name: String,
    pub body: String,
    replies: Vec<usize>,
}

/// A `more` placeholder and the comment it hangs off (`None` = top level).
#[derive(Debug, Clone)]
pub struct MoreStub {
    pub parent: Option<usize>,
    pub data: RedditMoreData,
}

#[derive(Debug, Clone, Default)]
pub struct CommentForest {
    link_id: String,
    comments: Vec<Comment>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
    pending: Vec<MoreStub>,
}

impl CommentForest {
    /// `link_id` is the submission fullname (`t3_...`).
    pub fn new(link_id: impl Into<String>) -> Self {
        Self {
            link_id: link_id.into(),
            ..Self::default()
        }
    }

    pub fn from_things(link_id: impl Into<String>, things: Vec<CommentThing>) -> Self {
        let mut forest = Self::new(link_id);
        for thing in things {
            forest.insert(None, thing);
        }
        forest
    }

    fn insert(&mut self, parent: Option<usize>, thing: CommentThing) {
        match thing {
            CommentThing::Comment(data) => {
                let idx = self.comments.len();
                self.comments.push(Comment {
                    name: data.name.clone(),
                    body: data.body,
                    replies: Vec::new(),
                });
                self.index.insert(data.name, idx);
                match parent {
                    Some(p) => self.comments[p].replies.push(idx),
                    None => self.roots.push(idx),
                }
                if let Some(CommentReplies::Listing(listing)) = data.replies {
                    for child in listing.data.children {
                        self.insert(Some(idx), child);
                    }
                }
            }
            CommentThing::More(data) => self.pending.push(MoreStub { parent, data }),
        }
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    /// Number of comments, nested replies included.
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn pending_more(&self) -> &[MoreStub] {
        &self.pending
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Comment> + '_ {
        self.roots.iter().map(|&i| &self.comments[i])
    }

    pub fn replies<'a>(&'a self, comment: &'a Comment) -> impl Iterator<Item = &'a Comment> + 'a {
        comment.replies.iter().map(|&i| &self.comments[i])
    }

    /// Removes and returns the placeholder hiding the most comments, among
    /// those hiding at least `threshold`. Ties go to the earliest one.
    pub fn take_expandable(&mut self, threshold: u64) -> Option<MoreStub> {
        let (pos, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, stub)| stub.data.count >= threshold && !stub.data.children.is_empty())
            .max_by_key(|(i, stub)| (stub.data.count, Reverse(*i)))?;
        Some(self.pending.remove(pos))
    }

    /// Attaches comments fetched for `stub`. Each is placed under its
    /// `parent_id`; unknown parents fall back to the stub's own parent.
    pub fn graft(&mut self, stub: &MoreStub, things: Vec<CommentThing>) {
        for thing in things {
            let parent_id = match &thing {
                CommentThing::Comment(c) => c.parent_id.as_str(),
                CommentThing::More(m) => m.parent_id.as_str(),
            };
            let parent = if parent_id == self.link_id {
                None
            } else {
                self.index.get(parent_id).copied().or(stub.parent)
            };
            self.insert(parent, thing);
        }
    }

    /// One string per top-level comment (at most `max_comments`): its body
    /// followed by the bodies of its first `depth` direct replies.
    pub fn flatten(&self, depth: usize, max_comments: usize) -> Vec<String> {
        self.top_level()
            .take(max_comments)
            .map(|comment| {
                let mut lines = vec![comment.body.as_str()];
                lines.extend(self.replies(comment).take(depth).map(|r| r.body.as_str()));
                lines.join("\n")
            })
            .collect()
    }
}
