//! The category → subcategory → subreddit hierarchy scraped from the
//! list-of-subreddits wiki and consumed by the harvester.

use crate::{CoreError, SubredditEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a category, replacing any previous one of the same name.
    pub fn reset_category(&mut self, category: &str) {
        self.0.insert(category.to_string(), BTreeMap::new());
    }

    /// Starts a subcategory of `category`, replacing any previous list.
    pub fn reset_subcategory(&mut self, category: &str, subcategory: &str) {
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(subcategory.to_string(), Vec::new());
    }

    pub fn has_subcategory(&self, category: &str, subcategory: &str) -> bool {
        self.0
            .get(category)
            .is_some_and(|subs| subs.contains_key(subcategory))
    }

    /// Appends `subreddit` to an existing subcategory. Returns false when the
    /// subcategory does not exist.
    pub fn push(&mut self, category: &str, subcategory: &str, subreddit: &str) -> bool {
        match self
            .0
            .get_mut(category)
            .and_then(|subs| subs.get_mut(subcategory))
        {
            Some(list) => {
                list.push(subreddit.to_string());
                true
            }
            None => false,
        }
    }

    pub fn contains_subreddit(&self, subreddit: &str) -> bool {
        self.0
            .values()
            .flat_map(|subs| subs.values())
            .any(|list| list.iter().any(|s| s == subreddit))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn subcategories(&self, category: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.0.get(category)
    }

    /// Number of subreddit names across every list.
    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(|subs| subs.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the hierarchy into entries, in key order then list order.
    pub fn flatten(&self) -> Vec<SubredditEntry> {
        let mut entries = Vec::with_capacity(self.len());
        for (category, subs) in &self.0 {
            for (subcategory, subreddits) in subs {
                for subreddit in subreddits {
                    entries.push(SubredditEntry::new(
                        category.as_str(),
                        subcategory.as_str(),
                        subreddit.as_str(),
                    ));
                }
            }
        }
        entries
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path)?;
        let taxonomy: Taxonomy = serde_json::from_str(&text)?;
        debug!(
            "Loaded taxonomy with {} subreddits from {}",
            taxonomy.len(),
            path.display()
        );
        Ok(taxonomy)
    }

    /// Writes the taxonomy as JSON with sorted keys and a 4-space indent.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, buf)?;
        Ok(())
    }
}

impl From<BTreeMap<String, BTreeMap<String, Vec<String>>>> for Taxonomy {
    fn from(map: BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Taxonomy {
        let mut taxonomy = Taxonomy::new();
        taxonomy.reset_subcategory("General Content", "Discussion");
        taxonomy.push("General Content", "Discussion", "/r/AskReddit");
        taxonomy.push("General Content", "Discussion", "/r/CasualConversation");
        taxonomy.reset_subcategory("General Content", "News");
        taxonomy.push("General Content", "News", "/r/worldnews");
        taxonomy.reset_subcategory("Hobbies", "Hobbies");
        taxonomy.push("Hobbies", "Hobbies", "/r/woodworking");
        taxonomy
    }

    #[test]
    fn test_flatten_preserves_every_combination() {
        let taxonomy = sample();
        let entries = taxonomy.flatten();
        assert_eq!(entries.len(), taxonomy.len());
        assert_eq!(entries.len(), 4);

        let unique: std::collections::HashSet<_> = entries.iter().collect();
        assert_eq!(unique.len(), entries.len());
        assert_eq!(
            entries[0],
            SubredditEntry::new("General Content", "Discussion", "/r/AskReddit")
        );
        assert_eq!(
            entries[3],
            SubredditEntry::new("Hobbies", "Hobbies", "/r/woodworking")
        );
    }

    #[test]
    fn test_push_requires_existing_subcategory() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.reset_category("Gaming");
        assert!(!taxonomy.push("Gaming", "Consoles", "/r/PS5"));
        assert!(!taxonomy.has_subcategory("Gaming", "Consoles"));
        assert!(taxonomy.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join("subreddit_list.json");
        let taxonomy = sample();
        taxonomy.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"General Content\": {"));
        assert_eq!(Taxonomy::load(&path).unwrap(), taxonomy);
    }
}
