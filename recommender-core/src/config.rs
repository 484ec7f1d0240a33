//! `.env` credentials and harvest settings.
//!
//! The `.env` file is a flat list of `KEY=value` lines. Quotes and newlines
//! are stripped from both sides; `#` lines are comments. Credentials are read
//! from every key starting with `CLIENT` in the form `client_id:client_secret`.

use crate::{ConfigError, CoreError, CredentialPair};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const UNWANTED_CHARS: [char; 3] = ['\n', '"', '\''];

/// Trims the string and removes every newline and quote character.
pub fn strip_unwanted_chars(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !UNWANTED_CHARS.contains(c))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: Vec<(String, String)>,
}

impl EnvFile {
    pub fn parse(text: &str) -> Self {
        let mut env = Self::default();
        for line in text.lines() {
            if line.starts_with('#') {
                continue;
            }
            let line = strip_unwanted_chars(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            env.insert(strip_unwanted_chars(key), strip_unwanted_chars(value));
        }
        env
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let text = fs::read_to_string(path)?;
        let env = Self::parse(&text);
        debug!("Loaded {} variables from {}", env.len(), path.display());
        Ok(env)
    }

    fn insert(&mut self, key: String, value: String) {
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup: the first key containing `name` wins.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        let needle = name.to_lowercase();
        self.vars
            .iter()
            .find(|(k, _)| k.to_lowercase().contains(&needle))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn user_agent(&self) -> Result<String, ConfigError> {
        self.env_var("USER_AGENT")
            .filter(|ua| !ua.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: "USER_AGENT".to_string(),
            })
    }

    /// Credential pairs in file order.
    pub fn client_pairs(&self) -> Result<Vec<CredentialPair>, ConfigError> {
        let mut pairs = Vec::new();
        let single_id = self.get("CLIENT_ID");
        let single_secret = self.get("CLIENT_SECRET");
        let single_form = single_id.is_some_and(|v| !v.contains(':'))
            && single_secret.is_some_and(|v| !v.contains(':'));

        for (key, value) in &self.vars {
            if !key.starts_with("CLIENT") {
                continue;
            }
            if single_form && (key == "CLIENT_ID" || key == "CLIENT_SECRET") {
                if key == "CLIENT_ID" {
                    pairs.push(CredentialPair::new(
                        value.as_str(),
                        single_secret.unwrap_or_default(),
                    ));
                }
                continue;
            }
            match value.split_once(':') {
                Some((id, secret)) if !id.is_empty() && !secret.is_empty() => {
                    pairs.push(CredentialPair::new(id, secret));
                }
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: key.clone(),
                        value: "expected client_id:client_secret".to_string(),
                    })
                }
            }
        }

        if pairs.is_empty() {
            warn!("No CLIENT credentials found in .env");
        }
        Ok(pairs)
    }
}

/// Tuning for the taxonomy and harvest steps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub top_n_submissions: usize,
    pub comment_depth: usize,
    pub max_comments: usize,
    pub more_comments_limit: usize,
    pub more_comments_threshold: u64,
    pub workers: Option<usize>,
    pub fetch_wiki: bool,
    pub skip_categories: Vec<String>,
    pub raw_data_dirname: String,
    pub reddit_data_dir: Option<PathBuf>,
    pub subreddit_dict_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_n_submissions: 10,
            comment_depth: 4,
            max_comments: 100,
            more_comments_limit: 3,
            more_comments_threshold: 1,
            workers: None,
            fetch_wiki: false,
            skip_categories: vec!["Defunct".to_string()],
            raw_data_dirname: "reddit_raw".to_string(),
            reddit_data_dir: None,
            subreddit_dict_path: None,
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        Ok(settings)
    }

    /// Reads the TOML file when given, otherwise starts from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let settings = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                Self::from_toml_str(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// `.env` entries named `REDDIT_DATA_DIR` or `SUBREDDIT_DICT_PATH`
    /// take precedence over the settings file.
    pub fn apply_env(mut self, env: &EnvFile) -> Self {
        if let Some(dir) = env.env_var("REDDIT_DATA_DIR").filter(|v| !v.is_empty()) {
            self.reddit_data_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = env.env_var("SUBREDDIT_DICT_PATH").filter(|v| !v.is_empty()) {
            self.subreddit_dict_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n_submissions == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "top_n_submissions must be at least 1".to_string(),
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::ValidationFailed {
                reason: "workers must be at least 1".to_string(),
            });
        }
        if self.raw_data_dirname.is_empty() {
            return Err(ConfigError::MissingField {
                field: "raw_data_dirname".to_string(),
            });
        }
        Ok(())
    }
}
