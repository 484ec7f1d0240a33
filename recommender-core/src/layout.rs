//! Project directories and the on-disk subreddit tree.

use crate::{ConfigError, CoreError, Settings, SubredditEntry, Taxonomy};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

const MAX_PARENT_HOPS: usize = 5;
const TAXONOMY_FILE: &str = "subreddit_list.json";

/// Converts a subreddit name into a directory name. Some names carry
/// slashes (`/r/50/50`), so every `/r/` and then every `/` is removed.
pub fn sanitize_dirname(s: &str) -> String {
    s.replace("/r/", "").replace('/', "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSubdir {
    Raw,
    Processed,
    External,
    Interim,
}

impl DataSubdir {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSubdir::Raw => "raw",
            DataSubdir::Processed => "processed",
            DataSubdir::External => "external",
            DataSubdir::Interim => "interim",
        }
    }
}

impl FromStr for DataSubdir {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(DataSubdir::Raw),
            "processed" => Ok(DataSubdir::Processed),
            "external" => Ok(DataSubdir::External),
            "interim" => Ok(DataSubdir::Interim),
            other => Err(ConfigError::InvalidDataSubdir {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DataSubdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root of a project checkout: a directory holding both `src/` and `data/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    base: PathBuf,
}

impl ProjectLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Walks up from `start` looking for the project root.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        let mut current = Some(start);
        for _ in 0..=MAX_PARENT_HOPS {
            let Some(dir) = current else {
                break;
            };
            if dir.join("src").is_dir() && dir.join("data").is_dir() {
                debug!("Project base directory: {}", dir.display());
                return Ok(Self::new(dir));
            }
            current = dir.parent();
        }
        Err(ConfigError::BaseDirNotFound {
            start: start.display().to_string(),
            max_hops: MAX_PARENT_HOPS,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn env_file(&self) -> PathBuf {
        self.base.join(".env")
    }

    pub fn data_dir(&self, subdir: Option<DataSubdir>) -> PathBuf {
        let data = self.base.join("data");
        match subdir {
            Some(subdir) => data.join(subdir.as_str()),
            None => data,
        }
    }

    /// Path of `file_name` inside `subdir`; the subdirectory is created.
    pub fn data_dir_file(&self, file_name: &str, subdir: DataSubdir) -> Result<PathBuf, CoreError> {
        let dir = self.data_dir(Some(subdir));
        fs::create_dir_all(&dir)?;
        Ok(dir.join(file_name))
    }

    pub fn reddit_data_dir(&self, settings: &Settings) -> PathBuf {
        settings.reddit_data_dir.clone().unwrap_or_else(|| {
            self.data_dir(Some(DataSubdir::Raw))
                .join(&settings.raw_data_dirname)
        })
    }

    pub fn taxonomy_path(&self, settings: &Settings) -> PathBuf {
        settings
            .subreddit_dict_path
            .clone()
            .unwrap_or_else(|| self.data_dir(Some(DataSubdir::Processed)).join(TAXONOMY_FILE))
    }
}

/// Sanitized name usable as a single path component. Names that sanitize to
/// nothing, `.` or `..` would escape their parent and are rejected.
fn path_component(name: &str) -> Result<String, CoreError> {
    let dirname = sanitize_dirname(name);
    if dirname.is_empty() || dirname == "." || dirname == ".." {
        return Err(CoreError::InvalidInput {
            message: format!("Problematic path component {:?}", name),
        });
    }
    Ok(dirname)
}

pub fn subreddit_dir(root: &Path, entry: &SubredditEntry) -> Result<PathBuf, CoreError> {
    Ok(root
        .join(path_component(&entry.category)?)
        .join(path_component(&entry.subcategory)?)
        .join(path_component(&entry.subreddit)?))
}

fn mkdir_if_missing(path: &Path) -> Result<(), CoreError> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(CoreError::InvalidInput {
            message: format!("Problematic path {}: {}", path.display(), e),
        }),
    }
}

/// Creates `root/<category>/<subcategory>/<subreddit>` for every subreddit in
/// the taxonomy. Existing directories are left alone; with `overwrite` the
/// whole root is removed first. Entries whose names cannot be used as
/// directory names are skipped. Returns the number of subreddit directories.
pub fn create_directory_structure(
    taxonomy: &Taxonomy,
    root: &Path,
    overwrite: bool,
) -> Result<usize, CoreError> {
    if overwrite && root.exists() {
        info!("Removing existing data under {}", root.display());
        fs::remove_dir_all(root)?;
    }
    fs::create_dir_all(root)?;

    let mut created = 0;
    for entry in taxonomy.flatten() {
        let subreddit = match subreddit_dir(root, &entry) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Skipping {}: {}", entry, e);
                continue;
            }
        };
        // category, subcategory, subreddit
        let levels: Vec<&Path> = subreddit.ancestors().take(3).collect();
        for dir in levels.into_iter().rev() {
            mkdir_if_missing(dir)?;
        }
        created += 1;
    }

    info!("{} directories for subreddits created.", created);
    Ok(created)
}
