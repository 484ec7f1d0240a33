use recommender_core::{
    create_directory_structure, sanitize_dirname, subreddit_dir, ConfigError, CoreError,
    DataSubdir, EnvFile, ProjectLayout, Settings, SubredditEntry, Taxonomy,
};
use std::fs;
use std::path::Path;

fn taxonomy() -> Taxonomy {
    let mut taxonomy = Taxonomy::new();
    taxonomy.reset_subcategory("General Content", "Discussion");
    taxonomy.push("General Content", "Discussion", "/r/AskReddit");
    taxonomy.push("General Content", "Discussion", "/r/50/50");
    taxonomy.reset_subcategory("Defunct", "Defunct");
    taxonomy.push("Defunct", "Defunct", "/r/reddit.com");
    taxonomy
}

fn count_dirs(root: &Path) -> usize {
    let mut count = 0;
    for entry in fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            count += 1 + count_dirs(&path);
        }
    }
    count
}

#[test]
fn test_sanitize_dirname() {
    assert_eq!(sanitize_dirname("/r/AskReddit"), "AskReddit");
    assert_eq!(sanitize_dirname("/r/50/50"), "5050");
    assert_eq!(sanitize_dirname("General Content"), "General Content");

    for name in ["/r/AskReddit", "/r/50/50", "/r//r/x", "a/b/c"] {
        let once = sanitize_dirname(name);
        assert_eq!(sanitize_dirname(&once), once);
        assert!(!once.contains('/'));
    }
}

#[test]
fn test_subreddit_dir_sanitizes_every_level() {
    let entry = SubredditEntry::new("Hobbies/Crafts", "Knitting", "/r/50/50");
    let dir = subreddit_dir(Path::new("/data"), &entry).unwrap();
    assert_eq!(dir, Path::new("/data/HobbiesCrafts/Knitting/5050"));
}

#[test]
fn test_subreddit_dir_rejects_escaping_names() {
    let root = Path::new("/data");
    for name in ["/r/..", "..", "/r/.", "/r/", ""] {
        let entry = SubredditEntry::new("Category", "Sub", name);
        assert!(
            matches!(subreddit_dir(root, &entry), Err(CoreError::InvalidInput { .. })),
            "{name:?} should be rejected"
        );
    }
    let entry = SubredditEntry::new("..", "Sub", "/r/rust");
    assert!(subreddit_dir(root, &entry).is_err());
}

#[test]
fn test_directory_structure_skips_escaping_names() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("reddit_raw");
    let mut taxonomy = Taxonomy::new();
    taxonomy.reset_subcategory("Cat", "Sub");
    taxonomy.push("Cat", "Sub", "/r/..");
    taxonomy.push("Cat", "Sub", "/r/rust");

    let created = create_directory_structure(&taxonomy, &root, false).unwrap();
    assert_eq!(created, 1);
    // Cat, Cat/Sub, Cat/Sub/rust
    assert_eq!(count_dirs(&root), 3);
}

#[test]
fn test_directory_structure_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("reddit_raw");
    let taxonomy = taxonomy();

    let created = create_directory_structure(&taxonomy, &root, false).unwrap();
    assert_eq!(created, 3);
    let first = count_dirs(&root);
    // 2 categories + 2 subcategories + 3 subreddits
    assert_eq!(first, 7);
    assert!(root.join("General Content/Discussion/5050").is_dir());

    let again = create_directory_structure(&taxonomy, &root, false).unwrap();
    assert_eq!(again, 3);
    assert_eq!(count_dirs(&root), first);
}

#[test]
fn test_directory_structure_overwrite_clears_files() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("reddit_raw");
    let taxonomy = taxonomy();

    create_directory_structure(&taxonomy, &root, false).unwrap();
    let stale = root.join("General Content/Discussion/AskReddit/description");
    fs::write(&stale, "old").unwrap();

    create_directory_structure(&taxonomy, &root, false).unwrap();
    assert!(stale.exists());

    create_directory_structure(&taxonomy, &root, true).unwrap();
    assert!(!stale.exists());
    assert!(stale.parent().unwrap().is_dir());
}

#[test]
fn test_discover_walks_up_to_project_root() {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp.path().join("src/data_tools/nested")).unwrap();
    fs::create_dir_all(temp.path().join("data")).unwrap();

    let layout = ProjectLayout::discover(&temp.path().join("src/data_tools/nested")).unwrap();
    assert_eq!(layout.base_dir(), temp.path());
    assert_eq!(
        layout.data_dir(Some(DataSubdir::Processed)),
        temp.path().join("data/processed")
    );
}

#[test]
fn test_discover_gives_up() {
    let temp = tempfile::tempdir().unwrap();
    let result = ProjectLayout::discover(temp.path());
    assert!(matches!(result, Err(ConfigError::BaseDirNotFound { .. })));
}

#[test]
fn test_data_dir_file_creates_subdir() {
    let temp = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(temp.path());
    let path = layout
        .data_dir_file("pretty_subreddits.html", DataSubdir::Processed)
        .unwrap();
    assert!(temp.path().join("data/processed").is_dir());
    assert_eq!(path, temp.path().join("data/processed/pretty_subreddits.html"));

    assert!("raw".parse::<DataSubdir>().is_ok());
    assert!("cache".parse::<DataSubdir>().is_err());
}

#[test]
fn test_settings_paths_and_env_overrides() {
    let layout = ProjectLayout::new("/project");
    let settings = Settings::default();
    assert_eq!(
        layout.reddit_data_dir(&settings),
        Path::new("/project/data/raw/reddit_raw")
    );
    assert_eq!(
        layout.taxonomy_path(&settings),
        Path::new("/project/data/processed/subreddit_list.json")
    );

    let env = EnvFile::parse("REDDIT_DATA_DIR=/scratch/raw\nSUBREDDIT_DICT_PATH='/scratch/list.json'\n");
    let settings = Settings::default().apply_env(&env);
    assert_eq!(layout.reddit_data_dir(&settings), Path::new("/scratch/raw"));
    assert_eq!(layout.taxonomy_path(&settings), Path::new("/scratch/list.json"));
}
