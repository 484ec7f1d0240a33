use recommender_core::{ConfigError, CoreError, CredentialPair, EnvFile};

const ENV: &str = r#"# reddit credentials
USER_AGENT="python:subreddit_recommender:v0.1 (by /u/someone)"
CLIENT_A='id_one:secret_one'
CLIENT_B="id_two:secret_two"

"REDDIT_DATA_DIR"=/tmp/reddit
"#;

#[test]
fn test_parse_strips_quotes_from_keys_and_values() {
    let env = EnvFile::parse(ENV);
    assert_eq!(env.len(), 4);
    assert_eq!(env.get("REDDIT_DATA_DIR"), Some("/tmp/reddit"));
    assert_eq!(env.get("CLIENT_A"), Some("id_one:secret_one"));
    assert_eq!(
        env.user_agent().unwrap(),
        "python:subreddit_recommender:v0.1 (by /u/someone)"
    );
}

#[test]
fn test_two_client_entries_yield_two_pairs() {
    let env = EnvFile::parse(ENV);
    let pairs = env.client_pairs().unwrap();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.contains(&CredentialPair::new("id_one", "secret_one")));
    assert!(pairs.contains(&CredentialPair::new("id_two", "secret_two")));
}

#[test]
fn test_env_var_is_case_insensitive_substring() {
    let env = EnvFile::parse(ENV);
    assert_eq!(env.env_var("user_agent"), env.get("USER_AGENT"));
    assert_eq!(env.env_var("data_dir"), Some("/tmp/reddit"));
    assert_eq!(env.env_var("SUBREDDIT_DICT_PATH"), None);
}

#[test]
fn test_comments_and_blank_lines_are_skipped() {
    let env = EnvFile::parse("# comment=ignored\n\n   \nKEY=value\nnot a pair\n");
    assert_eq!(env.len(), 1);
    assert_eq!(env.get("KEY"), Some("value"));
}

#[test]
fn test_missing_user_agent() {
    let env = EnvFile::parse("CLIENT_A=x:y\n");
    assert!(matches!(
        env.user_agent(),
        Err(ConfigError::MissingEnvironmentVariable { .. })
    ));
}

#[test]
fn test_debug_redacts_secret() {
    let pair = CredentialPair::new("id_one", "secret_one");
    let debug = format!("{:?}", pair);
    assert!(debug.contains("id_one"));
    assert!(!debug.contains("secret_one"));
}

#[test]
fn test_load_missing_file() {
    let temp = tempfile::tempdir().unwrap();
    let result = EnvFile::load(&temp.path().join(".env"));
    assert!(matches!(
        result,
        Err(CoreError::Config(ConfigError::FileNotFound { .. }))
    ));

    let path = temp.path().join(".env");
    std::fs::write(&path, ENV).unwrap();
    assert_eq!(EnvFile::load(&path).unwrap(), EnvFile::parse(ENV));
}
