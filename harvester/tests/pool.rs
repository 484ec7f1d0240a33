use harvester::{run_pool, AuthOutcome, HarvestOptions};
use recommender_core::{CoreError, CredentialPair, SubredditEntry};
use reddit_client::RedditEndpoints;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoints(server: &MockServer) -> RedditEndpoints {
    RedditEndpoints {
        auth_base: server.uri(),
        api_base: server.uri(),
    }
}

fn credentials(n: usize) -> Vec<CredentialPair> {
    (0..n)
        .map(|i| CredentialPair::new(format!("id{i}"), format!("secret{i}")))
        .collect()
}

fn entries() -> Vec<SubredditEntry> {
    vec![
        SubredditEntry::new("General Content", "General", "/r/AskReddit"),
        SubredditEntry::new("Programming", "Languages", "/r/rust"),
        SubredditEntry::new("Defunct", "Retired", "/r/oldsub"),
    ]
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "harvest-token",
            "token_type": "bearer",
            "expires_in": 86400,
            "scope": "*"
        })))
        .mount(server)
        .await;
}

async fn mount_reddit(server: &MockServer) {
    mount_token(server).await;

    Mock::given(method("GET"))
        .and(path("/r/AskReddit/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "t5",
            "data": { "display_name": "AskReddit", "description": "Ask ☕ anything" }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/AskReddit/top"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {
                "children": [
                    { "kind": "t3", "data": { "id": "p1", "name": "t3_p1", "title": "Why?" } }
                ],
                "after": null, "before": null, "dist": 1
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comments/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "kind": "Listing", "data": { "children": [], "after": null, "before": null } },
            { "kind": "Listing", "data": { "children": [
                { "kind": "t1", "data": {
                    "id": "c1", "name": "t1_c1", "parent_id": "t3_p1", "body": "Because.",
                    "replies": { "kind": "Listing", "data": { "children": [
                        { "kind": "t1", "data": {
                            "id": "c2", "name": "t1_c2", "parent_id": "t1_c1",
                            "body": "Naïve answer", "replies": ""
                        } }
                    ], "after": null, "before": null } }
                } }
            ], "after": null, "before": null } }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/about"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/rust/top"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn options() -> HarvestOptions {
    HarvestOptions {
        top_n_submissions: 2,
        ..HarvestOptions::default()
    }
}

#[tokio::test]
async fn test_pool_writes_subreddit_files() {
    let server = MockServer::start().await;
    mount_reddit(&server).await;
    let root = TempDir::new().unwrap();

    let reports = run_pool(
        entries(),
        &credentials(2),
        "harvester-test/0.1",
        &options(),
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 2);
    let first = &reports[0];
    assert_eq!(first.worker_id, 0);
    assert_eq!(first.auth, AuthOutcome::Authenticated);
    assert_eq!((first.attempted, first.completed, first.skipped), (1, 1, 1));
    assert_eq!(first.submissions_written, 1);

    let second = &reports[1];
    assert_eq!((second.attempted, second.completed, second.failed), (1, 0, 1));

    let ask = root.path().join("General Content/General/AskReddit");
    assert_eq!(
        fs::read_to_string(ask.join("description")).unwrap(),
        "Ask  anything"
    );
    assert_eq!(
        fs::read_to_string(ask.join("sub_0")).unwrap(),
        "Why?\nBecause.\nNave answer"
    );
    assert!(!ask.join("wiki").exists());

    // description falls back to empty, the failed listing leaves no submissions
    let rust = root.path().join("Programming/Languages/rust");
    assert_eq!(fs::read_to_string(rust.join("description")).unwrap(), "");
    assert!(!rust.join("sub_0").exists());

    assert!(!root.path().join("Defunct").exists());
}

#[tokio::test]
async fn test_pool_size_is_capped_by_workers_option() {
    let server = MockServer::start().await;
    mount_reddit(&server).await;
    let root = TempDir::new().unwrap();

    let options = HarvestOptions {
        workers: Some(1),
        ..options()
    };
    let reports = run_pool(
        entries(),
        &credentials(3),
        "harvester-test/0.1",
        &options,
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].attempted, 2);
    assert_eq!(reports[0].skipped, 1);
}

#[tokio::test]
async fn test_empty_shards_are_not_started() {
    let server = MockServer::start().await;
    mount_reddit(&server).await;
    let root = TempDir::new().unwrap();

    let reports = run_pool(
        entries().into_iter().take(1).collect(),
        &credentials(4),
        "harvester-test/0.1",
        &options(),
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_success());
}

#[tokio::test]
async fn test_failed_authentication_fails_the_shard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })))
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();

    let reports = run_pool(
        entries(),
        &credentials(1),
        "harvester-test/0.1",
        &options(),
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].failed, 3);
    assert!(matches!(reports[0].auth, AuthOutcome::Failed { .. }));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_no_credentials_is_an_error() {
    let root = TempDir::new().unwrap();
    let result = run_pool(
        entries(),
        &[],
        "harvester-test/0.1",
        &options(),
        root.path(),
        &RedditEndpoints::default(),
    )
    .await;

    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[tokio::test]
async fn test_wiki_is_written_when_enabled() {
    let server = MockServer::start().await;
    mount_reddit(&server).await;
    Mock::given(method("GET"))
        .and(path("/r/AskReddit/wiki/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "wikipagelisting", "data": ["index"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/AskReddit/wiki/index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "wikipage", "data": { "content_md": "Rules: be nice" }
        })))
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();

    let options = HarvestOptions {
        fetch_wiki: true,
        ..options()
    };
    run_pool(
        entries().into_iter().take(1).collect(),
        &credentials(1),
        "harvester-test/0.1",
        &options,
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    let ask = root.path().join("General Content/General/AskReddit");
    assert_eq!(fs::read_to_string(ask.join("wiki")).unwrap(), "Rules: be nice");
}

async fn mount_subreddit(server: &MockServer, name: &str, post: &str, about: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{name}/about")))
        .respond_with(about)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/r/{name}/top")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {
                "children": [
                    { "kind": "t3", "data": { "id": post, "name": format!("t3_{post}"), "title": name } }
                ],
                "after": null, "before": null, "dist": 1
            }
        })))
        .mount(server)
        .await;
}

fn about(name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "kind": "t5",
        "data": { "display_name": name, "description": format!("about {name}") }
    }))
}

fn empty_thread() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([
        { "kind": "Listing", "data": { "children": [], "after": null, "before": null } },
        { "kind": "Listing", "data": { "children": [], "after": null, "before": null } }
    ]))
}

fn pair() -> Vec<SubredditEntry> {
    vec![
        SubredditEntry::new("C", "S", "/r/a"),
        SubredditEntry::new("C", "S", "/r/b"),
    ]
}

#[tokio::test]
async fn test_comment_failure_only_fails_its_subreddit() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_subreddit(&server, "a", "pa", about("a")).await;
    mount_subreddit(&server, "b", "pb", about("b")).await;
    Mock::given(method("GET"))
        .and(path("/comments/pa"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comments/pb"))
        .respond_with(empty_thread())
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();

    let reports = run_pool(
        pair(),
        &credentials(1),
        "harvester-test/0.1",
        &options(),
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.auth, AuthOutcome::Authenticated);
    assert_eq!((report.attempted, report.completed, report.failed), (2, 1, 1));
    assert_eq!(report.submissions_written, 1);

    let dir = root.path().join("C/S");
    assert!(!dir.join("a/sub_0").exists());
    assert_eq!(fs::read_to_string(dir.join("b/sub_0")).unwrap(), "b");
}

#[tokio::test]
async fn test_unusable_rate_limit_reset_does_not_stop_the_worker() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let exhausted = about("a")
        .insert_header("x-ratelimit-remaining", "0")
        .insert_header("x-ratelimit-reset", "inf");
    mount_subreddit(&server, "a", "pa", exhausted).await;
    mount_subreddit(&server, "b", "pb", about("b")).await;
    Mock::given(method("GET"))
        .and(path("/comments/pa"))
        .respond_with(empty_thread())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comments/pb"))
        .respond_with(empty_thread())
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();

    let reports = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        run_pool(
            pair(),
            &credentials(1),
            "harvester-test/0.1",
            &options(),
            root.path(),
            &endpoints(&server),
        ),
    )
    .await
    .expect("harvest should not stall")
    .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].auth, AuthOutcome::Authenticated);
    assert_eq!((reports[0].completed, reports[0].failed), (2, 0));
    assert_eq!(
        fs::read_to_string(root.path().join("C/S/b/description")).unwrap(),
        "about b"
    );
}

#[tokio::test]
async fn test_escaping_subreddit_name_is_counted_failed() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let root = TempDir::new().unwrap();

    let reports = run_pool(
        vec![SubredditEntry::new("C", "S", "/r/..")],
        &credentials(1),
        "harvester-test/0.1",
        &options(),
        root.path(),
        &endpoints(&server),
    )
    .await
    .unwrap();

    assert_eq!((reports[0].attempted, reports[0].failed), (1, 1));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}
