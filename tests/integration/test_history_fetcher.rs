use serde_json::json;
use shiplog::core::config::GithubConfig;
use shiplog::core::github::GithubClient;
use shiplog::core::repo::RepoRef;
use shiplog::core::types::ErrorCategory;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GithubClient {
    let config = GithubConfig {
        api_url: server.uri(),
        token: None,
        commit_page_size: 20,
    };
    GithubClient::new(&config).unwrap()
}

fn repo() -> RepoRef {
    RepoRef {
        owner: "octocat".to_string(),
        name: "Hello-World".to_string(),
    }
}

fn commit_json(sha: &str, message: &str, date: &str) -> serde_json::Value {
    json!({
        "sha": sha,
        "commit": {
            "message": message,
            "author": { "name": "octocat", "date": date }
        }
    })
}

#[tokio::test]
async fn since_equals_release_publish_time_when_release_exists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v1.2.0",
            "published_at": "2024-03-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .and(query_param("per_page", "20"))
        .and(query_param("since", "2024-03-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            commit_json("c3c3c3c3c3", "feat: three", "2024-03-05T00:00:00Z"),
            commit_json("c2c2c2c2c2", "fix: two", "2024-03-04T00:00:00Z"),
            commit_json("c1c1c1c1c1", "chore: one", "2024-03-03T00:00:00Z"),
        ])))
        .mount(&server)
        .await;

    let history = client_for(&server).fetch_history(&repo()).await.unwrap();

    assert_eq!(
        history.since,
        Some("2024-03-01T00:00:00Z".parse().unwrap())
    );
    assert_eq!(history.commits.len(), 3);
    // Newest-first order is preserved exactly as the API returned it.
    assert_eq!(history.commits[0].message, "feat: three");
    assert_eq!(history.commits[2].message, "chore: one");
    assert_eq!(history.commits[0].id, "c3c3c3c");
}

#[tokio::test]
async fn since_falls_back_to_oldest_commit_without_release() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .and(query_param("per_page", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            commit_json("bbbbbbbbbb", "fix: newer", "2024-02-20T12:00:00Z"),
            commit_json("aaaaaaaaaa", "feat: older", "2024-02-10T08:30:00Z"),
        ])))
        .mount(&server)
        .await;

    let history = client_for(&server).fetch_history(&repo()).await.unwrap();

    assert_eq!(
        history.since,
        Some("2024-02-10T08:30:00Z".parse().unwrap())
    );
    assert_eq!(history.commits.len(), 2);
}

#[tokio::test]
async fn since_is_absent_with_no_release_and_no_commits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let history = client_for(&server).fetch_history(&repo()).await.unwrap();

    assert!(history.since.is_none());
    assert!(history.commits.is_empty());
}

#[tokio::test]
async fn non_404_release_failure_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "API rate limit exceeded"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_history(&repo()).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::UpstreamError);
    assert!(err.to_string().contains("release lookup"));
}

#[tokio::test]
async fn commit_listing_failure_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_history(&repo()).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::UpstreamError);
    assert!(err.to_string().contains("commit listing"));
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .and(wiremock::matchers::header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .and(wiremock::matchers::header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = GithubConfig {
        api_url: server.uri(),
        token: Some("ghp_test".to_string()),
        commit_page_size: 20,
    };
    let client = GithubClient::new(&config).unwrap();
    let history = client.fetch_history(&repo()).await.unwrap();
    assert!(history.commits.is_empty());
}
