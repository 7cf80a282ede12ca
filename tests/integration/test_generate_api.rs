use serde_json::json;
use shiplog::core::app::AppContext;
use shiplog::core::config::ShiplogConfig;
use shiplog::server::{serve_with_ready_notifier, GENERATION_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    base_url: String,
    github: MockServer,
    platform: MockServer,
    completion: MockServer,
}

async fn start_harness() -> Harness {
    let github = MockServer::start().await;
    let platform = MockServer::start().await;
    let completion = MockServer::start().await;

    let mut config = ShiplogConfig::default();
    config.github.api_url = github.uri();
    config.completion.api_url = completion.uri();
    config.platform.api_url = Some(platform.uri());
    config.server.bind = "127.0.0.1:0".to_string();

    let ctx = Arc::new(AppContext::from_config(config).unwrap());
    let (tx, rx) = oneshot::channel::<SocketAddr>();
    tokio::spawn(async move {
        serve_with_ready_notifier(ctx, tx).await.unwrap();
    });
    let addr = rx.await.unwrap();

    Harness {
        base_url: format!("http://{}", addr),
        github,
        platform,
        completion,
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

async fn mount_happy_path(harness: &Harness) {
    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v1.0.0",
            "published_at": "2024-03-01T00:00:00Z"
        })))
        .mount(&harness.github)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .and(query_param("since", "2024-03-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            commit_json("c3c3c3c3c3", "feat: webhook support", "2024-03-05T00:00:00Z"),
            commit_json("c2c2c2c2c2", "fix: stream shutdown race", "2024-03-04T00:00:00Z"),
            commit_json("c1c1c1c1c1", "chore: bump deps", "2024-03-03T00:00:00Z"),
        ])))
        .mount(&harness.github)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/templates"))
        .and(query_param("project", "changelog-generator"))
        .and(query_param("slug", "generate-changelog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "generate-changelog",
            "version": "3",
            "model": "gpt-4o",
            "temperature": 0.2,
            "messages": [{
                "role": "user",
                "content": "Summarize the following commits from {{url}} since {{since}} in changelog form.\n\n{{commits}}"
            }]
        })))
        .mount(&harness.platform)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/project_logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"inserted": 1})))
        .mount(&harness.platform)
        .await;

    let sse_body = concat!(
        "data: {\"id\":\"cmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"id\":\"cmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"## ✨ New Features\\n\"}}]}\n\n",
        "data: {\"id\":\"cmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"- webhook support\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&harness.completion)
        .await;
}

#[tokio::test]
async fn generate_streams_changelog_with_correlation_header() {
    let harness = start_harness().await;
    mount_happy_path(&harness).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "url": "https://github.com/octocat/Hello-World" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let generation_id = response
        .headers()
        .get(GENERATION_ID_HEADER)
        .expect("correlation id header must be present before the stream ends")
        .to_str()
        .unwrap()
        .to_string();
    assert!(!generation_id.is_empty());

    let body = response.text().await.unwrap();
    assert_eq!(body, "## ✨ New Features\n- webhook support");

    // The prompt sent upstream carries the release boundary and all three
    // commit messages, newest first.
    let requests = harness.completion.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["model"], "gpt-4o");
    assert_eq!(sent["stream"], true);
    let content = sent["messages"][0]["content"].as_str().unwrap();
    assert!(content.contains("https://github.com/octocat/Hello-World"));
    assert!(content.contains("since 2024-03-01T00:00:00Z"));
    let first = content.find("feat: webhook support").unwrap();
    let second = content.find("fix: stream shutdown race").unwrap();
    let third = content.find("chore: bump deps").unwrap();
    assert!(first < second && second < third);

    // The generation event is logged fire-and-forget, keyed by the header id.
    let mut logged = false;
    for _ in 0..50 {
        let requests = harness.platform.received_requests().await.unwrap();
        if requests.iter().any(|request| {
            request.url.path() == "/v1/project_logs"
                && String::from_utf8_lossy(&request.body).contains(&generation_id)
        }) {
            logged = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(logged, "generation event should be recorded with the correlation id");
}

#[tokio::test]
async fn accepts_url_under_prompt_field() {
    let harness = start_harness().await;
    mount_happy_path(&harness).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "prompt": "https://github.com/octocat/Hello-World" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("webhook support"));
}

#[tokio::test]
async fn malformed_repository_url_is_rejected_before_upstream_calls() {
    let harness = start_harness().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "url": "https://example.com/not/github" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "An error occurred while generating the changelog");
    assert!(body["details"].as_str().unwrap().contains("github.com"));

    assert!(harness.github.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_url_field_is_rejected() {
    let harness = start_harness().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "something": "else" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["details"], "No URL provided in request");
}

#[tokio::test]
async fn upstream_failure_returns_structured_error() {
    let harness = start_harness().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "API rate limit exceeded"
        })))
        .mount(&harness.github)
        .await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "url": "https://github.com/octocat/Hello-World" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "An error occurred while generating the changelog");
    assert!(body["details"].as_str().unwrap().contains("release lookup"));
}

#[tokio::test]
async fn completion_failure_before_first_chunk_is_an_error_not_a_stream() {
    let harness = start_harness().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            commit_json("aaaaaaaaaa", "feat: only", "2024-02-10T08:30:00Z"),
        ])))
        .mount(&harness.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "generate-changelog",
            "messages": [{"role": "user", "content": "{{commits}}"}]
        })))
        .mount(&harness.platform)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "overloaded"}
        })))
        .mount(&harness.completion)
        .await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "url": "https://github.com/octocat/Hello-World" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["details"].as_str().unwrap().contains("429"));
}

#[tokio::test]
async fn missing_template_is_a_fatal_configuration_error() {
    let harness = start_harness().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/releases/latest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.github)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/templates"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.platform)
        .await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/generate", harness.base_url))
        .json(&json!({ "url": "https://github.com/octocat/Hello-World" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["details"].as_str().unwrap().contains("not found"));
}
