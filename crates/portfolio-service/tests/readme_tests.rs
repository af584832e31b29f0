//! README retrieval integration tests.
//!
//! Uses a mocked GitHub API to exercise the client, the highlighter pipeline
//! and the `/v1/readme` endpoint.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use portfolio_service::highlight::Highlighter;
use portfolio_service::services::{render_readme, GitHubClient};
use portfolio_test_utils::TestPortfolioServer;
use secrecy::SecretString;
use std::collections::HashMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const README_HTML: &str = r#"<div id="readme"><h1>dcln</h1><pre><code class="language-rust">fn main() {}</code></pre></div>"#;

fn client_for(server: &MockServer, token: Option<&str>) -> GitHubClient {
    GitHubClient::new(
        server.uri(),
        "dcln-portfolio".to_string(),
        token.map(|t| SecretString::from(t.to_string())),
    )
    .unwrap()
}

async fn mock_readme(server: &MockServer, owner_repo: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{owner_repo}/readme")))
        .and(header("accept", "application/vnd.github.html"))
        .and(header("user-agent", "dcln-portfolio"))
        .respond_with(ResponseTemplate::new(200).set_body_string(README_HTML))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_plain_and_git_urls_hit_same_api_path() -> Result<()> {
    let github = MockServer::start().await;
    mock_readme(&github, "beelzer/dcln", 2).await;
    let client = client_for(&github, None);

    let plain = client.fetch_readme_html("https://github.com/beelzer/dcln").await;
    let dot_git = client
        .fetch_readme_html("https://github.com/beelzer/dcln.git")
        .await;

    assert_eq!(plain.as_deref(), Some(README_HTML));
    assert_eq!(plain, dot_git);
    Ok(())
}

#[tokio::test]
async fn test_token_is_sent_as_bearer() -> Result<()> {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/readme"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .expect(1)
        .mount(&github)
        .await;

    let client = client_for(&github, Some("ghp_test"));

    assert_eq!(
        client.fetch_readme_html("https://github.com/o/r").await.as_deref(),
        Some("<p>ok</p>")
    );
    Ok(())
}

#[tokio::test]
async fn test_not_found_is_none() -> Result<()> {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
        .mount(&github)
        .await;

    let client = client_for(&github, None);

    assert!(client
        .fetch_readme_html("https://github.com/o/no-readme")
        .await
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_network_failure_is_none() -> Result<()> {
    let client = GitHubClient::new(
        "http://127.0.0.1:1".to_string(),
        "dcln-portfolio".to_string(),
        None,
    )
    .unwrap();

    assert!(client.fetch_readme_html("https://github.com/o/r").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_non_github_and_empty_urls_make_no_request() -> Result<()> {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&github)
        .await;
    let client = client_for(&github, None);

    assert!(client.fetch_readme_html("").await.is_none());
    assert!(client
        .fetch_readme_html("https://gitlab.com/o/r")
        .await
        .is_none());
    assert!(client.fetch_readme_html("https://github.com/o").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_render_readme_highlights_code_blocks() -> Result<()> {
    let github = MockServer::start().await;
    mock_readme(&github, "beelzer/dcln", 1).await;
    let client = client_for(&github, None);
    let highlighter = Highlighter::new()?;

    let html = render_readme(&client, &highlighter, "https://github.com/beelzer/dcln")
        .await
        .unwrap();

    assert!(html.contains("<h1>dcln</h1>"));
    assert!(html.contains(r#"class="syntax-highlight""#));
    assert!(html.contains(r#"data-lang="rust""#));
    assert!(!html.contains("background-color"));
    Ok(())
}

#[tokio::test]
async fn test_readme_endpoint() -> Result<()> {
    let github = MockServer::start().await;
    mock_readme(&github, "beelzer/dcln", 1).await;

    let server = TestPortfolioServer::spawn(HashMap::from([(
        "GITHUB_API_URL".to_string(),
        github.uri(),
    )]))
    .await?;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/v1/readme", server.url()))
        .query(&[("repo", "https://github.com/beelzer/dcln")])
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert!(content_type.is_some_and(|ct| ct.starts_with("text/html")));
    assert!(response.text().await?.contains("syntax-highlight"));
    Ok(())
}

#[tokio::test]
async fn test_readme_endpoint_missing_readme_is_404() -> Result<()> {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&github)
        .await;

    let server = TestPortfolioServer::spawn(HashMap::from([(
        "GITHUB_API_URL".to_string(),
        github.uri(),
    )]))
    .await?;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/v1/readme", server.url()))
        .query(&[("repo", "https://github.com/o/r")])
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await?, "README not found");
    Ok(())
}
