//! Common test utilities and helpers for reporule tests
#![allow(dead_code)]

use reporule::{GitHubClient, GitHubSession, RetryPolicy, SessionConfig};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RULESET_NAME: &str = "default_branch_protections";

/// Retry policy with the production budget but no sleeping between attempts
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        backoff_factor_ms: 0,
        max_backoff_ms: 0,
        ..RetryPolicy::default()
    }
}

pub fn session_config(server: &MockServer) -> SessionConfig {
    SessionConfig {
        api_url: server.uri(),
        token: Some("ghp_faketoken".to_string()),
        retry: fast_retry(),
        timeout: Some(Duration::from_secs(5)),
    }
}

pub fn test_client(server: &MockServer) -> GitHubClient {
    let session = GitHubSession::new(&session_config(server)).expect("Failed to build session");
    GitHubClient::new(session)
}

/// Repository JSON the way the REST API returns it
pub fn repo_json(id: u64, owner: &str, name: &str, archived: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "archived": archived,
        "fork": false,
        "visibility": "public",
        "created_at": "2023-03-17T13:40:10Z",
        "html_url": format!("https://github.com/{}/{}", owner, name),
    })
}

/// The starfleet fleet: four active repositories and one archived
pub fn starfleet_repos() -> Value {
    json!([
        repo_json(1, "starfleet", "enterprise", false),
        repo_json(2, "starfleet", "voyager", false),
        repo_json(3, "starfleet", "cerritos", false),
        repo_json(4, "starfleet", "excelsior", false),
        repo_json(5, "starfleet", "titan", true),
    ])
}

/// Answer `/orgs/{org}` so the account classifies as an organization
pub async fn mount_org(server: &MockServer, org: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/orgs/{}", org)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": org, "id": 1})))
        .mount(server)
        .await;
}

/// Answer `/users/{user}` only, so the account classifies as a user
pub async fn mount_user(server: &MockServer, user: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{}", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": user, "id": 2})))
        .mount(server)
        .await;
}

pub async fn mount_org_repos(server: &MockServer, org: &str, repos: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/orgs/{}/repos", org)))
        .respond_with(ResponseTemplate::new(200).set_body_json(repos))
        .mount(server)
        .await;
}

/// Existing rulesets of one repository
pub async fn mount_rulesets(server: &MockServer, full_name: &str, names: &[&str]) {
    let body: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"id": i + 1, "name": name, "target": "branch", "enforcement": "active"}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/rulesets", full_name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Data directory holding a ruleset definition and an exception list
pub struct TestData {
    pub temp_dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Data directory with the default ruleset and the given exceptions
    pub fn with_exceptions(exceptions_yaml: &str) -> Self {
        let data = Self::new();
        data.write_ruleset(RULESET_NAME);
        data.write_exceptions(exceptions_yaml);
        data
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_ruleset(&self, name: &str) -> PathBuf {
        let ruleset = json!({
            "name": name,
            "target": "branch",
            "enforcement": "active",
            "conditions": {"ref_name": {"include": ["~DEFAULT_BRANCH"], "exclude": []}},
            "rules": [{"type": "deletion"}, {"type": "non_fast_forward"}],
        });
        let file = self.path().join(format!("{}.json", name));
        std::fs::write(&file, ruleset.to_string()).expect("Failed to write ruleset");
        file
    }

    pub fn write_exceptions(&self, content: &str) -> PathBuf {
        let file = self.path().join("repos_exception.yml");
        std::fs::write(&file, content).expect("Failed to write exception list");
        file
    }

    /// Config file pointing the CLI at a mock server
    pub fn write_config(&self, api_url: &str) -> PathBuf {
        let content = format!(
            r#"
data_dir: "{}"
github:
  api_url: "{}"
  token_env: "REPORULE_TEST_TOKEN"
http:
  timeout_secs: 5
  retry:
    max_retries: 1
    backoff_factor_ms: 0
logging:
  level: "warn"
  format: "pretty"
"#,
            self.path().display(),
            api_url
        );
        let file = self.path().join("config.yml");
        std::fs::write(&file, content).expect("Failed to write test config");
        file
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
