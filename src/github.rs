use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::apply::RulesetWriter;
use crate::eligibility::RulesetLookup;
use crate::error::{RepoRuleError, Result};
use crate::pagination::{Pages, DEFAULT_MAX_PAGES};
use crate::ruleset::RulesetDefinition;
use crate::session::{decode_json, ensure_success, GitHubSession};

/// GitHub repository as returned by the REST API
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// What kind of GitHub account a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Organization,
    User,
}

impl AccountKind {
    /// Endpoint listing every repository of the account
    fn repos_path(self, account: &str) -> String {
        match self {
            AccountKind::Organization => format!("/orgs/{}/repos?per_page=100", account),
            AccountKind::User => format!("/users/{}/repos?per_page=100", account),
        }
    }
}

/// Ruleset summary from `GET /repos/{owner}/{repo}/rulesets`
#[derive(Debug, Clone, Deserialize)]
pub struct RulesetSummary {
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub enforcement: Option<String>,
}

/// GitHub REST client for repository listings and rulesets
#[derive(Debug, Clone)]
pub struct GitHubClient {
    session: GitHubSession,
    max_pages: usize,
}

impl GitHubClient {
    pub fn new(session: GitHubSession) -> Self {
        Self {
            session,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Cap on pages fetched from any single list endpoint
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Determine whether `account` is an organization or a user.
    ///
    /// Organizations are probed first. `None` means neither lookup succeeded.
    pub async fn classify(&self, account: &str) -> Result<Option<AccountKind>> {
        let org_url = self.session.url(&format!("/orgs/{}", account));
        if self.session.get(&org_url).await?.status().is_success() {
            debug!(account, "GitHub organization found");
            return Ok(Some(AccountKind::Organization));
        }

        let user_url = self.session.url(&format!("/users/{}", account));
        if self.session.get(&user_url).await?.status().is_success() {
            debug!(account, "GitHub user found");
            return Ok(Some(AccountKind::User));
        }

        debug!(account, "No GitHub organization or user found");
        Ok(None)
    }

    /// List every repository of `account`, or only `repo_name` when given
    pub async fn list_repositories(
        &self,
        account: &str,
        repo_name: Option<&str>,
    ) -> Result<Vec<Repository>> {
        let kind = self
            .classify(account)
            .await?
            .ok_or_else(|| RepoRuleError::NotFound(account.to_string()))?;

        if let Some(repo_name) = repo_name {
            let repo = self.get_repository(account, repo_name).await?;
            return Ok(vec![repo]);
        }

        debug!(account, ?kind, "Fetching repositories");
        let repositories = self.repositories(kind, account).collect_all().await?;

        info!(
            account,
            count = repositories.len(),
            "Found repositories"
        );
        Ok(repositories)
    }

    /// Page producer over all repositories of a classified account
    pub fn repositories(&self, kind: AccountKind, account: &str) -> Pages<'_, Repository> {
        Pages::new(
            &self.session,
            self.session.url(&kind.repos_path(account)),
            self.max_pages,
        )
    }

    /// Fetch a single repository by owner and short name
    pub async fn get_repository(&self, owner: &str, repo_name: &str) -> Result<Repository> {
        let url = self.session.url(&format!("/repos/{}/{}", owner, repo_name));
        let response = ensure_success("GET", self.session.get(&url).await?).await?;
        decode_json("GET", response).await
    }

    /// Rulesets currently attached to a repository
    pub async fn list_rulesets(&self, full_name: &str) -> Result<Vec<RulesetSummary>> {
        let url = self
            .session
            .url(&format!("/repos/{}/rulesets?per_page=100", full_name));
        Pages::new(&self.session, url, self.max_pages)
            .collect_all()
            .await
    }

    /// Names of the rulesets currently attached to a repository
    pub async fn applied_ruleset_names(&self, full_name: &str) -> Result<BTreeSet<String>> {
        let names: BTreeSet<String> = self
            .list_rulesets(full_name)
            .await?
            .into_iter()
            .map(|ruleset| ruleset.name)
            .collect();
        debug!(repo = full_name, rulesets = ?names, "Existing rulesets");
        Ok(names)
    }

    /// Create a ruleset on a repository from a verbatim definition
    pub async fn create_ruleset(&self, full_name: &str, ruleset: &RulesetDefinition) -> Result<()> {
        let url = self.session.url(&format!("/repos/{}/rulesets", full_name));
        let response = self.session.post_json(&url, ruleset.payload()).await?;
        ensure_success("POST", response).await?;
        Ok(())
    }
}

#[async_trait]
impl RulesetLookup for GitHubClient {
    async fn applied_ruleset_names(&self, full_name: &str) -> Result<BTreeSet<String>> {
        GitHubClient::applied_ruleset_names(self, full_name).await
    }
}

#[async_trait]
impl RulesetWriter for GitHubClient {
    async fn create_ruleset(&self, full_name: &str, ruleset: &RulesetDefinition) -> Result<()> {
        GitHubClient::create_ruleset(self, full_name, ruleset).await
    }
}
