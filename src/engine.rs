//! Governance engine - runs one ruleset invocation end to end
//!
//! Loads the ruleset definition, fetches the candidate repositories, resolves
//! eligibility and applies the ruleset unless this is a dry run.

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use crate::apply::{ApplySummary, RulesetApplier};
use crate::config::Config;
use crate::eligibility::{EligibilityResolver, RepoStatus};
use crate::error::{RepoRuleError, Result};
use crate::exceptions::ExceptionStore;
use crate::github::{GitHubClient, Repository};
use crate::ruleset::RulesetStore;
use crate::session::GitHubSession;

/// Which repositories of an account a ruleset run targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoTarget {
    All,
    Single(String),
}

impl RepoTarget {
    /// Validate the mutually exclusive `--repo` / `--all` flags
    pub fn from_flags(repo: Option<String>, all: bool) -> Result<Self> {
        match (repo, all) {
            (None, false) => Err(RepoRuleError::BadParameter(
                "Either --all or --repo must be specified".to_string(),
            )),
            (Some(_), true) => Err(RepoRuleError::BadParameter(
                "Cannot specify --repo when using --all".to_string(),
            )),
            (Some(repo), false) if repo.trim().is_empty() => Err(RepoRuleError::BadParameter(
                "--repo requires a repository name".to_string(),
            )),
            (Some(repo), false) => Ok(RepoTarget::Single(repo)),
            (None, true) => Ok(RepoTarget::All),
        }
    }

    fn repo_name(&self) -> Option<&str> {
        match self {
            RepoTarget::All => None,
            RepoTarget::Single(name) => Some(name),
        }
    }
}

/// Parameters of one `ruleset` invocation
#[derive(Debug, Clone)]
pub struct RulesetRequest {
    pub account: String,
    pub target: RepoTarget,
    pub ruleset_name: String,
    pub dry_run: bool,
}

/// Results from a complete ruleset invocation
#[derive(Debug, Clone)]
pub struct RulesetOutcome {
    pub ruleset_name: String,
    pub target: RepoTarget,
    pub status: RepoStatus,
    pub dry_run: bool,
    pub summary: ApplySummary,
    pub duration: Duration,
}

impl RulesetOutcome {
    /// Repositories a dry run would have updated
    pub fn would_apply(&self) -> usize {
        self.status.eligible_repos.len()
    }
}

pub struct GovernanceEngine {
    client: GitHubClient,
    rulesets: RulesetStore,
    exceptions: ExceptionStore,
}

impl GovernanceEngine {
    pub fn new(client: GitHubClient, data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            client,
            rulesets: RulesetStore::new(data_dir),
            exceptions: ExceptionStore::in_data_dir(data_dir),
        }
    }

    /// Build the engine from configuration and an optional bearer token
    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self> {
        let session = GitHubSession::new(&config.session_config(token))?;
        let client = GitHubClient::new(session).with_max_pages(config.github.max_pages);
        Ok(Self {
            client,
            rulesets: RulesetStore::new(config.data_dir()),
            exceptions: ExceptionStore::new(config.exceptions_path()),
        })
    }

    /// Every repository of an organization or user
    pub async fn list(&self, account: &str) -> Result<Vec<Repository>> {
        self.client.list_repositories(account, None).await
    }

    pub async fn run_ruleset(&self, request: &RulesetRequest) -> Result<RulesetOutcome> {
        let start_time = Instant::now();

        // Configuration problems must surface before any network activity
        let ruleset = self.rulesets.load_ruleset(&request.ruleset_name)?;

        let repositories = self
            .client
            .list_repositories(&request.account, request.target.repo_name())
            .await?;

        let resolver = EligibilityResolver::new(&self.exceptions, &self.client);
        let status = resolver
            .compute_status(&request.account, &repositories, &ruleset)
            .await?;

        let summary = if request.dry_run {
            info!(
                ruleset = ruleset.name(),
                would_apply = status.eligible_repos.len(),
                "Dry run, no rulesets applied"
            );
            ApplySummary::default()
        } else {
            RulesetApplier::new(&self.client)
                .apply(&status.eligible_repos, &ruleset)
                .await
        };

        let outcome = RulesetOutcome {
            ruleset_name: ruleset.name().to_string(),
            target: request.target.clone(),
            status,
            dry_run: request.dry_run,
            summary,
            duration: start_time.elapsed(),
        };

        info!(
            ruleset = %outcome.ruleset_name,
            applied = outcome.summary.count_applied(),
            failed = outcome.summary.failures.len(),
            dry_run = outcome.dry_run,
            "Ruleset run completed in {:.2}s",
            outcome.duration.as_secs_f64()
        );

        Ok(outcome)
    }
}
