//! Ruleset application
//!
//! POSTs a ruleset to each repository in turn. A failure on one repository is
//! recorded and logged, and the batch carries on. The applier trusts its
//! input completely: repositories that already carry the ruleset must have
//! been filtered out by the eligibility resolver, otherwise GitHub creates a
//! duplicate.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::{RepoRuleError, Result};
use crate::ruleset::RulesetDefinition;

/// Creates a ruleset on a repository
#[async_trait]
pub trait RulesetWriter: Send + Sync {
    async fn create_ruleset(&self, full_name: &str, ruleset: &RulesetDefinition) -> Result<()>;
}

/// A repository the ruleset could not be applied to
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyFailure {
    pub repository: String,
    pub status: Option<u16>,
    pub error: String,
}

/// Results from applying a ruleset to a batch of repositories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplySummary {
    pub applied: Vec<String>,
    pub failures: Vec<ApplyFailure>,
}

impl ApplySummary {
    /// Number of repositories that received the ruleset
    pub fn count_applied(&self) -> usize {
        self.applied.len()
    }

    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failures.len()
    }
}

pub struct RulesetApplier<'a> {
    writer: &'a dyn RulesetWriter,
}

impl<'a> RulesetApplier<'a> {
    pub fn new(writer: &'a dyn RulesetWriter) -> Self {
        Self { writer }
    }

    pub async fn apply<I, S>(&self, repositories: I, ruleset: &RulesetDefinition) -> ApplySummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ruleset_name = ruleset.name();
        let mut summary = ApplySummary::default();

        info!(ruleset = ruleset_name, "Applying ruleset");
        for repo in repositories {
            let repo = repo.as_ref();
            match self.writer.create_ruleset(repo, ruleset).await {
                Ok(()) => {
                    info!(repo, ruleset = ruleset_name, "Applied ruleset");
                    summary.applied.push(repo.to_string());
                }
                Err(e) => {
                    let response = match &e {
                        RepoRuleError::Api { body, .. } => body.clone(),
                        other => other.to_string(),
                    };
                    error!(
                        repo,
                        ruleset = ruleset_name,
                        response = %response,
                        "Failed to apply branch ruleset"
                    );
                    summary.failures.push(ApplyFailure {
                        repository: repo.to_string(),
                        status: e.status(),
                        error: response,
                    });
                }
            }
        }

        summary
    }
}
