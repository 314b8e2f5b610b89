//! Eligibility resolution
//!
//! Splits candidate repositories into archived, excepted, already-ruled and
//! eligible sets. The exclusion sets may overlap; a repository is eligible
//! only when it belongs to none of them.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::error::Result;
use crate::github::Repository;
use crate::ruleset::RulesetDefinition;

/// Source of the repositories that must never receive automated rulesets
#[cfg_attr(test, mockall::automock)]
pub trait ExceptionSource: Send + Sync {
    /// Full names (`org/repo`) excepted for `org`
    fn exceptions(&self, org: &str) -> Result<BTreeSet<String>>;
}

/// Lookup of the rulesets already attached to a repository
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RulesetLookup: Send + Sync {
    async fn applied_ruleset_names(&self, full_name: &str) -> Result<BTreeSet<String>>;
}

/// Partition of the candidate repositories for one ruleset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    pub all_repos: BTreeSet<String>,
    pub archived: BTreeSet<String>,
    pub exceptions: BTreeSet<String>,
    pub existing_ruleset: BTreeSet<String>,
    pub eligible_repos: BTreeSet<String>,
}

impl RepoStatus {
    /// Build the partition from the candidate set and the three exclusion sets
    pub fn partition(
        all_repos: BTreeSet<String>,
        archived: BTreeSet<String>,
        exceptions: BTreeSet<String>,
        existing_ruleset: BTreeSet<String>,
    ) -> Self {
        let eligible_repos = all_repos
            .iter()
            .filter(|repo| {
                !archived.contains(*repo)
                    && !exceptions.contains(*repo)
                    && !existing_ruleset.contains(*repo)
            })
            .cloned()
            .collect();

        Self {
            all_repos,
            archived,
            exceptions,
            existing_ruleset,
            eligible_repos,
        }
    }

    /// Excepted repositories among the candidates.
    ///
    /// Exception entries for repositories outside the current target are
    /// ignored, which is what single-repository runs report.
    pub fn skipped_exceptions(&self) -> BTreeSet<String> {
        self.exceptions
            .intersection(&self.all_repos)
            .cloned()
            .collect()
    }
}

/// Rewrite exception entries to the spelling of the matching candidate.
///
/// Owner and repository names compare ignoring case. Entries without a
/// matching candidate are kept as written.
fn canonical_exceptions(
    all_repos: &BTreeSet<String>,
    exceptions: BTreeSet<String>,
) -> BTreeSet<String> {
    let by_lowercase: HashMap<String, &String> = all_repos
        .iter()
        .map(|repo| (repo.to_lowercase(), repo))
        .collect();

    exceptions
        .into_iter()
        .map(|entry| match by_lowercase.get(&entry.to_lowercase()) {
            Some(canonical) => (*canonical).clone(),
            None => entry,
        })
        .collect()
}

/// Computes [`RepoStatus`] from exception and existing-ruleset data
pub struct EligibilityResolver<'a> {
    exceptions: &'a dyn ExceptionSource,
    rulesets: &'a dyn RulesetLookup,
}

impl<'a> EligibilityResolver<'a> {
    pub fn new(exceptions: &'a dyn ExceptionSource, rulesets: &'a dyn RulesetLookup) -> Self {
        Self {
            exceptions,
            rulesets,
        }
    }

    /// Determine which repositories of `org` should receive `ruleset`.
    ///
    /// Archived and excepted repositories are filtered before any
    /// existing-ruleset lookup so they never cost an API call.
    pub async fn compute_status(
        &self,
        org: &str,
        repositories: &[Repository],
        ruleset: &RulesetDefinition,
    ) -> Result<RepoStatus> {
        let ruleset_name = ruleset.name();

        let all_repos: BTreeSet<String> =
            repositories.iter().map(|r| r.full_name.clone()).collect();
        let archived: BTreeSet<String> = repositories
            .iter()
            .filter(|r| r.archived)
            .map(|r| r.full_name.clone())
            .collect();
        let exceptions = canonical_exceptions(&all_repos, self.exceptions.exceptions(org)?);

        let mut existing_ruleset = BTreeSet::new();
        for repo in all_repos
            .iter()
            .filter(|repo| !archived.contains(*repo) && !exceptions.contains(*repo))
        {
            if self
                .rulesets
                .applied_ruleset_names(repo)
                .await?
                .contains(ruleset_name)
            {
                existing_ruleset.insert(repo.clone());
            }
        }

        let status = RepoStatus::partition(all_repos, archived, exceptions, existing_ruleset);
        debug!(
            ruleset_name,
            archived = ?status.archived,
            exceptions = ?status.exceptions,
            existing_ruleset = ?status.existing_ruleset,
            eligible_repos = ?status.eligible_repos,
            "Repo eligibility for ruleset"
        );
        Ok(status)
    }
}
