//! Per-organization exception list
//!
//! Repositories named in `repos_exception.yml` never receive automated
//! rulesets. Entries are short names scoped to an organization and are
//! expanded to `org/repo` before comparison.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::eligibility::ExceptionSource;
use crate::error::{RepoRuleError, Result};

pub const EXCEPTIONS_FILE: &str = "repos_exception.yml";

/// Parsed exception list file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExceptionList {
    #[serde(default)]
    pub organizations: Vec<OrganizationExceptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationExceptions {
    pub name: String,
    #[serde(default)]
    pub repos: Vec<String>,
}

impl ExceptionList {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoRuleError::config(path, "unable to retrieve repo exceptions list")
            } else {
                RepoRuleError::config(path, e)
            }
        })?;

        let list: Option<ExceptionList> =
            serde_yaml::from_str(&content).map_err(|e| RepoRuleError::config(path, e))?;
        list.ok_or_else(|| RepoRuleError::config(path, "exception list is empty"))
    }

    /// Full names of the excepted repositories of `org`.
    ///
    /// Organization names match ignoring ASCII case, as they do on GitHub.
    pub fn for_organization(&self, org: &str) -> BTreeSet<String> {
        self.organizations
            .iter()
            .filter(|entry| entry.name.eq_ignore_ascii_case(org))
            .flat_map(|entry| entry.repos.iter())
            .map(|repo| format!("{}/{}", org, repo))
            .collect()
    }
}

/// Reads the exception list from disk on every lookup
#[derive(Debug, Clone)]
pub struct ExceptionStore {
    path: PathBuf,
}

impl ExceptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `<data_dir>/repos_exception.yml`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(EXCEPTIONS_FILE))
    }

    pub fn get_exceptions(&self, org: &str) -> Result<BTreeSet<String>> {
        let exceptions = ExceptionList::load(&self.path)?.for_organization(org);
        debug!(org, exceptions = ?exceptions, "Repo exceptions loaded");
        Ok(exceptions)
    }
}

impl ExceptionSource for ExceptionStore {
    fn exceptions(&self, org: &str) -> Result<BTreeSet<String>> {
        self.get_exceptions(org)
    }
}
