//! reporule - GitHub Repository Ruleset Governance
//!
//! reporule applies branch protection rulesets to every repository of a GitHub
//! organization or user, skipping repositories that are archived, on the
//! organization's exception list, or that already carry a ruleset of the same
//! name.
//!
//! ## Modules
//!
//! - [`session`]: Authenticated, retrying HTTP session
//! - [`github`]: Account classification, repository listing and rulesets API
//! - [`ruleset`]: Local ruleset definitions
//! - [`exceptions`]: Per-organization exception list
//! - [`eligibility`]: Partitioning repositories into eligible and skipped sets
//! - [`apply`]: Applying a ruleset to a batch of repositories
//! - [`engine`]: One complete ruleset invocation
//! - [`config`]: Configuration management and parsing

pub mod apply;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod exceptions;
pub mod github;
pub mod pagination;
pub mod ruleset;
pub mod session;

pub use apply::{ApplySummary, RulesetApplier};
pub use config::Config;
pub use eligibility::{EligibilityResolver, RepoStatus};
pub use engine::{GovernanceEngine, RepoTarget, RulesetOutcome, RulesetRequest};
pub use error::{RepoRuleError, Result};
pub use github::{AccountKind, GitHubClient, Repository};
pub use ruleset::{RulesetDefinition, RulesetStore};
pub use session::{GitHubSession, RetryPolicy, SessionConfig};
