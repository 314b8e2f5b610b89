//! Local ruleset definitions
//!
//! A definition lives in `<data_dir>/<name>.json`. Its `name` field is the
//! key used to detect rulesets that are already applied; the whole document
//! is sent to GitHub unchanged.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RepoRuleError, Result};

pub const DEFAULT_RULESET: &str = "default_branch_protections";

/// A named ruleset and its verbatim API payload
#[derive(Debug, Clone, PartialEq)]
pub struct RulesetDefinition {
    name: String,
    payload: Value,
}

impl RulesetDefinition {
    /// Build a definition from a JSON document carrying a string `name`
    pub fn from_value(payload: Value) -> std::result::Result<Self, String> {
        let name = match &payload {
            Value::Object(map) => match map.get("name") {
                Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
                Some(_) => return Err("`name` must be a non-empty string".to_string()),
                None => return Err("missing required `name` field".to_string()),
            },
            _ => return Err("ruleset must be a JSON object".to_string()),
        };
        Ok(Self { name, payload })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Directory of ruleset definition files
#[derive(Debug, Clone)]
pub struct RulesetStore {
    data_dir: PathBuf,
}

impl RulesetStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    /// Load `<data_dir>/<name>.json`
    pub fn load_ruleset(&self, name: &str) -> Result<RulesetDefinition> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(RepoRuleError::config(
                self.path_for(name),
                format!("invalid ruleset name '{}'", name),
            ));
        }
        let path = self.path_for(name);
        let ruleset = read_definition(&path)?;
        debug!(
            ruleset_name = name,
            ruleset = %ruleset.payload,
            "Branch ruleset loaded"
        );
        Ok(ruleset)
    }
}

fn read_definition(path: &Path) -> Result<RulesetDefinition> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RepoRuleError::config(path, "ruleset file not found")
        } else {
            RepoRuleError::config(path, e)
        }
    })?;
    let payload: Value =
        serde_json::from_str(&content).map_err(|e| RepoRuleError::config(path, e))?;
    RulesetDefinition::from_value(payload).map_err(|reason| RepoRuleError::config(path, reason))
}
