//! Custom format rules declared in TOML
//!
//! ```toml
//! [[rules]]
//! name = "Payment gateway"
//! pattern = '^PAY (?P<level>\w+) (?P<msg>.+)$'
//! level = "$level"
//! message = "$msg"
//! service = "payments"
//!
//! [rules.metadata]
//! gateway = "stripe"
//! ```
//!
//! Every string field except `name` and `pattern` is a template expanded from the
//! match (`$1`, `$name`, `${name}`; `$$` for a literal dollar sign).

use crate::normalizer::FormatRule;
use crate::{LogLevel, PartialRecord};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid rules file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("rule '{rule}' has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

// Main config structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NormalizerConfig {
    // evaluated after the built-in rules, in file order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

// A single custom format rule
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub name: String,

    pub pattern: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub level: Option<String>,

    // whole match when absent
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

// default value helper for serde
fn default_true() -> bool {
    true
}

impl NormalizerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Compile every enabled rule, stopping at the first bad pattern
    pub fn build_rules(&self) -> Result<Vec<FormatRule>, ConfigError> {
        self.rules
            .iter()
            .filter(|rule| rule.enabled)
            .map(RuleConfig::build)
            .collect()
    }
}

impl RuleConfig {
    pub fn build(&self) -> Result<FormatRule, ConfigError> {
        let pattern = Regex::new(&self.pattern).map_err(|source| ConfigError::InvalidPattern {
            rule: self.name.clone(),
            source,
        })?;

        let templates = self.clone();
        Ok(FormatRule::new(self.name.clone(), pattern, move |caps| {
            PartialRecord {
                level: expand(caps, templates.level.as_deref())
                    .map(|level| LogLevel::canonicalize(&level)),
                message: expand(caps, templates.message.as_deref())
                    .or_else(|| caps.get(0).map(|m| m.as_str().trim().to_string())),
                service: expand(caps, templates.service.as_deref()),
                timestamp: expand(caps, templates.timestamp.as_deref()),
                metadata: templates
                    .metadata
                    .iter()
                    .filter_map(|(key, template)| {
                        expand(caps, Some(template.as_str()))
                            .map(|value| (key.clone(), serde_json::Value::String(value)))
                    })
                    .collect(),
            }
        }))
    }
}

// an empty expansion counts as "not supplied"
fn expand(caps: &Captures<'_>, template: Option<&str>) -> Option<String> {
    let template = template?;
    let mut out = String::new();
    caps.expand(template, &mut out);
    Some(out).filter(|s| !s.is_empty())
}

// Load custom rules from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<NormalizerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    NormalizerConfig::from_toml_str(&content)
}
