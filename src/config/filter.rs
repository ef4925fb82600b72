//! Matrix filter criteria
//!
//! Criteria arrive from the command line as `KEY==VALUE`, `KEY=VALUE` or
//! `KEY!=VALUE` and narrow the expanded matrix.

use super::errors::{ConfigError, ConfigResult};
use super::types::Environment;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static FILTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_]+)(==|!=|=)(.*)$").expect("filter regex is valid"));

/// Comparison operator of a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `==`
    Eq,
    /// `=`, same meaning as `==`
    Assign,
    /// `!=`
    NotEq,
}

impl FilterOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Assign => "=",
            Self::NotEq => "!=",
        }
    }
}

/// One `(key, operator, value)` triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriterion {
    /// Variable name
    pub key: String,
    /// Comparison
    pub op: FilterOp,
    /// Expected value
    pub value: String,
}

impl FilterCriterion {
    /// Creates a criterion
    pub fn new(key: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    /// Checks a flattened environment. A missing key never matches.
    #[must_use]
    pub fn matches(&self, env: &Environment) -> bool {
        match env.get(&self.key) {
            None => false,
            Some(actual) => match self.op {
                FilterOp::Eq | FilterOp::Assign => actual == self.value,
                FilterOp::NotEq => actual != self.value,
            },
        }
    }
}

impl FromStr for FilterCriterion {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let caps = FILTER_RE
            .captures(s)
            .ok_or_else(|| ConfigError::InvalidFilter(s.to_string()))?;
        let op = match &caps[2] {
            "==" => FilterOp::Eq,
            "!=" => FilterOp::NotEq,
            _ => FilterOp::Assign,
        };
        Ok(Self::new(&caps[1], op, &caps[3]))
    }
}

impl fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, self.op.symbol(), self.value)
    }
}

/// Parses a list of criteria strings.
///
/// # Errors
///
/// [`ConfigError::InvalidFilter`] for the first malformed string.
pub fn parse_filters<S: AsRef<str>>(raw: &[S]) -> ConfigResult<Vec<FilterCriterion>> {
    raw.iter().map(|s| s.as_ref().parse()).collect()
}
