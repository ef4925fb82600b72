//! Branch whitelist/blacklist rules
//!
//! A `branches` block holds either `only` (whitelist) or `except` (blacklist).
//! Each entry is a literal branch name, or a regular expression when wrapped in
//! slashes (`/^release-/`). Entries are classified once, when parsed.

use super::errors::{ConfigError, ConfigResult};
use super::helpers::scalar;
use super::preprocess::Node;
use regex::Regex;
use std::fmt;

/// One branch rule entry
#[derive(Debug, Clone)]
pub enum BranchPattern {
    /// Matches a branch name exactly
    Literal(String),
    /// Matches when the expression is found anywhere in the branch name
    Pattern(Regex),
}

impl BranchPattern {
    /// Classifies a raw rule entry.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidField`] when a `/.../` entry is not a valid regex.
    pub fn parse(raw: &str, field: &str) -> ConfigResult<Self> {
        if raw.starts_with('/') && raw.ends_with('/') {
            // a lone `/` is an empty pattern
            let inner = raw.get(1..raw.len() - 1).unwrap_or_default();
            let regex = Regex::new(inner)
                .map_err(|e| ConfigError::invalid(field, format!("bad pattern '{raw}': {e}")))?;
            Ok(Self::Pattern(regex))
        } else {
            Ok(Self::Literal(raw.to_string()))
        }
    }

    /// Returns true if `branch` matches this entry
    #[must_use]
    pub fn matches(&self, branch: &str) -> bool {
        match self {
            Self::Literal(name) => name == branch,
            Self::Pattern(regex) => regex.is_match(branch),
        }
    }
}

impl PartialEq for BranchPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for BranchPattern {}

impl fmt::Display for BranchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(name) => f.write_str(name),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Which branches a descriptor allows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchRule {
    /// Only branches matching an entry are built
    Whitelist(Vec<BranchPattern>),
    /// Branches matching an entry are not built
    Blacklist(Vec<BranchPattern>),
}

impl BranchRule {
    /// Parses the `branches` block. Absent or empty means no restriction.
    ///
    /// `only` takes precedence when both keys are present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidField`] when the block is not a mapping, holds
    /// neither `only` nor `except`, or the chosen key is not a list.
    pub fn parse(node: Option<&Node>) -> ConfigResult<Option<Self>> {
        let Some(node) = node.filter(|n| n.is_truthy()) else {
            return Ok(None);
        };
        let Some(map) = node.as_mapping() else {
            return Err(ConfigError::invalid(
                "branches",
                format!("expected a mapping, found {}", node.kind()),
            ));
        };

        if let Some(only) = map.get("only") {
            return Ok(Some(Self::Whitelist(patterns(only, "branches.only")?)));
        }
        if let Some(except) = map.get("except") {
            return Ok(Some(Self::Blacklist(patterns(except, "branches.except")?)));
        }
        Err(ConfigError::invalid(
            "branches",
            "contains neither 'only' nor 'except'",
        ))
    }

    /// Applies the rule to a branch name
    #[must_use]
    pub fn allows(&self, branch: &str) -> bool {
        match self {
            Self::Whitelist(rules) => rules.iter().any(|r| r.matches(branch)),
            Self::Blacklist(rules) => !rules.iter().any(|r| r.matches(branch)),
        }
    }
}

fn patterns(node: &Node, field: &str) -> ConfigResult<Vec<BranchPattern>> {
    let Node::Sequence(items) = node else {
        return Err(ConfigError::invalid(field, "should be a list"));
    };
    items
        .iter()
        .map(|item| BranchPattern::parse(&scalar(item, field)?, field))
        .collect()
}

/// Branch predicate shared by both dialects; no rule means every branch builds.
#[must_use]
pub fn can_build_branch(rule: Option<&BranchRule>, branch: &str) -> bool {
    rule.is_none_or(|r| r.allows(branch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::preprocess::Preprocessor;
    use crate::config::steps::StepRegistry;

    fn rule(yaml: &str) -> ConfigResult<Option<BranchRule>> {
        let registry = StepRegistry::new();
        let node = Preprocessor::new(&registry).parse_str(yaml).unwrap();
        BranchRule::parse(node.get("branches"))
    }

    #[test]
    fn test_whitelist_literal_and_pattern() {
        let rule = rule("branches:\n  only: [main, /^release-/]\n").unwrap();
        let rule = rule.as_ref();
        assert!(can_build_branch(rule, "main"));
        assert!(can_build_branch(rule, "release-2"));
        assert!(!can_build_branch(rule, "develop"));
    }

    #[test]
    fn test_pattern_is_unanchored_search() {
        let rule = rule("branches:\n  only: [/feature/]\n").unwrap();
        assert!(can_build_branch(rule.as_ref(), "my-feature-x"));
    }

    #[test]
    fn test_blacklist() {
        let rule = rule("branches:\n  except: [wip]\n").unwrap();
        assert!(!can_build_branch(rule.as_ref(), "wip"));
        assert!(can_build_branch(rule.as_ref(), "main"));
    }

    #[test]
    fn test_no_block_is_unrestricted() {
        let rule = rule("language: python\n").unwrap();
        assert!(rule.is_none());
        assert!(can_build_branch(None, "anything"));
    }

    #[test]
    fn test_only_takes_precedence() {
        let rule = rule("branches:\n  only: [main]\n  except: [main]\n").unwrap();
        assert!(matches!(rule, Some(BranchRule::Whitelist(_))));
    }

    #[test]
    fn test_neither_key_is_invalid() {
        let err = rule("branches:\n  other: [x]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "branches"));
    }

    #[test]
    fn test_only_must_be_list() {
        let err = rule("branches:\n  only: main\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "branches.only"));
    }

    #[test]
    fn test_bad_regex() {
        assert!(rule("branches:\n  only: [\"/[/\"]\n").is_err());
    }

    #[test]
    fn test_classification_happens_once() {
        let pattern = BranchPattern::parse("/^v[0-9]+$/", "branches.only").unwrap();
        assert!(matches!(pattern, BranchPattern::Pattern(_)));
        assert_eq!(pattern.to_string(), "/^v[0-9]+$/");
        assert!(matches!(
            BranchPattern::parse("main", "branches.only").unwrap(),
            BranchPattern::Literal(_)
        ));
    }

    #[test]
    fn test_lone_slash_matches_every_branch() {
        let pattern = BranchPattern::parse("/", "branches.only").unwrap();
        assert!(matches!(pattern, BranchPattern::Pattern(_)));
        assert!(pattern.matches("main"));
        assert!(pattern.matches(""));
    }
}
