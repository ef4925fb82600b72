//! Build-matrix expansion
//!
//! The implicit matrix is the language version axis crossed with the parsed
//! environments. `matrix.exclude` then removes every entry whose flattened
//! `key=value` set contains the pattern's set, and `matrix.include` appends
//! entries as written. Include is not deduplicated and is not re-checked
//! against the exclude patterns.

use super::errors::{ConfigError, ConfigResult};
use super::filter::FilterCriterion;
use super::helpers::entry_from_node;
use super::preprocess::Node;
use super::types::{Environment, MatrixEntry};

/// The version axis used for a language and its default value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionAxis {
    /// Descriptor field holding the versions
    pub key: &'static str,
    /// Version used when the field is absent
    pub default: &'static str,
}

const VERSION_AXES: &[(&str, VersionAxis)] = &[
    ("python", VersionAxis { key: "python", default: "python2.6" }),
    ("ruby", VersionAxis { key: "rvm", default: "default" }),
    ("node_js", VersionAxis { key: "node_js", default: "node" }),
    ("go", VersionAxis { key: "go", default: "stable" }),
    ("rust", VersionAxis { key: "rust", default: "stable" }),
    ("php", VersionAxis { key: "php", default: "default" }),
    ("java", VersionAxis { key: "jdk", default: "default" }),
];

impl VersionAxis {
    /// Axis for `language`; unknown languages use the python axis.
    #[must_use]
    pub fn for_language(language: &str) -> Self {
        VERSION_AXES
            .iter()
            .find(|(lang, _)| *lang == language)
            .map_or(VERSION_AXES[0].1, |(_, axis)| *axis)
    }

    /// Reads the version list from the descriptor root, coercing a scalar to
    /// a one-element list. An empty list leaves the implicit matrix empty.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidField`] for mappings or nested lists.
    pub fn versions(&self, node: Option<&Node>) -> ConfigResult<Vec<String>> {
        match node {
            None | Some(Node::Null) => Ok(vec![self.default.to_string()]),
            Some(node) => super::helpers::string_list(Some(node), self.key),
        }
    }
}

/// `matrix.exclude` and `matrix.include`, parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixRules {
    /// Partial-match removal patterns
    pub exclude: Vec<MatrixEntry>,
    /// Entries appended after exclusion
    pub include: Vec<MatrixEntry>,
}

impl MatrixRules {
    /// Parses the `matrix` block.
    ///
    /// Exclude patterns tokenize their `env` on its own; include entries
    /// tokenize over the global environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidField`] when the block or its lists have the wrong shape.
    pub fn parse(node: Option<&Node>, global: &Environment) -> ConfigResult<Self> {
        let Some(node) = node.filter(|n| !n.is_null()) else {
            return Ok(Self::default());
        };
        let Some(map) = node.as_mapping() else {
            return Err(ConfigError::invalid(
                "matrix",
                format!("expected a mapping, found {}", node.kind()),
            ));
        };

        for key in map.keys() {
            if key != "exclude" && key != "include" {
                tracing::debug!(key = %key, "ignoring matrix setting");
            }
        }

        Ok(Self {
            exclude: entries(map.get("exclude"), None, "matrix.exclude")?,
            include: entries(map.get("include"), Some(global), "matrix.include")?,
        })
    }
}

fn entries(
    node: Option<&Node>,
    global: Option<&Environment>,
    field: &str,
) -> ConfigResult<Vec<MatrixEntry>> {
    match node {
        None | Some(Node::Null) => Ok(Vec::new()),
        Some(Node::Sequence(items)) => items
            .iter()
            .map(|item| entry_from_node(item, global, field))
            .collect(),
        Some(other) => Err(ConfigError::invalid(
            field,
            format!("expected a list, found {}", other.kind()),
        )),
    }
}

/// Crosses every version with every environment, versions outermost.
#[must_use]
pub fn implicit_matrix(axis: &str, versions: &[String], environments: &[Environment]) -> Vec<MatrixEntry> {
    versions
        .iter()
        .flat_map(|version| {
            environments
                .iter()
                .map(move |env| MatrixEntry::new(axis, version.as_str(), env.clone()))
        })
        .collect()
}

/// Removes every entry whose flattened set is a superset of the pattern's.
/// Returns the number of entries removed.
pub fn apply_exclude(matrix: &mut Vec<MatrixEntry>, pattern: &MatrixEntry) -> usize {
    let wanted = pattern.flattened_set();
    let before = matrix.len();
    matrix.retain(|entry| !entry.flattened_set().is_superset(&wanted));
    before - matrix.len()
}

/// Appends include entries verbatim.
pub fn apply_include(matrix: &mut Vec<MatrixEntry>, include: &[MatrixEntry]) {
    matrix.extend(include.iter().cloned());
}

/// Builds the final matrix: implicit cross product, then exclude, then include.
#[must_use]
pub fn expand(
    axis: &str,
    versions: &[String],
    environments: &[Environment],
    rules: &MatrixRules,
) -> Vec<MatrixEntry> {
    let mut matrix = implicit_matrix(axis, versions, environments);
    tracing::debug!(entries = matrix.len(), "implicit matrix built");

    for pattern in &rules.exclude {
        let removed = apply_exclude(&mut matrix, pattern);
        tracing::trace!(pattern = %pattern, removed, "exclude applied");
    }
    apply_include(&mut matrix, &rules.include);

    tracing::debug!(
        entries = matrix.len(),
        excluded = rules.exclude.len(),
        included = rules.include.len(),
        "matrix expanded"
    );
    matrix
}

/// Keeps entries whose flattened environment satisfies every criterion.
/// An empty criteria list keeps everything.
pub fn filter_matrix(matrix: &mut Vec<MatrixEntry>, criteria: &[FilterCriterion]) {
    if criteria.is_empty() {
        return;
    }
    matrix.retain(|entry| {
        let flat = entry.flatten();
        criteria.iter().all(|c| c.matches(&flat))
    });
}
