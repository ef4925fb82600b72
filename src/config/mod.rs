//! Descriptor parsing and build-matrix expansion
//!
//! A descriptor is read in one of two dialects. Both implement
//! [`ConfigParser`]: parse once, optionally narrow the matrix with
//! [`ConfigParser::filter`], then ask for each entry's task list.

pub mod branches;
pub mod errors;
pub mod filter;
pub mod helpers;
pub mod loader;
pub mod matrix;
pub mod native;
pub mod notifications;
pub mod preprocess;
pub mod steps;
pub mod tasks;
pub mod travis;
pub mod types;


use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use branches::{BranchPattern, BranchRule};
pub use errors::{ConfigError, ConfigResult};
pub use filter::{FilterCriterion, FilterOp, parse_filters};
pub use loader::{LoadedConfig, load_descriptor, load_file};
pub use native::NativeConfig;
pub use notifications::{EmailNotification, IrcNotification, NotificationPolicy};
pub use preprocess::{Interpolate, Node, Preprocessor};
pub use steps::{CustomStep, StepArgs, StepConstructor, StepError, StepRegistry};
pub use travis::TravisConfig;
pub use types::{Environment, MatrixEntry, Stage, Task};

/// Descriptor grammar variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `meta.yml`: explicit base/build/test/package stages
    Native,
    /// `.travis.yml` compatible: language matrix, env matrix, notifications
    Compatible,
}

impl Dialect {
    /// Native for `meta.yml`, compatible for anything else.
    #[must_use]
    pub fn from_filename(path: &Path) -> Self {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("meta.yml") => Self::Native,
            _ => Self::Compatible,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Compatible => write!(f, "compatible"),
        }
    }
}

/// Contract shared by both descriptor dialects
pub trait ConfigParser {
    /// Parses the full descriptor text, replacing any previous state.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] of the invalid-config family; nothing is recovered.
    fn parse(&mut self, text: &str) -> ConfigResult<()>;

    /// Narrows the matrix to entries satisfying every criterion.
    fn filter(&mut self, criteria: &[FilterCriterion]);

    /// Ordered task list for one job.
    fn tasks(&self, environment: &Environment) -> Vec<Task>;

    /// Whether `branch` passes the descriptor's branch rule.
    fn can_build_branch(&self, branch: &str) -> bool;

    /// Which grammar this parser reads
    fn dialect(&self) -> Dialect;

    /// Target platform (native dialect only)
    fn platform(&self) -> Option<&str>;

    /// Language (compatible dialect only)
    fn language(&self) -> Option<&str>;

    /// Stages in execution order
    fn stages(&self) -> &[Stage];

    /// Expanded, possibly filtered, matrix
    fn matrix(&self) -> &[MatrixEntry];

    /// Defaults shared by every matrix entry
    fn global_env(&self) -> &Environment;
}
