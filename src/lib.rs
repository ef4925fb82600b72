//! # ciplan - CI descriptor parsing and build-matrix expansion
//!
//! ciplan reads the job descriptor of a continuous-integration repository and
//! turns it into an executable plan: an ordered list of stages, each broken
//! into concrete shell tasks, and a fully expanded matrix of environment
//! combinations gated by branch rules.
//!
//! Two descriptor dialects are supported behind [`ConfigParser`]:
//!
//! - **native** (`meta.yml`): a `platform` and four fixed stages
//!   (`base`, `build`, `test`, `package`) with apt sources, packages and script.
//! - **compatible** (`.travis.yml`, `.bbtravis.yml`): a language version axis
//!   crossed with an environment matrix, `matrix.exclude`/`include`, six
//!   script stages, branch rules and notifications.
//!
//! ## Quick Start
//!
//! ```
//! use ciplan::prelude::*;
//!
//! let mut config = TravisConfig::default();
//! config.parse("language: python\npython: [\"2.7\", \"3.6\"]\nscript: [pytest]\n")?;
//! config.filter(&["python==3.6".parse()?]);
//!
//! let plan = Plan::build(&config, &Settings::default());
//! assert_eq!(plan.jobs.len(), 1);
//! # Ok::<(), ciplan::config::ConfigError>(())
//! ```
//!
//! Custom YAML tags resolve against a [`StepRegistry`] supplied by the host:
//! `!Interpolate`/`!i` keep a template for later substitution, any other tag
//! constructs a registered step.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod infrastructure;
pub mod plan;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use config::{
    BranchRule, ConfigError, ConfigParser, ConfigResult, Dialect, EmailNotification, Environment,
    FilterCriterion, IrcNotification, LoadedConfig, MatrixEntry, NativeConfig, NotificationPolicy,
    Stage, StepRegistry, Task, TravisConfig, load_descriptor,
};
pub use infrastructure::{Settings, init_logging};
pub use plan::{JobPlan, Plan};

/// Version of the ciplan crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
