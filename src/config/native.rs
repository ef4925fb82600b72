//! Native descriptor dialect (`meta.yml`)
//!
//! ```yaml
//! platform: ubuntu:22.04
//! base:
//!   sources: [ppa:deadsnakes/ppa]
//!   packages: [python3.11]
//! build:
//!   script: [make]
//! test:
//!   script: [make check]
//! ```

use super::branches::{BranchRule, can_build_branch};
use super::errors::{ConfigError, ConfigResult};
use super::filter::FilterCriterion;
use super::helpers::{command_list, root_mapping, scalar, string_list};
use super::preprocess::{Node, Preprocessor};
use super::steps::StepRegistry;
use super::tasks::stage_tasks;
use super::types::{Environment, MatrixEntry, Stage, Task};
use super::{ConfigParser, Dialect};
use std::sync::Arc;

/// Stage names of the native dialect, in execution order
pub const NATIVE_STAGES: [&str; 4] = ["base", "build", "test", "package"];

const STAGE_KEYS: [&str; 3] = ["sources", "packages", "script"];

/// Parsed native descriptor
#[derive(Debug, Clone)]
pub struct NativeConfig {
    registry: Arc<StepRegistry>,
    platform: Option<String>,
    stages: Vec<Stage>,
    matrix: Vec<MatrixEntry>,
    global_env: Environment,
    branches: Option<BranchRule>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self::new(Arc::new(StepRegistry::new()))
    }
}

impl NativeConfig {
    /// Creates an unparsed config that resolves step tags with `registry`
    #[must_use]
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self {
            registry,
            platform: None,
            stages: Vec::new(),
            matrix: vec![MatrixEntry::default()],
            global_env: Environment::new(),
            branches: None,
        }
    }

    /// Branch rule, if the descriptor declared one
    #[must_use]
    pub fn branches(&self) -> Option<&BranchRule> {
        self.branches.as_ref()
    }

    fn parse_stage(name: &str, block: Option<&Node>) -> ConfigResult<Stage> {
        let block = match block {
            None | Some(Node::Null) => return Ok(Stage::script(name, Vec::new())),
            Some(Node::Mapping(map)) => map,
            Some(other) => {
                return Err(ConfigError::invalid(
                    name,
                    format!("expected a mapping, found {}", other.kind()),
                ));
            }
        };

        for key in block.keys() {
            if !STAGE_KEYS.contains(&key.as_str()) {
                tracing::warn!(stage = name, key = %key, "ignoring unknown stage field");
            }
        }

        Ok(Stage {
            name: name.to_string(),
            sources: string_list(block.get("sources"), &format!("{name}.sources"))?,
            packages: string_list(block.get("packages"), &format!("{name}.packages"))?,
            tasks: command_list(block.get("script"), &format!("{name}.script"))?,
        })
    }
}

impl ConfigParser for NativeConfig {
    fn parse(&mut self, text: &str) -> ConfigResult<()> {
        let root = root_mapping(Preprocessor::new(&self.registry).parse_str(text)?)?;
        tracing::debug!(dialect = %Dialect::Native, "parsing descriptor");

        let platform = root.get("platform").ok_or_else(|| ConfigError::missing("platform"))?;
        self.platform = Some(scalar(platform, "platform")?);

        self.stages = NATIVE_STAGES
            .iter()
            .map(|name| Self::parse_stage(name, root.get(*name)))
            .collect::<ConfigResult<_>>()?;
        self.branches = BranchRule::parse(root.get("branches"))?;

        tracing::debug!(
            platform = self.platform.as_deref().unwrap_or_default(),
            stages = self.stages.len(),
            "native descriptor parsed"
        );
        Ok(())
    }

    fn filter(&mut self, criteria: &[FilterCriterion]) {
        if !criteria.is_empty() {
            tracing::debug!(criteria = criteria.len(), "native dialect has no matrix to filter");
        }
    }

    fn tasks(&self, environment: &Environment) -> Vec<Task> {
        stage_tasks(&self.stages, environment)
    }

    fn can_build_branch(&self, branch: &str) -> bool {
        can_build_branch(self.branches.as_ref(), branch)
    }

    fn dialect(&self) -> Dialect {
        Dialect::Native
    }

    fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    fn language(&self) -> Option<&str> {
        None
    }

    fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn matrix(&self) -> &[MatrixEntry] {
        &self.matrix
    }

    fn global_env(&self) -> &Environment {
        &self.global_env
    }
}
