//! Job plans
//!
//! Renders each matrix entry into what an executor needs to run it: the job
//! environment, a shell prelude exporting that environment, and the task list.
//! Every rendered script carries its own exports, so jobs share no state.

use crate::config::{ConfigParser, Dialect, Environment, MatrixEntry, Task};
use crate::infrastructure::Settings;
use serde::{Deserialize, Serialize};

/// One runnable job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPlan {
    /// `k=v` pairs of the job environment
    pub title: String,
    /// Base environment overlaid with the flattened entry
    pub env: Environment,
    /// Shell options and exports run before every command
    pub prelude: String,
    /// Ordered tasks
    pub tasks: Vec<Task>,
}

impl JobPlan {
    /// Builds the plan for one matrix entry.
    pub fn for_entry(config: &dyn ConfigParser, entry: &MatrixEntry, settings: &Settings) -> Self {
        let mut env = settings.base_env.clone();
        env.merge(&entry.flatten());

        let prelude = std::iter::once(settings.shell_prelude.clone())
            .chain(env.iter().map(|(k, v)| export_line(k, v)))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            title: env.to_string(),
            tasks: config.tasks(&env),
            env,
            prelude,
        }
    }

    /// Full script for one task: prelude, then the command.
    #[must_use]
    pub fn script(&self, task: &Task) -> String {
        format!("{}\n{}", self.prelude, task.command)
    }
}

fn export_line(key: &str, value: &str) -> String {
    format!("export {key}='{}'", value.replace('\'', r"'\''"))
}

/// Every job of a descriptor after filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Dialect the descriptor was read with
    pub dialect: Dialect,
    /// Target platform, native dialect only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Language, compatible dialect only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// One plan per matrix entry, in matrix order
    pub jobs: Vec<JobPlan>,
}

impl Plan {
    /// Plans every entry of the (already filtered) matrix.
    pub fn build(config: &dyn ConfigParser, settings: &Settings) -> Self {
        let jobs: Vec<JobPlan> = config
            .matrix()
            .iter()
            .map(|entry| JobPlan::for_entry(config, entry, settings))
            .collect();
        tracing::debug!(jobs = jobs.len(), "plan built");

        Self {
            dialect: config.dialect(),
            platform: config.platform().map(str::to_string),
            language: config.language().map(str::to_string),
            jobs,
        }
    }

    /// Returns true if filtering left nothing to run
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
