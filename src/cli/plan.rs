//! `ciplan plan` - Dry-run the build matrix
//!
//! Loads the descriptor, applies the command-line filters and prints the
//! surviving jobs with their task lists. Nothing is executed.
//!
//! ## Usage
//!
//! ```bash
//! ciplan plan -C path/to/repo python==3.6 'DB!=sqlite'
//! ciplan plan --json > plan.json
//! ```

use super::DescriptorArgs;
use anyhow::{Context, Result};
use ciplan::config::{ConfigParser, parse_filters};
use ciplan::infrastructure::Settings;
use ciplan::plan::Plan;

/// Printed instead of the job list when filtering removed everything
pub const EMPTY_MATRIX: &str = "nothing in matrix (everything filtered?)";

/// Builds the plan and renders it as text or JSON.
pub fn plan_jobs(
    descriptor: &DescriptorArgs,
    filters: &[String],
    json: bool,
    settings: &Settings,
) -> Result<String> {
    let criteria = parse_filters(filters)?;
    let mut config = super::load(descriptor, settings)?;
    config.filter(&criteria);

    let plan = Plan::build(&config, settings);
    if json {
        return serde_json::to_string_pretty(&plan).context("Failed to serialize plan");
    }
    Ok(render(&plan))
}

/// Text rendering of a plan
pub fn render(plan: &Plan) -> String {
    if plan.is_empty() {
        return EMPTY_MATRIX.to_string();
    }

    let mut lines = vec!["will run:".to_string()];
    lines.extend(plan.jobs.iter().map(|job| format!("  {}", job.title)));
    for job in &plan.jobs {
        lines.push(String::new());
        lines.push(format!("== {}", job.title));
        lines.extend(job.tasks.iter().map(ToString::to_string));
    }
    lines.join("\n")
}
