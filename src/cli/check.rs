//! `ciplan check` - Validate a descriptor
//!
//! Parses the descriptor and reports its dialect, stages and matrix size.
//!
//! ## Usage
//!
//! ```bash
//! ciplan check -f .travis.yml
//! # Exit code 0: descriptor is valid
//! # Exit code 1: descriptor is invalid or missing
//! ```

use super::DescriptorArgs;
use anyhow::Result;
use ciplan::config::ConfigParser;
use ciplan::infrastructure::Settings;

/// Loads the descriptor and returns a one-paragraph summary.
pub fn check_descriptor(descriptor: &DescriptorArgs, settings: &Settings) -> Result<String> {
    let config = super::load(descriptor, settings)?;
    tracing::info!(dialect = %config.dialect(), "descriptor is valid");

    let target = config
        .platform()
        .map(|p| format!("platform {p}"))
        .or_else(|| config.language().map(|l| format!("language {l}")))
        .unwrap_or_default();
    let commands: usize = config.stages().iter().map(|s| s.tasks.len()).sum();

    Ok(format!(
        "ok: {} descriptor, {target}, {} stages, {commands} commands, {} matrix entries",
        config.dialect(),
        config.stages().len(),
        config.matrix().len()
    ))
}
