//! `ciplan branch` - Test a branch against the descriptor's branch rule

use super::DescriptorArgs;
use anyhow::Result;
use ciplan::config::ConfigParser;
use ciplan::infrastructure::Settings;

/// Whether the descriptor allows building `branch`.
pub fn can_build(descriptor: &DescriptorArgs, branch: &str, settings: &Settings) -> Result<bool> {
    let config = super::load(descriptor, settings)?;
    let allowed = config.can_build_branch(branch);
    tracing::debug!(branch, allowed, "branch checked");
    Ok(allowed)
}
