//! ciplan - build-matrix planner for CI descriptors
//!
//! Reads a `meta.yml`, `.bbtravis.yml` or `.travis.yml` descriptor and shows
//! the jobs it expands to.
//!
//! ## Commands
//!
//! - `ciplan plan` - Print every job and its tasks (dry run)
//! - `ciplan check` - Validate a descriptor
//! - `ciplan branch` - Test a branch name against the branch rule
//! - `ciplan completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the jobs for the descriptor in the current directory
//! ciplan plan
//!
//! # Only the python 3.6 jobs without the sqlite backend
//! ciplan plan python==3.6 'DB!=sqlite'
//!
//! # Would a push to this branch build?
//! ciplan branch release-2.1 && echo yes
//!
//! # Generate shell completions
//! ciplan completions bash > /etc/bash_completion.d/ciplan
//! ```

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("CIPLAN_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
