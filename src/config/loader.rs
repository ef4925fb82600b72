//! Descriptor discovery and loading

use super::errors::{ConfigError, ConfigResult};
use super::filter::FilterCriterion;
use super::native::NativeConfig;
use super::notifications::{EmailNotification, IrcNotification};
use super::steps::StepRegistry;
use super::travis::TravisConfig;
use super::types::{Environment, MatrixEntry, Stage, Task};
use super::{ConfigParser, Dialect};
use crate::infrastructure::Settings;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed descriptor of either dialect
#[derive(Debug, Clone)]
pub enum LoadedConfig {
    /// From `meta.yml`
    Native(NativeConfig),
    /// From `.travis.yml` / `.bbtravis.yml`
    Compatible(TravisConfig),
}

impl LoadedConfig {
    /// An unparsed config for `dialect`
    #[must_use]
    pub fn empty(dialect: Dialect, registry: Arc<StepRegistry>) -> Self {
        match dialect {
            Dialect::Native => Self::Native(NativeConfig::new(registry)),
            Dialect::Compatible => Self::Compatible(TravisConfig::new(registry)),
        }
    }

    /// Email settings; the native dialect has none
    #[must_use]
    pub fn email(&self) -> Option<&EmailNotification> {
        match self {
            Self::Native(_) => None,
            Self::Compatible(c) => Some(c.email()),
        }
    }

    /// IRC settings; the native dialect has none
    #[must_use]
    pub fn irc(&self) -> Option<&IrcNotification> {
        match self {
            Self::Native(_) => None,
            Self::Compatible(c) => Some(c.irc()),
        }
    }

    fn parser(&self) -> &dyn ConfigParser {
        match self {
            Self::Native(c) => c,
            Self::Compatible(c) => c,
        }
    }

    fn parser_mut(&mut self) -> &mut dyn ConfigParser {
        match self {
            Self::Native(c) => c,
            Self::Compatible(c) => c,
        }
    }
}

impl ConfigParser for LoadedConfig {
    fn parse(&mut self, text: &str) -> ConfigResult<()> {
        self.parser_mut().parse(text)
    }

    fn filter(&mut self, criteria: &[FilterCriterion]) {
        self.parser_mut().filter(criteria);
    }

    fn tasks(&self, environment: &Environment) -> Vec<Task> {
        self.parser().tasks(environment)
    }

    fn can_build_branch(&self, branch: &str) -> bool {
        self.parser().can_build_branch(branch)
    }

    fn dialect(&self) -> Dialect {
        self.parser().dialect()
    }

    fn platform(&self) -> Option<&str> {
        self.parser().platform()
    }

    fn language(&self) -> Option<&str> {
        self.parser().language()
    }

    fn stages(&self) -> &[Stage] {
        self.parser().stages()
    }

    fn matrix(&self) -> &[MatrixEntry] {
        self.parser().matrix()
    }

    fn global_env(&self) -> &Environment {
        self.parser().global_env()
    }
}

/// Reads and parses one descriptor file, picking the dialect from its name.
///
/// # Errors
///
/// I/O failures and every parse error.
pub fn load_file(path: &Path, registry: Arc<StepRegistry>) -> ConfigResult<LoadedConfig> {
    let dialect = Dialect::from_filename(path);
    tracing::debug!(path = %path.display(), %dialect, "loading descriptor");
    let text = std::fs::read_to_string(path)?;
    let mut config = LoadedConfig::empty(dialect, registry);
    config.parse(&text)?;
    Ok(config)
}

/// First candidate from `settings.descriptor_files` present in `dir`
#[must_use]
pub fn find_descriptor(dir: &Path, settings: &Settings) -> Option<PathBuf> {
    settings
        .descriptor_files
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Loads the first descriptor found in `dir`.
///
/// # Errors
///
/// [`ConfigError::DescriptorNotFound`] when no candidate exists, otherwise
/// any error from [`load_file`].
pub fn load_descriptor(
    dir: &Path,
    settings: &Settings,
    registry: Arc<StepRegistry>,
) -> ConfigResult<LoadedConfig> {
    let path = find_descriptor(dir, settings).ok_or_else(|| ConfigError::DescriptorNotFound {
        dir: dir.display().to_string(),
    })?;
    load_file(&path, registry)
}
