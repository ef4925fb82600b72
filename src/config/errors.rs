//! Error types for descriptor parsing

use thiserror::Error;

/// Result type used throughout the configuration engine
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or parsing a job descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The descriptor text is not valid YAML
    #[error("Invalid YAML data: {0}")]
    InvalidYaml(String),

    /// A required top-level field is absent
    #[error("'{field}' parameter is missing")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A field is present but has the wrong shape or value
    #[error("'{field}' parameter is invalid: {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A custom tag could not be turned into a value
    #[error("Could not resolve tag '!{tag}': {reason}")]
    TagResolutionFailed {
        /// Tag name without the leading `!`.
        tag: String,
        /// Aggregated failure message.
        reason: String,
    },

    /// A matrix filter expression could not be parsed
    #[error("{0} is not a correct filter")]
    InvalidFilter(String),

    /// None of the candidate descriptor files exist
    #[error("No descriptor found in {dir}")]
    DescriptorNotFound {
        /// Directory that was searched.
        dir: String,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::MissingField`].
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Shorthand for [`ConfigError::InvalidField`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the errors that mean the descriptor itself is invalid.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            Self::InvalidYaml(_)
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
                | Self::TagResolutionFailed { .. }
        )
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::InvalidYaml(err.to_string())
    }
}
