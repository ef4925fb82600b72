//! Prelude module for common imports

// Re-export the parser contract and both dialects
pub use crate::config::loader::{LoadedConfig, load_descriptor, load_file};
pub use crate::config::native::NativeConfig;
pub use crate::config::travis::TravisConfig;
pub use crate::config::{ConfigParser, Dialect};

// Re-export value types
pub use crate::config::errors::{ConfigError, ConfigResult};
pub use crate::config::filter::{FilterCriterion, FilterOp, parse_filters};
pub use crate::config::steps::{CustomStep, StepArgs, StepError, StepRegistry};
pub use crate::config::types::{Environment, MatrixEntry, Stage, Task};

// Re-export planning and settings
pub use crate::infrastructure::Settings;
pub use crate::plan::{JobPlan, Plan};
