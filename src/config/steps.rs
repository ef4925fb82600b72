//! Step registry for named custom tags
//!
//! Hosts populate a [`StepRegistry`] with constructors keyed by tag name before
//! any descriptor is parsed. The preprocessor only ever reads from it.

use super::preprocess::Node;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A step value built from a custom tag
pub trait CustomStep: fmt::Debug + Send + Sync {
    /// Get the name of this step
    fn name(&self) -> &str;

    /// Get the description of this step
    fn description(&self) -> &str;

    /// The shell line this step contributes to a stage script
    fn command(&self) -> String;
}

/// Error raised by a step constructor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StepError(pub String);

/// Arguments handed to a step constructor, shaped after the tagged node.
#[derive(Debug, Clone)]
pub enum StepArgs {
    /// The node was a scalar
    Scalar(String),
    /// The node was a sequence of positional arguments
    Positional(Vec<Node>),
    /// The node was a mapping of keyword arguments
    Keyword(IndexMap<String, Node>),
}

impl StepArgs {
    /// Short name of the argument shape, for error messages
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Positional(_) => "sequence",
            Self::Keyword(_) => "mapping",
        }
    }
}

/// Builds a step from tag arguments
pub trait StepConstructor: Send + Sync {
    /// Construct the step, or explain why the arguments are unusable
    fn construct(&self, args: &StepArgs) -> Result<Arc<dyn CustomStep>, StepError>;
}

impl<F> StepConstructor for F
where
    F: Fn(&StepArgs) -> Result<Arc<dyn CustomStep>, StepError> + Send + Sync,
{
    fn construct(&self, args: &StepArgs) -> Result<Arc<dyn CustomStep>, StepError> {
        (self)(args)
    }
}

/// Registry of step constructors, keyed by tag name (without `!`)
#[derive(Clone, Default)]
pub struct StepRegistry {
    constructors: HashMap<String, Arc<dyn StepConstructor>>,
}

impl StepRegistry {
    /// Creates a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in `ShellCommand` and `Echo` steps
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("ShellCommand", ShellStep::construct);
        registry.register("Echo", EchoStep::construct);
        registry
    }

    /// Registers a constructor under a tag name, replacing any previous one
    pub fn register<C: StepConstructor + 'static>(&mut self, name: impl Into<String>, ctor: C) {
        self.constructors.insert(name.into(), Arc::new(ctor));
    }

    /// Gets a constructor by tag name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn StepConstructor>> {
        self.constructors.get(name).cloned()
    }

    /// Checks if a constructor exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Gets all registered tag names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("constructors", &self.names())
            .finish()
    }
}

fn text_arg(node: &Node, what: &str) -> Result<String, StepError> {
    node.scalar_text()
        .ok_or_else(|| StepError(format!("{what} must be a scalar, found {}", node.kind())))
}

/// A step that runs a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellStep {
    command: String,
    description: String,
}

impl ShellStep {
    /// Creates a new shell step
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            description: format!("Runs shell command: {command}"),
            command,
        }
    }

    /// Constructor registered as `!ShellCommand`.
    ///
    /// Accepts a command line, an argv sequence (quoted and joined), or a
    /// mapping with a `command` key holding either of those.
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] when no command can be extracted.
    pub fn construct(args: &StepArgs) -> Result<Arc<dyn CustomStep>, StepError> {
        let command = match args {
            StepArgs::Scalar(command) => command.clone(),
            StepArgs::Positional(argv) => join_argv(argv)?,
            StepArgs::Keyword(kwargs) => match kwargs.get("command") {
                Some(Node::Sequence(argv)) => join_argv(argv)?,
                Some(node) => text_arg(node, "command")?,
                None => return Err(StepError("missing keyword argument 'command'".to_string())),
            },
        };
        if command.trim().is_empty() {
            return Err(StepError("command cannot be empty".to_string()));
        }
        Ok(Arc::new(Self::new(command)))
    }
}

fn join_argv(argv: &[Node]) -> Result<String, StepError> {
    let words = argv
        .iter()
        .map(|n| text_arg(n, "argument"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shell_words::join(words))
}

impl CustomStep for ShellStep {
    fn name(&self) -> &str {
        "ShellCommand"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn command(&self) -> String {
        self.command.clone()
    }
}

/// A step that prints a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoStep {
    message: String,
}

impl EchoStep {
    /// Creates a new echo step
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Constructor registered as `!Echo`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] for sequences or mappings without `message`.
    pub fn construct(args: &StepArgs) -> Result<Arc<dyn CustomStep>, StepError> {
        let message = match args {
            StepArgs::Scalar(message) => message.clone(),
            StepArgs::Keyword(kwargs) => match kwargs.get("message") {
                Some(node) => text_arg(node, "message")?,
                None => return Err(StepError("missing keyword argument 'message'".to_string())),
            },
            StepArgs::Positional(_) => {
                return Err(StepError("Echo takes a single message".to_string()));
            }
        };
        Ok(Arc::new(Self::new(message)))
    }
}

impl CustomStep for EchoStep {
    fn name(&self) -> &str {
        "Echo"
    }

    fn description(&self) -> &str {
        &self.message
    }

    fn command(&self) -> String {
        format!("echo {}", shell_words::quote(&self.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = StepRegistry::new();
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_registry_builtins() {
        let registry = StepRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["Echo", "ShellCommand"]);
        assert!(registry.contains("ShellCommand"));
        assert!(!registry.contains("nonexistent"));
    }

    #[test]
    fn test_registry_closure_constructor() {
        let mut registry = StepRegistry::new();
        registry.register("Make", |args: &StepArgs| -> Result<Arc<dyn CustomStep>, StepError> {
            match args {
                StepArgs::Scalar(target) => Ok(Arc::new(ShellStep::new(format!("make {target}")))),
                other => Err(StepError(format!("unexpected {}", other.shape()))),
            }
        });

        let ctor = registry.get("Make").unwrap();
        let step = ctor.construct(&StepArgs::Scalar("all".to_string())).unwrap();
        assert_eq!(step.command(), "make all");
        assert!(ctor.construct(&StepArgs::Positional(vec![])).is_err());
    }

    #[test]
    fn test_shell_step_shapes() {
        let step = ShellStep::construct(&StepArgs::Scalar("make test".to_string())).unwrap();
        assert_eq!(step.command(), "make test");
        assert_eq!(step.name(), "ShellCommand");
        assert_eq!(step.description(), "Runs shell command: make test");

        let argv = vec![Node::String("echo".to_string()), Node::String("a b".to_string())];
        let step = ShellStep::construct(&StepArgs::Positional(argv)).unwrap();
        assert_eq!(step.command(), "echo 'a b'");

        let mut kwargs = IndexMap::new();
        kwargs.insert("command".to_string(), Node::String("tox".to_string()));
        let step = ShellStep::construct(&StepArgs::Keyword(kwargs)).unwrap();
        assert_eq!(step.command(), "tox");
    }

    #[test]
    fn test_shell_step_missing_command() {
        let err = ShellStep::construct(&StepArgs::Keyword(IndexMap::new())).unwrap_err();
        assert!(err.to_string().contains("command"));
    }

    #[test]
    fn test_echo_step() {
        let step = EchoStep::construct(&StepArgs::Scalar("build done".to_string())).unwrap();
        assert_eq!(step.name(), "Echo");
        assert_eq!(step.command(), "echo 'build done'");
    }
}
