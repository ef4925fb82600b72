//! Descriptor preprocessing
//!
//! Turns raw YAML into a [`Node`] tree with every custom tag resolved:
//!
//! - `!Interpolate` / `!i` wrap a scalar into a deferred [`Interpolate`]
//!   placeholder. The template text is kept verbatim; substitution happens at
//!   execution time, outside this crate.
//! - Any other tag is looked up in the [`StepRegistry`]. The tagged node is
//!   offered to the constructor as a scalar, then as positional arguments,
//!   then as keyword arguments, and the first shape that fits the node wins.

use super::errors::{ConfigError, ConfigResult};
use super::steps::{CustomStep, StepArgs, StepRegistry};
use indexmap::IndexMap;
use serde_yaml::Value;
use serde_yaml::value::TaggedValue;
use std::fmt;
use std::sync::Arc;

/// Tag names that produce an [`Interpolate`] placeholder
pub const INTERPOLATION_TAGS: &[&str] = &["Interpolate", "i"];

/// A string whose `%(prop:...)s` style references are resolved later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolate {
    template: String,
}

impl Interpolate {
    /// Wraps a template
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The template text, exactly as written
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for Interpolate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Which argument shape a step was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepShape {
    /// Single scalar argument
    Scalar,
    /// Positional arguments
    Sequence,
    /// Keyword arguments
    Mapping,
}

/// A step built from a registry tag
#[derive(Debug, Clone)]
pub struct StepValue {
    /// Tag name without `!`
    pub tag: String,
    /// Shape the arguments were taken from
    pub shape: StepShape,
    /// The constructed step
    pub step: Arc<dyn CustomStep>,
}

/// A preprocessed descriptor node
#[derive(Debug, Clone)]
pub enum Node {
    /// `~` or an empty value
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar
    Number(serde_yaml::Number),
    /// String scalar
    String(String),
    /// Sequence
    Sequence(Vec<Node>),
    /// Mapping with keys rendered as strings
    Mapping(IndexMap<String, Node>),
    /// Deferred interpolation
    Interpolate(Interpolate),
    /// Registry-built step
    Step(StepValue),
}

impl Node {
    /// Short name of the node kind, for error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::Interpolate(_) => "interpolation",
            Self::Step(_) => "step",
        }
    }

    /// Looks up a key if this node is a mapping
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Self::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Returns the string if this node is a plain string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this node is one
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the map if this node is a mapping
    #[must_use]
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns true for `~`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Scalar rendered as text. Interpolations render as their template.
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Interpolate(i) => Some(i.template().to_string()),
            _ => None,
        }
    }

    /// Text of a script line: scalars, interpolations, or a step's command.
    #[must_use]
    pub fn command_text(&self) -> Option<String> {
        match self {
            Self::Step(step) => Some(step.step.command()),
            other => other.scalar_text(),
        }
    }

    /// Truthiness as descriptor authors expect it: null, `false`, zero and
    /// empty strings or collections are all "off".
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::String(s) => !s.is_empty(),
            Self::Sequence(items) => !items.is_empty(),
            Self::Mapping(map) => !map.is_empty(),
            Self::Interpolate(_) | Self::Step(_) => true,
        }
    }
}

/// Resolves custom tags against a step registry
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor<'a> {
    registry: &'a StepRegistry,
}

impl<'a> Preprocessor<'a> {
    /// Creates a preprocessor reading from `registry`
    #[must_use]
    pub fn new(registry: &'a StepRegistry) -> Self {
        Self { registry }
    }

    /// Parses descriptor text and resolves every tag in it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidYaml`] for malformed text, otherwise any error
    /// from [`Preprocessor::resolve`].
    pub fn parse_str(&self, text: &str) -> ConfigResult<Node> {
        let value: Value = serde_yaml::from_str(text)?;
        self.resolve(value)
    }

    /// Converts a YAML value into a [`Node`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::TagResolutionFailed`] for unknown tags or step arguments
    /// that fit no shape, [`ConfigError::InvalidField`] for non-scalar mapping keys.
    pub fn resolve(&self, value: Value) -> ConfigResult<Node> {
        Ok(match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Sequence(items) => Node::Sequence(
                items
                    .into_iter()
                    .map(|v| self.resolve(v))
                    .collect::<ConfigResult<_>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(mapping_key(k)?, self.resolve(v)?);
                }
                Node::Mapping(out)
            }
            Value::Tagged(tagged) => self.resolve_tagged(*tagged)?,
        })
    }

    fn resolve_tagged(&self, tagged: TaggedValue) -> ConfigResult<Node> {
        let tag = tagged.tag.to_string();
        let tag = tag.trim_start_matches('!').to_string();

        if INTERPOLATION_TAGS.contains(&tag.as_str()) {
            return match scalar_value_text(&tagged.value) {
                Some(template) => Ok(Node::Interpolate(Interpolate::new(template))),
                None => Err(ConfigError::TagResolutionFailed {
                    reason: format!("expected a scalar, found {}", value_kind(&tagged.value)),
                    tag,
                }),
            };
        }

        let Some(ctor) = self.registry.get(&tag) else {
            return Err(ConfigError::TagResolutionFailed {
                tag,
                reason: "no step is registered under this name".to_string(),
            });
        };

        let (shape, args) = self.step_args(&tag, tagged.value)?;
        tracing::trace!(tag = %tag, shape = args.shape(), "constructing step");
        let step = ctor
            .construct(&args)
            .map_err(|e| ConfigError::TagResolutionFailed {
                tag: tag.clone(),
                reason: e.to_string(),
            })?;
        tracing::trace!(
            tag = %tag,
            step = step.name(),
            description = step.description(),
            "step constructed"
        );

        Ok(Node::Step(StepValue { tag, shape, step }))
    }

    /// Picks the first argument shape the node structurally fits.
    fn step_args(&self, tag: &str, value: Value) -> ConfigResult<(StepShape, StepArgs)> {
        let mut failures = Vec::with_capacity(3);

        match scalar_value_text(&value) {
            Some(text) => return Ok((StepShape::Scalar, StepArgs::Scalar(text))),
            None => failures.push(format!(
                "as scalar: expected a scalar, found {}",
                value_kind(&value)
            )),
        }

        let value = match value {
            Value::Sequence(items) => {
                let args = items
                    .into_iter()
                    .map(|v| self.resolve(v))
                    .collect::<ConfigResult<Vec<_>>>()?;
                return Ok((StepShape::Sequence, StepArgs::Positional(args)));
            }
            other => {
                failures.push(format!(
                    "as sequence: expected a sequence, found {}",
                    value_kind(&other)
                ));
                other
            }
        };

        match value {
            Value::Mapping(map) => {
                if let Some(bad) = map.keys().find(|k| !matches!(k, Value::String(_))) {
                    failures.push(format!(
                        "as mapping: keyword names must be strings, found {}",
                        value_kind(bad)
                    ));
                } else {
                    let mut kwargs = IndexMap::with_capacity(map.len());
                    for (k, v) in map {
                        if let Value::String(name) = k {
                            kwargs.insert(name, self.resolve(v)?);
                        }
                    }
                    return Ok((StepShape::Mapping, StepArgs::Keyword(kwargs)));
                }
            }
            other => failures.push(format!(
                "as mapping: expected a mapping, found {}",
                value_kind(&other)
            )),
        }

        Err(ConfigError::TagResolutionFailed {
            tag: tag.to_string(),
            reason: format!("could not parse step arguments: {}", failures.join("; ")),
        })
    }
}

fn scalar_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn mapping_key(key: Value) -> ConfigResult<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(ConfigError::invalid(
            "<mapping key>",
            format!("keys must be scalars, found {}", value_kind(&other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::steps::{ShellStep, StepError};

    fn parse(text: &str) -> ConfigResult<Node> {
        let registry = StepRegistry::with_builtins();
        Preprocessor::new(&registry).parse_str(text)
    }

    #[test]
    fn test_plain_tree() {
        let node = parse("a: 1\nb: [x, true]\nc: ~\n").unwrap();
        assert_eq!(node.get("a").unwrap().scalar_text().as_deref(), Some("1"));
        match node.get("b").unwrap() {
            Node::Sequence(items) => {
                assert_eq!(items[0].as_str(), Some("x"));
                assert_eq!(items[1].as_bool(), Some(true));
            }
            other => panic!("expected sequence, got {}", other.kind()),
        }
        assert!(node.get("c").unwrap().is_null());
    }

    #[test]
    fn test_mapping_keeps_order() {
        let node = parse("z: 1\na: 2\nm: 3\n").unwrap();
        let keys: Vec<&str> = node.as_mapping().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_interpolate_tags() {
        let node = parse("a: !Interpolate \"%(prop:branch)s\"\nb: !i \"build-%(prop:buildnumber)s\"\n")
            .unwrap();
        match node.get("a").unwrap() {
            Node::Interpolate(i) => assert_eq!(i.template(), "%(prop:branch)s"),
            other => panic!("expected interpolation, got {}", other.kind()),
        }
        assert_eq!(
            node.get("b").unwrap().scalar_text().as_deref(),
            Some("build-%(prop:buildnumber)s")
        );
    }

    #[test]
    fn test_interpolate_rejects_sequence() {
        let err = parse("a: !i [1, 2]\n").unwrap_err();
        assert!(matches!(err, ConfigError::TagResolutionFailed { ref tag, .. } if tag == "i"));
    }

    #[test]
    fn test_step_from_scalar() {
        let node = parse("- !ShellCommand make test\n").unwrap();
        let Node::Sequence(items) = node else { panic!("expected sequence") };
        match &items[0] {
            Node::Step(step) => {
                assert_eq!(step.tag, "ShellCommand");
                assert_eq!(step.shape, StepShape::Scalar);
                assert_eq!(step.step.command(), "make test");
            }
            other => panic!("expected step, got {}", other.kind()),
        }
    }

    #[test]
    fn test_step_from_sequence_and_mapping() {
        let node = parse("a: !ShellCommand [ls, -la]\nb: !ShellCommand {command: tox}\n").unwrap();
        let Some(Node::Step(a)) = node.get("a") else { panic!("expected step") };
        assert_eq!(a.shape, StepShape::Sequence);
        assert_eq!(a.step.command(), "ls -la");
        let Some(Node::Step(b)) = node.get("b") else { panic!("expected step") };
        assert_eq!(b.shape, StepShape::Mapping);
        assert_eq!(b.step.command(), "tox");
    }

    #[test]
    fn test_step_shape_match_not_first_success() {
        // A mapping fails the scalar and sequence shapes, then the constructor
        // error for the mapping shape is what surfaces.
        let err = parse("a: !ShellCommand {other: x}\n").unwrap_err();
        match err {
            ConfigError::TagResolutionFailed { tag, reason } => {
                assert_eq!(tag, "ShellCommand");
                assert!(reason.contains("command"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_step_aggregated_failure() {
        let err = parse("a: !ShellCommand {[1]: x}\n").unwrap_err();
        match err {
            ConfigError::TagResolutionFailed { reason, .. } => {
                assert!(reason.contains("as scalar"));
                assert!(reason.contains("as sequence"));
                assert!(reason.contains("as mapping"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = parse("a: !Nope x\n").unwrap_err();
        assert!(matches!(err, ConfigError::TagResolutionFailed { ref tag, .. } if tag == "Nope"));
    }

    #[test]
    fn test_host_registered_constructor() {
        let mut registry = StepRegistry::new();
        registry.register("Tox", |args: &StepArgs| -> Result<Arc<dyn CustomStep>, StepError> {
            match args {
                StepArgs::Scalar(env) => Ok(Arc::new(ShellStep::new(format!("tox -e {env}")))),
                other => Err(StepError(format!("unsupported {}", other.shape()))),
            }
        });
        let node = Preprocessor::new(&registry).parse_str("- !Tox py36\n").unwrap();
        let Node::Sequence(items) = node else { panic!("expected sequence") };
        assert_eq!(items[0].command_text().as_deref(), Some("tox -e py36"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = parse("a: [1, 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYaml(_)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Node::Null.is_truthy());
        assert!(!Node::Bool(false).is_truthy());
        assert!(!Node::String(String::new()).is_truthy());
        assert!(!Node::Sequence(vec![]).is_truthy());
        assert!(Node::String("x".to_string()).is_truthy());
    }
}
