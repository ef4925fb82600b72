//! Core value types for parsed descriptors
//!
//! These types carry no parsing behaviour; both dialects produce them and the
//! job planner consumes them.

#![allow(clippy::must_use_candidate)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A named build phase with its repository sources, packages and commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name, from the dialect's fixed vocabulary
    pub name: String,
    /// Apt repositories to add before the stage runs
    #[serde(default)]
    pub sources: Vec<String>,
    /// Packages to install
    #[serde(default)]
    pub packages: Vec<String>,
    /// Shell command lines
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl Stage {
    /// Creates a stage with only script lines.
    pub fn script(name: impl Into<String>, tasks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            packages: Vec::new(),
            tasks,
        }
    }
}

/// A ready-to-run shell line with a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Label shown to the user
    pub name: String,
    /// Command line to run
    pub command: String,
}

impl Task {
    /// Creates a task.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.command)
    }
}

/// Environment variables for one job.
///
/// Keys keep their insertion order so rendering is deterministic, but two
/// environments with the same pairs in a different order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Environment(IndexMap<String, String>);

impl Environment {
    /// Creates a new empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets a variable by name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true if the variable is set
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copies every variable of `other` into `self`; `other` wins on collision.
    pub fn merge(&mut self, other: &Environment) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    /// Iterates variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no variable is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `key=value` strings used for exclude matching.
    pub fn to_set(&self) -> BTreeSet<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Self::new();
        for (k, v) in iter {
            env.insert(k, v);
        }
        env
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// One combination of matrix axis values.
///
/// `fields` holds the axis values (`python`, `os`, ...); `env` the nested
/// environment. Semantics are defined by the [flattened](MatrixEntry::flatten) form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MatrixEntry {
    /// Axis values other than the environment
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
    /// Nested environment
    #[serde(default)]
    pub env: Environment,
}

impl MatrixEntry {
    /// Creates an entry from a single axis value and an environment.
    pub fn new(axis: impl Into<String>, value: impl Into<String>, env: Environment) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(axis.into(), value.into());
        Self { fields, env }
    }

    /// Adds an axis value.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Collapses `env` into the top level; env values overwrite axis values.
    pub fn flatten(&self) -> Environment {
        let mut flat: Environment = self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        flat.merge(&self.env);
        flat
    }

    /// The flattened `key=value` set.
    pub fn flattened_set(&self) -> BTreeSet<String> {
        self.flatten().to_set()
    }
}

impl fmt::Display for MatrixEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flatten())
    }
}
