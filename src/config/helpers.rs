//! Helpers shared by both dialects
//!
//! Environment tokenizing, matrix entry building and the small shape coercions the
//! descriptor grammar allows (a single string where a list is expected).

use super::errors::{ConfigError, ConfigResult};
use super::preprocess::Node;
use super::types::{Environment, MatrixEntry};
use indexmap::IndexMap;

/// Tokenizes `"K=V K2=V2"` into an environment laid over `global`.
///
/// Tokens are split with shell rules, so `NAME="two words"` is one token.
/// Entries in `env` override `global` on key collision.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] for unbalanced quotes, a token without `=`,
/// or an unquoted word starting with `#`.
pub fn parse_env_string(env: &str, global: Option<&Environment>) -> ConfigResult<Environment> {
    let mut props = global.cloned().unwrap_or_default();
    if env.trim().is_empty() {
        return Ok(props);
    }

    if let Some(comment) = unquoted_comment(env) {
        return Err(ConfigError::invalid(
            "env",
            format!("'{comment}' in '{env}' would be dropped as a shell comment"),
        ));
    }

    let tokens = shell_words::split(env)
        .map_err(|e| ConfigError::invalid("env", format!("cannot tokenize '{env}': {e}")))?;
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            return Err(ConfigError::invalid(
                "env",
                format!("expected KEY=VALUE, found '{token}'"),
            ));
        };
        props.insert(key, value);
    }
    Ok(props)
}

/// The tail of `text` from the first `#` that opens a word outside quotes.
fn unquoted_comment(text: &str) -> Option<&str> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut word_start = true;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            word_start = false;
            continue;
        }
        match (quote, c) {
            (None | Some('"'), '\\') => escaped = true,
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '#') if word_start => return Some(&text[i..]),
            _ => {}
        }
        word_start = quote.is_none() && matches!(c, ' ' | '\t' | '\n');
    }
    None
}

/// Text of a scalar node, or an `InvalidField` naming `field`.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] when `node` is not a scalar.
pub fn scalar(node: &Node, field: &str) -> ConfigResult<String> {
    node.scalar_text()
        .ok_or_else(|| ConfigError::invalid(field, format!("expected a scalar, found {}", node.kind())))
}

/// Accepts a single string or a list of strings. Absent or null yields an empty list.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] for any other shape.
pub fn string_list(node: Option<&Node>, field: &str) -> ConfigResult<Vec<String>> {
    match node {
        None | Some(Node::Null) => Ok(Vec::new()),
        Some(Node::Sequence(items)) => items.iter().map(|item| scalar(item, field)).collect(),
        Some(other) => match other.scalar_text() {
            Some(text) => Ok(vec![text]),
            None => Err(ConfigError::invalid(
                field,
                format!("expected a string or a list, found {}", other.kind()),
            )),
        },
    }
}

/// Like [`string_list`] but also accepts step values, rendered as their command.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] for mappings, nested lists or nulls in the list.
pub fn command_list(node: Option<&Node>, field: &str) -> ConfigResult<Vec<String>> {
    let command = |item: &Node| {
        item.command_text().ok_or_else(|| {
            ConfigError::invalid(field, format!("expected a command, found {}", item.kind()))
        })
    };
    match node {
        None | Some(Node::Null) => Ok(Vec::new()),
        Some(Node::Sequence(items)) => items.iter().map(command).collect(),
        Some(other @ Node::Mapping(_)) => Err(ConfigError::invalid(
            field,
            format!("expected a string or a list, found {}", other.kind()),
        )),
        Some(other) => Ok(vec![command(other)?]),
    }
}

/// Stricter [`command_list`] for fields that must be a string or a list when
/// present. Only an absent field yields an empty list.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] for null, numbers, booleans and mappings.
pub fn stage_commands(node: Option<&Node>, field: &str) -> ConfigResult<Vec<String>> {
    match node {
        None => Ok(Vec::new()),
        Some(Node::String(_) | Node::Interpolate(_) | Node::Step(_) | Node::Sequence(_)) => {
            command_list(node, field)
        }
        Some(other) => Err(ConfigError::invalid(
            field,
            format!("expected a string or a list, found {}", other.kind()),
        )),
    }
}

/// The descriptor root as a mapping; an empty document is an empty mapping.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] when the root is a list or a scalar.
pub fn root_mapping(node: Node) -> ConfigResult<IndexMap<String, Node>> {
    match node {
        Node::Mapping(map) => Ok(map),
        Node::Null => Ok(IndexMap::new()),
        other => Err(ConfigError::invalid(
            "<root>",
            format!("expected a mapping, found {}", other.kind()),
        )),
    }
}

/// Builds a matrix entry from an `exclude`/`include` item.
///
/// Every key other than `env` becomes an axis value. `env` may be a token
/// string (tokenized over `global`), a mapping (laid over `global`) or absent.
///
/// # Errors
///
/// [`ConfigError::InvalidField`] for non-mapping items or non-scalar values.
pub fn entry_from_node(
    node: &Node,
    global: Option<&Environment>,
    field: &str,
) -> ConfigResult<MatrixEntry> {
    let Some(map) = node.as_mapping() else {
        return Err(ConfigError::invalid(field, format!("expected a mapping, found {}", node.kind())));
    };

    let mut entry = MatrixEntry::default();
    for (key, value) in map {
        if key == "env" {
            continue;
        }
        entry.fields.insert(key.clone(), scalar(value, &format!("{field}.{key}"))?);
    }

    entry.env = match map.get("env") {
        None | Some(Node::Null) => parse_env_string("", global)?,
        Some(Node::Mapping(nested)) => {
            let mut env = global.cloned().unwrap_or_default();
            for (k, v) in nested {
                env.insert(k.as_str(), scalar(v, &format!("{field}.env.{k}"))?);
            }
            env
        }
        Some(other) => parse_env_string(&scalar(other, &format!("{field}.env"))?, global)?,
    };
    Ok(entry)
}
