//! Notification settings for the compatible dialect
//!
//! Parses `notifications.email` and `notifications.irc`.

use super::errors::{ConfigError, ConfigResult};
use super::helpers::string_list;
use super::preprocess::Node;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// When to notify for a given build outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPolicy {
    /// Every time
    Always,
    /// Never
    Never,
    /// Only when the outcome differs from the previous build
    Change,
}

impl FromStr for NotificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "change" => Ok(Self::Change),
            other => Err(format!("Invalid value '{other}'")),
        }
    }
}

impl fmt::Display for NotificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
            Self::Change => write!(f, "change"),
        }
    }
}

fn policy(settings: &Node, key: &str, current: NotificationPolicy, field: &str) -> ConfigResult<NotificationPolicy> {
    let field = format!("{field}.{key}");
    match settings.get(key) {
        None => Ok(current),
        Some(node) => {
            let text = node.scalar_text().unwrap_or_else(|| node.kind().to_string());
            text.parse().map_err(|reason: String| ConfigError::invalid(field, reason))
        }
    }
}

/// `notifications.email`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailNotification {
    /// Whether email is sent at all
    pub enabled: bool,
    /// Recipient addresses
    pub addresses: Vec<String>,
    /// Policy after a successful build
    pub on_success: NotificationPolicy,
    /// Policy after a failed build
    pub on_failure: NotificationPolicy,
}

impl Default for EmailNotification {
    fn default() -> Self {
        Self {
            enabled: true,
            addresses: Vec::new(),
            on_success: NotificationPolicy::Change,
            on_failure: NotificationPolicy::Always,
        }
    }
}

impl EmailNotification {
    /// Parses the block. Absent or `false` disables email and keeps the defaults;
    /// a bare list is taken as the recipients.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidField`] for other shapes or unknown policies.
    pub fn parse(settings: Option<&Node>) -> ConfigResult<Self> {
        let mut email = Self::default();
        let Some(settings) = settings.filter(|n| n.is_truthy()) else {
            email.enabled = false;
            return Ok(email);
        };

        match settings {
            Node::Sequence(_) => {
                email.addresses = string_list(Some(settings), "notifications.email")?;
            }
            Node::Mapping(_) => {
                if let Some(recipients) = settings.get("recipients") {
                    email.addresses = string_list(Some(recipients), "notifications.email.recipients")?;
                }
                email.on_success = policy(settings, "on_success", email.on_success, "notifications.email")?;
                email.on_failure = policy(settings, "on_failure", email.on_failure, "notifications.email")?;
            }
            other => {
                return Err(ConfigError::invalid(
                    "notifications.email",
                    format!("expected false, a list of addresses or a mapping, found {}", other.kind()),
                ));
            }
        }
        Ok(email)
    }
}

/// `notifications.irc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrcNotification {
    /// Whether chat notifications are sent
    pub enabled: bool,
    /// Target channels
    pub channels: Vec<String>,
    /// Message template lines
    pub template: Vec<String>,
    /// Policy after a successful build
    pub on_success: NotificationPolicy,
    /// Policy after a failed build
    pub on_failure: NotificationPolicy,
    /// Send NOTICE instead of PRIVMSG
    pub use_notice: bool,
    /// Join the channel before posting
    pub join: bool,
}

impl Default for IrcNotification {
    fn default() -> Self {
        Self {
            enabled: false,
            channels: Vec::new(),
            template: Vec::new(),
            on_success: NotificationPolicy::Change,
            on_failure: NotificationPolicy::Always,
            use_notice: false,
            join: true,
        }
    }
}

impl IrcNotification {
    /// Parses the block. Absent or `false` leaves it disabled with defaults.
    /// A bare string or list is read as the channel list; `true` enables it
    /// with no channels.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidField`] for bad shapes or unknown policies.
    pub fn parse(settings: Option<&Node>) -> ConfigResult<Self> {
        let mut irc = Self::default();
        let Some(settings) = settings.filter(|n| n.is_truthy()) else {
            return Ok(irc);
        };
        irc.enabled = true;

        match settings {
            Node::Mapping(_) => {}
            Node::String(_) | Node::Interpolate(_) | Node::Sequence(_) => {
                irc.channels = string_list(Some(settings), "notifications.irc")?;
                return Ok(irc);
            }
            _ => return Ok(irc),
        }

        irc.channels = string_list(settings.get("channels"), "notifications.irc.channels")?;
        irc.template = string_list(settings.get("template"), "notifications.irc.template")?;
        irc.use_notice = flag(settings, "use_notice", false)?;
        irc.join = !flag(settings, "skip_join", false)?;
        irc.on_success = policy(settings, "on_success", irc.on_success, "notifications.irc")?;
        irc.on_failure = policy(settings, "on_failure", irc.on_failure, "notifications.irc")?;
        Ok(irc)
    }
}

fn flag(settings: &Node, key: &str, default: bool) -> ConfigResult<bool> {
    match settings.get(key) {
        None | Some(Node::Null) => Ok(default),
        Some(node) => node.as_bool().ok_or_else(|| {
            ConfigError::invalid(
                format!("notifications.irc.{key}"),
                format!("expected a boolean, found {}", node.kind()),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::preprocess::Preprocessor;
    use crate::config::steps::StepRegistry;

    fn notifications(yaml: &str) -> Node {
        let registry = StepRegistry::new();
        Preprocessor::new(&registry).parse_str(yaml).unwrap()
    }

    #[test]
    fn test_email_absent_is_disabled() {
        let email = EmailNotification::parse(None).unwrap();
        assert!(!email.enabled);
        assert_eq!(email.on_success, NotificationPolicy::Change);
        assert_eq!(email.on_failure, NotificationPolicy::Always);
    }

    #[test]
    fn test_email_false_is_disabled() {
        let n = notifications("email: false\n");
        assert!(!EmailNotification::parse(n.get("email")).unwrap().enabled);
    }

    #[test]
    fn test_email_bare_list() {
        let n = notifications("email: [\"a@x.com\"]\n");
        let email = EmailNotification::parse(n.get("email")).unwrap();
        assert!(email.enabled);
        assert_eq!(email.addresses, vec!["a@x.com"]);
        assert_eq!(email.on_success, NotificationPolicy::Change);
        assert_eq!(email.on_failure, NotificationPolicy::Always);
    }

    #[test]
    fn test_email_mapping() {
        let n = notifications("email:\n  recipients: [b@y.org]\n  on_success: never\n  on_failure: change\n");
        let email = EmailNotification::parse(n.get("email")).unwrap();
        assert!(email.enabled);
        assert_eq!(email.addresses, vec!["b@y.org"]);
        assert_eq!(email.on_success, NotificationPolicy::Never);
        assert_eq!(email.on_failure, NotificationPolicy::Change);
    }

    #[test]
    fn test_email_invalid_policy() {
        let n = notifications("email:\n  on_success: sometimes\n");
        let err = EmailNotification::parse(n.get("email")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "notifications.email.on_success"));
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn test_email_true_rejected() {
        let n = notifications("email: true\n");
        assert!(EmailNotification::parse(n.get("email")).is_err());
    }

    #[test]
    fn test_irc_absent() {
        let irc = IrcNotification::parse(None).unwrap();
        assert!(!irc.enabled);
        assert!(irc.join);
        assert!(!irc.use_notice);
    }

    #[test]
    fn test_irc_skip_join() {
        let n = notifications("irc:\n  skip_join: true\n");
        let irc = IrcNotification::parse(n.get("irc")).unwrap();
        assert!(irc.enabled);
        assert!(!irc.join);
        assert!(irc.channels.is_empty());
        assert!(irc.template.is_empty());
    }

    #[test]
    fn test_irc_full_block() {
        let n = notifications(
            "irc:\n  channels: [\"irc.example.org#ci\"]\n  template: \"%{result}\"\n  use_notice: true\n  on_failure: never\n",
        );
        let irc = IrcNotification::parse(n.get("irc")).unwrap();
        assert_eq!(irc.channels, vec!["irc.example.org#ci"]);
        assert_eq!(irc.template, vec!["%{result}"]);
        assert!(irc.use_notice);
        assert!(irc.join);
        assert_eq!(irc.on_success, NotificationPolicy::Change);
        assert_eq!(irc.on_failure, NotificationPolicy::Never);
    }

    #[test]
    fn test_irc_bare_channel() {
        let n = notifications("irc: \"irc.example.org#ci\"\n");
        let irc = IrcNotification::parse(n.get("irc")).unwrap();
        assert!(irc.enabled);
        assert_eq!(irc.channels, vec!["irc.example.org#ci"]);
    }

    #[test]
    fn test_irc_true_has_no_channels() {
        let n = notifications("irc: true\n");
        let irc = IrcNotification::parse(n.get("irc")).unwrap();
        assert!(irc.enabled);
        assert!(irc.channels.is_empty());
    }

    #[test]
    fn test_irc_invalid_policy() {
        let n = notifications("irc:\n  on_success: loud\n");
        assert!(IrcNotification::parse(n.get("irc")).is_err());
    }
}
