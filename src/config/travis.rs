//! Compatible dialect (`.travis.yml` / `.bbtravis.yml`)
//!
//! Reads the subset of the Travis CI format that maps onto a build matrix:
//! `language`, the language version axis, `env`, `matrix`, the six script
//! stages, `branches` and `notifications`.

use super::branches::{BranchRule, can_build_branch};
use super::errors::{ConfigError, ConfigResult};
use super::filter::FilterCriterion;
use super::helpers::{parse_env_string, root_mapping, scalar, stage_commands, string_list};
use super::matrix::{MatrixRules, VersionAxis, expand, filter_matrix};
use super::notifications::{EmailNotification, IrcNotification};
use super::preprocess::{Node, Preprocessor};
use super::steps::StepRegistry;
use super::tasks::stage_tasks;
use super::types::{Environment, MatrixEntry, Stage, Task};
use super::{ConfigParser, Dialect};
use indexmap::IndexMap;
use std::sync::Arc;

/// Stage names of the compatible dialect, in execution order
pub const TRAVIS_STAGES: [&str; 6] = [
    "before_install",
    "install",
    "after_install",
    "before_script",
    "script",
    "after_script",
];

/// Parsed compatible-dialect descriptor
#[derive(Debug, Clone)]
pub struct TravisConfig {
    registry: Arc<StepRegistry>,
    language: Option<String>,
    label_mapping: Node,
    environments: Vec<Environment>,
    global_env: Environment,
    matrix: Vec<MatrixEntry>,
    stages: Vec<Stage>,
    branches: Option<BranchRule>,
    email: EmailNotification,
    irc: IrcNotification,
}

impl Default for TravisConfig {
    fn default() -> Self {
        Self::new(Arc::new(StepRegistry::new()))
    }
}

impl TravisConfig {
    /// Creates an unparsed config that resolves step tags with `registry`
    #[must_use]
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self {
            registry,
            language: None,
            label_mapping: Node::Mapping(IndexMap::new()),
            environments: vec![Environment::new()],
            global_env: Environment::new(),
            matrix: vec![MatrixEntry::default()],
            stages: Vec::new(),
            branches: None,
            email: EmailNotification::default(),
            irc: IrcNotification::default(),
        }
    }

    /// `label_mapping`, passed through untouched
    #[must_use]
    pub fn label_mapping(&self) -> &Node {
        &self.label_mapping
    }

    /// Environments parsed from `env`, before crossing with versions
    #[must_use]
    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    /// Branch rule, if the descriptor declared one
    #[must_use]
    pub fn branches(&self) -> Option<&BranchRule> {
        self.branches.as_ref()
    }

    /// Email notification settings
    #[must_use]
    pub fn email(&self) -> &EmailNotification {
        &self.email
    }

    /// IRC notification settings
    #[must_use]
    pub fn irc(&self) -> &IrcNotification {
        &self.irc
    }

    fn parse_envs(&mut self, env: Option<&Node>) -> ConfigResult<()> {
        self.global_env = Environment::new();
        self.environments = match env {
            None | Some(Node::Null) => vec![Environment::new()],
            Some(Node::Sequence(items)) => items
                .iter()
                .map(|item| parse_env_string(&scalar(item, "env")?, None))
                .collect::<ConfigResult<_>>()?,
            Some(Node::Mapping(map)) => {
                for line in string_list(map.get("global"), "env.global")? {
                    let parsed = parse_env_string(&line, None)?;
                    self.global_env.merge(&parsed);
                }
                let lines = match map.get("matrix") {
                    None | Some(Node::Null) => vec![String::new()],
                    Some(Node::Sequence(items)) => items
                        .iter()
                        .map(|item| scalar(item, "env.matrix"))
                        .collect::<ConfigResult<_>>()?,
                    Some(other) => {
                        return Err(ConfigError::invalid(
                            "env.matrix",
                            format!("expected a list, found {}", other.kind()),
                        ));
                    }
                };
                lines
                    .iter()
                    .map(|line| parse_env_string(line, Some(&self.global_env)))
                    .collect::<ConfigResult<_>>()?
            }
            Some(other) => match other.scalar_text() {
                Some(line) => vec![parse_env_string(&line, None)?],
                None => {
                    return Err(ConfigError::invalid(
                        "env",
                        format!("expected a string, a list or a mapping, found {}", other.kind()),
                    ));
                }
            },
        };
        tracing::debug!(
            environments = self.environments.len(),
            global = self.global_env.len(),
            "environments parsed"
        );
        Ok(())
    }

    fn parse_matrix(&mut self, root: &IndexMap<String, Node>) -> ConfigResult<()> {
        let language = self.language.as_deref().unwrap_or_default();
        let axis = VersionAxis::for_language(language);
        let versions = axis.versions(root.get(axis.key))?;
        let rules = MatrixRules::parse(root.get("matrix"), &self.global_env)?;
        self.matrix = expand(axis.key, &versions, &self.environments, &rules);
        Ok(())
    }

    fn parse_stages(&mut self, root: &IndexMap<String, Node>) -> ConfigResult<()> {
        self.stages = TRAVIS_STAGES
            .iter()
            .map(|name| Ok(Stage::script(*name, stage_commands(root.get(*name), name)?)))
            .collect::<ConfigResult<_>>()?;
        Ok(())
    }

    fn parse_notifications(&mut self, root: &IndexMap<String, Node>) -> ConfigResult<()> {
        let notifications = root.get("notifications").filter(|n| !n.is_null());
        if let Some(node) = notifications {
            if node.as_mapping().is_none() {
                return Err(ConfigError::invalid(
                    "notifications",
                    format!("expected a mapping, found {}", node.kind()),
                ));
            }
        }
        self.email = EmailNotification::parse(notifications.and_then(|n| n.get("email")))?;
        self.irc = IrcNotification::parse(notifications.and_then(|n| n.get("irc")))?;
        Ok(())
    }
}

impl ConfigParser for TravisConfig {
    fn parse(&mut self, text: &str) -> ConfigResult<()> {
        let root = root_mapping(Preprocessor::new(&self.registry).parse_str(text)?)?;
        tracing::debug!(dialect = %Dialect::Compatible, "parsing descriptor");

        let language = root.get("language").ok_or_else(|| ConfigError::missing("language"))?;
        self.language = Some(scalar(language, "language")?);
        self.label_mapping = root
            .get("label_mapping")
            .cloned()
            .unwrap_or_else(|| Node::Mapping(IndexMap::new()));

        self.parse_envs(root.get("env"))?;
        self.parse_matrix(&root)?;
        self.parse_stages(&root)?;
        self.branches = BranchRule::parse(root.get("branches"))?;
        self.parse_notifications(&root)?;

        tracing::debug!(
            language = self.language.as_deref().unwrap_or_default(),
            matrix = self.matrix.len(),
            "compatible descriptor parsed"
        );
        Ok(())
    }

    fn filter(&mut self, criteria: &[FilterCriterion]) {
        let before = self.matrix.len();
        filter_matrix(&mut self.matrix, criteria);
        tracing::debug!(before, after = self.matrix.len(), "matrix filtered");
    }

    fn tasks(&self, environment: &Environment) -> Vec<Task> {
        stage_tasks(&self.stages, environment)
    }

    fn can_build_branch(&self, branch: &str) -> bool {
        can_build_branch(self.branches.as_ref(), branch)
    }

    fn dialect(&self) -> Dialect {
        Dialect::Compatible
    }

    fn platform(&self) -> Option<&str> {
        None
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn matrix(&self) -> &[MatrixEntry] {
        &self.matrix
    }

    fn global_env(&self) -> &Environment {
        &self.global_env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::filter::FilterOp;
    use crate::config::notifications::NotificationPolicy;
    use pretty_assertions::assert_eq;

    fn parsed(text: &str) -> TravisConfig {
        let mut config = TravisConfig::default();
        config.parse(text).unwrap();
        config
    }

    fn rendered(config: &TravisConfig) -> Vec<String> {
        config.matrix().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_missing_language() {
        let mut config = TravisConfig::default();
        let err = config.parse("python: [\"3.6\"]\n").unwrap_err();
        assert_eq!(err, ConfigError::missing("language"));
    }

    #[test]
    fn test_default_version_axis() {
        let config = parsed("language: python\n");
        assert_eq!(rendered(&config), vec!["python=python2.6"]);
    }

    #[test]
    fn test_two_versions_one_empty_env() {
        let config = parsed("language: python\npython: [\"2.7\", \"3.6\"]\n");
        assert_eq!(config.matrix().len(), 2);
    }

    #[test]
    fn test_numeric_versions_render_as_written() {
        let config = parsed("language: python\npython: [2.7, 3.6]\n");
        assert_eq!(rendered(&config), vec!["python=2.7", "python=3.6"]);
    }

    #[test]
    fn test_language_specific_axis() {
        let config = parsed("language: ruby\nrvm: [\"3.2\", \"3.3\"]\n");
        assert_eq!(rendered(&config), vec!["rvm=3.2", "rvm=3.3"]);
    }

    #[test]
    fn test_env_single_string() {
        let config = parsed("language: python\npython: \"3.6\"\nenv: A=1 B=2\n");
        assert_eq!(rendered(&config), vec!["python=3.6 A=1 B=2"]);
    }

    #[test]
    fn test_env_list() {
        let config = parsed("language: python\npython: \"3.6\"\nenv:\n  - A=1\n  - A=2\n");
        assert_eq!(rendered(&config), vec!["python=3.6 A=1", "python=3.6 A=2"]);
    }

    #[test]
    fn test_env_global_and_matrix() {
        let config = parsed(
            "language: python\npython: \"3.6\"\nenv:\n  global:\n    - G=1 A=0\n    - H=2\n  matrix:\n    - A=1\n    - B=2\n",
        );
        assert_eq!(config.global_env().to_string(), "G=1 A=0 H=2");
        assert_eq!(
            rendered(&config),
            vec!["python=3.6 G=1 A=1 H=2", "python=3.6 G=1 A=0 H=2 B=2"]
        );
    }

    #[test]
    fn test_env_global_string_without_matrix() {
        let config = parsed("language: python\npython: \"3.6\"\nenv:\n  global: G=1\n");
        assert_eq!(rendered(&config), vec!["python=3.6 G=1"]);
    }

    #[test]
    fn test_env_invalid_shape() {
        let mut config = TravisConfig::default();
        let err = config.parse("language: python\nenv:\n  - [A=1]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }

    #[test]
    fn test_matrix_exclude_and_include() {
        let config = parsed(
            r#"
language: python
python: ["2.7", "3.6"]
env:
  - A=1 B=x
  - A=2
matrix:
  exclude:
    - env: A=1
  include:
    - python: "3.6"
      env: A=2
"#,
        );
        assert_eq!(
            rendered(&config),
            vec!["python=2.7 A=2", "python=3.6 A=2", "python=3.6 A=2"]
        );
    }

    #[test]
    fn test_matrix_exclude_by_version() {
        let config = parsed(
            "language: python\npython: [\"2.7\", \"3.6\"]\nenv: [A=1, A=2]\nmatrix:\n  exclude:\n    - python: \"2.7\"\n",
        );
        assert_eq!(rendered(&config), vec!["python=3.6 A=1", "python=3.6 A=2"]);
    }

    #[test]
    fn test_include_uses_global_env() {
        let config = parsed(
            "language: python\npython: \"3.6\"\nenv:\n  global: G=1\nmatrix:\n  include:\n    - python: \"3.7\"\n      env: X=1\n",
        );
        assert_eq!(rendered(&config)[1], "python=3.7 G=1 X=1");
    }

    #[test]
    fn test_matrix_exclude_must_be_list() {
        let mut config = TravisConfig::default();
        let err = config.parse("language: python\nmatrix:\n  exclude: A=1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "matrix.exclude"));
    }

    #[test]
    fn test_filter() {
        let mut config = parsed("language: python\npython: \"3.6\"\nenv: [A=1, A=2, B=3]\n");
        config.filter(&[]);
        assert_eq!(config.matrix().len(), 3);
        config.filter(&[FilterCriterion::new("A", FilterOp::Eq, "1")]);
        assert_eq!(rendered(&config), vec!["python=3.6 A=1"]);
    }

    #[test]
    fn test_stages_string_or_list() {
        let config = parsed("language: python\ninstall: pip install -e .\nscript:\n  - pytest\n  - flake8\n");
        let names: Vec<&str> = config.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, TRAVIS_STAGES.to_vec());
        assert_eq!(config.stages()[1].tasks, vec!["pip install -e ."]);
        assert_eq!(config.stages()[4].tasks, vec!["pytest", "flake8"]);
    }

    #[test]
    fn test_stage_invalid_shape() {
        let mut config = TravisConfig::default();
        let err = config.parse("language: python\nscript:\n  run: pytest\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "script"));
    }

    #[test]
    fn test_stage_null_or_scalar_rejected() {
        for text in ["language: python\nscript:\n", "language: python\nscript: 5\n", "language: python\nscript: true\n"] {
            let mut config = TravisConfig::default();
            let err = config.parse(text).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "script"));
        }
    }

    #[test]
    fn test_include_only_matrix() {
        let config = parsed(
            "language: python\npython: []\nmatrix:\n  include:\n    - python: \"3.6\"\n      env: A=1\n",
        );
        assert_eq!(rendered(&config), vec!["python=3.6 A=1"]);
    }

    #[test]
    fn test_env_comment_word_rejected() {
        let mut config = TravisConfig::default();
        let err = config
            .parse("language: python\nenv: 'A=1 #B=2 W=C:\\tools'\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "env"));
    }

    #[test]
    fn test_task_list() {
        let config = parsed("language: python\nscript: [pytest]\n");
        let tasks = config.tasks(&Environment::new());
        assert_eq!(tasks.len(), 7);
        assert_eq!(tasks[0].name, "before_install update");
        assert_eq!(tasks[5].name, "script step 0");
        assert_eq!(tasks[5].command, "pytest");
        assert_eq!(tasks[6].name, "after_script update");
    }

    #[test]
    fn test_branches() {
        let config = parsed("language: python\nbranches:\n  only: [main, /^release-/]\n");
        assert!(config.can_build_branch("main"));
        assert!(config.can_build_branch("release-2"));
        assert!(!config.can_build_branch("develop"));
    }

    #[test]
    fn test_notifications_defaults() {
        let config = parsed("language: python\n");
        assert!(!config.email().enabled);
        assert!(!config.irc().enabled);
        assert!(config.irc().join);
    }

    #[test]
    fn test_notifications_parsed() {
        let config = parsed(
            "language: python\nnotifications:\n  email: [\"a@x.com\"]\n  irc:\n    channels: [\"irc.example.org#ci\"]\n    skip_join: true\n",
        );
        assert!(config.email().enabled);
        assert_eq!(config.email().addresses, vec!["a@x.com"]);
        assert_eq!(config.email().on_success, NotificationPolicy::Change);
        assert!(config.irc().enabled);
        assert!(!config.irc().join);
    }

    #[test]
    fn test_notifications_invalid_policy() {
        let mut config = TravisConfig::default();
        let err = config
            .parse("language: python\nnotifications:\n  email:\n    on_failure: maybe\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }

    #[test]
    fn test_label_mapping_passthrough() {
        let config = parsed("language: python\nlabel_mapping:\n  TRAVIS_PYTHON_VERSION: python\n");
        assert_eq!(
            config.label_mapping().get("TRAVIS_PYTHON_VERSION").and_then(Node::as_str),
            Some("python")
        );
        assert!(parsed("language: python\n").label_mapping().as_mapping().is_some_and(IndexMap::is_empty));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "language: python\npython: [\"2.7\", \"3.6\"]\nenv:\n  global: G=1\n  matrix: [A=1, A=2]\n";
        assert_eq!(parsed(text).matrix(), parsed(text).matrix());
    }
}
