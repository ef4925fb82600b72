//! Task list generation
//!
//! Each stage expands, in order, into repository setup, one package index
//! update, a single package install and then its script lines.

use super::types::{Environment, Stage, Task};

const APT_UPDATE: &str = "sudo apt-get update";
const ADD_REPOSITORY: &str = "sudo DEBIAN_FRONTEND=noninteractive add-apt-repository";
const APT_INSTALL: &str = "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y";

/// Repository setup tasks followed by the index update. The update is always
/// emitted, even for a stage without sources.
#[must_use]
pub fn source_tasks(stage: &Stage) -> Vec<Task> {
    stage
        .sources
        .iter()
        .map(|source| {
            Task::new(
                format!("{} setup repo {source}", stage.name),
                format!("{ADD_REPOSITORY} {source}"),
            )
        })
        .chain(std::iter::once(Task::new(format!("{} update", stage.name), APT_UPDATE)))
        .collect()
}

/// One install task for all packages, or nothing.
#[must_use]
pub fn package_tasks(stage: &Stage) -> Vec<Task> {
    if stage.packages.is_empty() {
        return Vec::new();
    }
    vec![Task::new(
        format!("{} install packages", stage.name),
        format!("{APT_INSTALL} {}", stage.packages.join(" ")),
    )]
}

/// One task per script line, labelled with its index within the stage.
#[must_use]
pub fn script_tasks(stage: &Stage) -> Vec<Task> {
    stage
        .tasks
        .iter()
        .enumerate()
        .map(|(i, command)| Task::new(format!("{} step {i}", stage.name), command.as_str()))
        .collect()
}

/// All tasks of all stages, in stage order.
#[must_use]
pub fn stage_tasks(stages: &[Stage], environment: &Environment) -> Vec<Task> {
    let tasks: Vec<Task> = stages
        .iter()
        .flat_map(|stage| {
            source_tasks(stage)
                .into_iter()
                .chain(package_tasks(stage))
                .chain(script_tasks(stage))
        })
        .collect();
    tracing::trace!(environment = %environment, tasks = tasks.len(), "task list generated");
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_update_only_without_sources() {
        let stage = Stage::script("base", vec![]);
        let tasks = source_tasks(&stage);
        assert_eq!(tasks, vec![Task::new("base update", "sudo apt-get update")]);
    }

    #[test]
    fn test_sources_then_update() {
        let stage = Stage {
            name: "build".to_string(),
            sources: vec!["ppa:deadsnakes/ppa".to_string(), "universe".to_string()],
            packages: vec![],
            tasks: vec![],
        };
        let tasks = source_tasks(&stage);
        assert_eq!(
            names(&tasks),
            vec!["build setup repo ppa:deadsnakes/ppa", "build setup repo universe", "build update"]
        );
        assert_eq!(
            tasks[0].command,
            "sudo DEBIAN_FRONTEND=noninteractive add-apt-repository ppa:deadsnakes/ppa"
        );
    }

    #[test]
    fn test_single_install_task() {
        let stage = Stage {
            name: "test".to_string(),
            sources: vec![],
            packages: vec!["libssl-dev".to_string(), "cmake".to_string()],
            tasks: vec![],
        };
        let tasks = package_tasks(&stage);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "test install packages");
        assert_eq!(
            tasks[0].command,
            "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y libssl-dev cmake"
        );
        assert!(package_tasks(&Stage::script("test", vec![])).is_empty());
    }

    #[test]
    fn test_script_tasks_indexed_per_stage() {
        let stage = Stage::script("package", vec!["make".to_string(), "make dist".to_string()]);
        let tasks = script_tasks(&stage);
        assert_eq!(names(&tasks), vec!["package step 0", "package step 1"]);
        assert_eq!(tasks[1].command, "make dist");
    }

    #[test]
    fn test_stage_order_preserved() {
        let stages = vec![
            Stage {
                name: "base".to_string(),
                sources: vec![],
                packages: vec!["git".to_string()],
                tasks: vec!["echo base".to_string()],
            },
            Stage::script("build", vec!["make".to_string()]),
        ];
        let tasks = stage_tasks(&stages, &Environment::new());
        assert_eq!(
            names(&tasks),
            vec!["base update", "base install packages", "base step 0", "build update", "build step 0"]
        );
    }
}
