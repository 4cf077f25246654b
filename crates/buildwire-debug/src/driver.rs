//! Replays a [`BuildScript`] as lifecycle callbacks.

#![allow(missing_docs)]

use buildwire_report::{
    BuildEvent, BuildFailure, BuildListener, Priority, Project, SourceLocation, Target, Task,
};
use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, info};

use crate::error::DebugError;
use crate::script::{BuildScript, ScriptMessage, ScriptTarget, ScriptTask};

/// Logged once every selected target ran without a failure.
pub const BUILD_SUCCESSFUL: &str = "BUILD SUCCESSFUL";

/// Result of one replay.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub project: Project,
    /// The replay stopped before running every task.
    pub halted: bool,
    pub tasks_run: usize,
}

/// Feeds a script's targets, tasks and messages to a listener in build
/// order. Nothing is executed.
#[derive(Debug, Clone)]
pub struct BuildDriver {
    script: BuildScript,
    selected: Vec<usize>,
    defines: IndexMap<SmolStr, SmolStr>,
    output_level: Priority,
}

impl BuildDriver {
    /// Driver for the script's default target, or every target when the
    /// script names no default.
    #[must_use]
    pub fn new(script: BuildScript) -> Self {
        let selected = match script.default.as_deref().and_then(|name| script.target(name)) {
            Some(index) => vec![index],
            None => (0..script.targets.len()).collect(),
        };
        Self {
            script,
            selected,
            defines: IndexMap::new(),
            output_level: Priority::Info,
        }
    }

    /// Run `names` in the given order instead. An empty list keeps the
    /// default selection.
    pub fn with_targets<I, S>(mut self, names: I) -> Result<Self, DebugError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected = Vec::new();
        for name in names {
            let name = name.as_ref();
            let index = self.script.target(name).ok_or_else(|| {
                DebugError::InvalidScript(
                    format!("target '{name}' does not exist in this project").into(),
                )
            })?;
            selected.push(index);
        }
        if !selected.is_empty() {
            self.selected = selected;
        }
        Ok(self)
    }

    /// User property set once the build has started. It overrides a script
    /// property of the same name.
    #[must_use]
    pub fn define(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    /// Priority of the closing success message.
    #[must_use]
    pub fn with_output_level(mut self, level: Priority) -> Self {
        self.output_level = level;
        self
    }

    #[must_use]
    pub fn script(&self) -> &BuildScript {
        &self.script
    }

    /// Names of the targets a replay runs, in run order.
    #[must_use]
    pub fn selected_targets(&self) -> Vec<&str> {
        self.selected
            .iter()
            .map(|&index| self.script.targets[index].name.as_str())
            .collect()
    }

    /// Project populated with the script's properties, in script order.
    #[must_use]
    pub fn project(&self) -> Project {
        let project = Project::new(self.script.name.as_str());
        for (name, value) in &self.script.properties {
            project.set_property(name.clone(), value.clone());
        }
        project
    }

    /// Replay the selected targets. `halted` is polled before each target
    /// and task and ends the replay early; `build_finished` is still
    /// delivered.
    pub fn run<L, F>(&self, listener: &mut L, halted: F) -> ReplayOutcome
    where
        L: BuildListener,
        F: Fn(&L) -> bool,
    {
        let project = self.project();
        let mut outcome = ReplayOutcome {
            project: project.clone(),
            halted: false,
            tasks_run: 0,
        };
        info!(build = %project.name(), targets = self.selected.len(), "replaying build");

        listener.build_started(&BuildEvent::build(&project));
        self.apply_defines(&project);
        'targets: for &index in &self.selected {
            let script_target = &self.script.targets[index];
            if halted(listener) {
                outcome.halted = true;
                break;
            }
            let target = target_of(script_target);
            listener.target_started(&BuildEvent::target(&project, target.clone()));
            for message in &script_target.messages {
                listener.message_logged(&message_event(
                    BuildEvent::target(&project, target.clone()),
                    message,
                ));
            }
            for script_task in &script_target.tasks {
                if halted(listener) {
                    outcome.halted = true;
                    break 'targets;
                }
                let task = task_of(script_task, &target.name);
                listener.task_started(&BuildEvent::task(&project, task.clone()));
                for message in &script_task.messages {
                    listener.message_logged(&message_event(
                        BuildEvent::task(&project, task.clone()),
                        message,
                    ));
                }
                listener.task_finished(&BuildEvent::task(&project, task));
                outcome.tasks_run += 1;
            }
            listener.target_finished(&BuildEvent::target(&project, target));
        }

        let mut finished = BuildEvent::build(&project);
        match &self.script.failure {
            Some(failure) => {
                finished = finished.with_failure(BuildFailure::Failed(failure.clone()));
            }
            None if !outcome.halted => listener.message_logged(
                &BuildEvent::build(&project).with_message(BUILD_SUCCESSFUL, self.output_level),
            ),
            None => {}
        }
        listener.build_finished(&finished);
        debug!(tasks = outcome.tasks_run, halted = outcome.halted, "replay done");
        outcome
    }

    /// Describe the project instead of building it: the description, the
    /// default target, then main targets (those with a description) and
    /// subtargets. No lifecycle callback is delivered.
    pub fn project_help<L: BuildListener>(&self, listener: &mut L) -> Project {
        let project = self.project();
        self.apply_defines(&project);
        let log = |listener: &mut L, text: &str, priority: Priority| {
            listener.message_logged(&BuildEvent::build(&project).with_message(text, priority));
        };
        log(listener, "", Priority::ProjectHelp);
        if let Some(description) = &self.script.description {
            log(listener, description.as_str(), Priority::Info);
        }
        for section in self.target_listing() {
            log(listener, section.as_str(), Priority::Info);
        }
        project
    }

    fn apply_defines(&self, project: &Project) {
        for (name, value) in &self.defines {
            project.set_property(name.clone(), value.clone());
        }
    }

    fn target_listing(&self) -> Vec<String> {
        let mut main: Vec<(&str, &str)> = Vec::new();
        let mut sub: Vec<&str> = Vec::new();
        for target in &self.script.targets {
            match &target.description {
                Some(description) => main.push((target.name.as_str(), description.as_str())),
                None => sub.push(target.name.as_str()),
            }
        }
        main.sort_unstable();
        sub.sort_unstable();
        let width = main.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

        let mut sections = Vec::with_capacity(3);
        if let Some(default) = self.script.default.as_deref().filter(|name| !name.is_empty()) {
            let description = main
                .iter()
                .find(|(name, _)| *name == default)
                .map(|&(_, description)| description);
            sections.push(listing("Default target:", &[(default, description)], width));
        }
        let main: Vec<_> = main
            .into_iter()
            .map(|(name, description)| (name, Some(description)))
            .collect();
        sections.push(listing("Main targets:", &main, width));
        let sub: Vec<_> = sub.into_iter().map(|name| (name, None)).collect();
        sections.push(listing("Subtargets:", &sub, 0));
        sections
    }
}

/// Parse a `NAME=VALUE` user property, with or without a leading `-D`.
/// The value is trimmed. Text without a value yields `None`.
#[must_use]
pub fn parse_define(text: &str) -> Option<(SmolStr, SmolStr)> {
    let text = text.strip_prefix("-D").unwrap_or(text);
    match text.find('=') {
        Some(0) => Some((SmolStr::default(), SmolStr::new(&text[1..]))),
        Some(index) if index + 1 < text.len() => Some((
            SmolStr::new(&text[..index]),
            SmolStr::new(text[index + 1..].trim()),
        )),
        _ => None,
    }
}

fn listing(heading: &str, entries: &[(&str, Option<&str>)], width: usize) -> String {
    let mut text = format!("{heading}\n\n");
    for (name, description) in entries {
        match description {
            Some(description) => {
                text.push_str(&format!(" {name:<pad$}{description}\n", pad = width + 2));
            }
            None => text.push_str(&format!(" {name}\n")),
        }
    }
    text
}

fn location(file: Option<&String>, line: Option<u32>) -> Option<SourceLocation> {
    match (file, line) {
        (None, None) => None,
        (file, line) => Some(SourceLocation::new(
            file.map_or_else(SmolStr::default, SmolStr::from),
            line.unwrap_or_default(),
        )),
    }
}

fn target_of(script: &ScriptTarget) -> Target {
    let target = Target::new(script.name.as_str());
    match location(script.file.as_ref(), script.line) {
        Some(location) => target.at(location),
        None => target,
    }
}

fn task_of(script: &ScriptTask, target: &str) -> Task {
    let task = Task::new(script.name.as_str()).in_target(target);
    match location(script.file.as_ref(), script.line) {
        Some(location) => task.at(location),
        None => task,
    }
}

fn message_event(event: BuildEvent, message: &ScriptMessage) -> BuildEvent {
    event.with_message(message.text.as_str(), message.priority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    /// Listener that records callback names.
    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
        stop_after: Option<usize>,
    }

    impl Trace {
        fn push(&mut self, call: String) {
            self.calls.push(call);
        }
    }

    impl BuildListener for Trace {
        fn build_started(&mut self, event: &BuildEvent) {
            self.push(format!("build_started {}", event.project.name()));
        }

        fn build_finished(&mut self, event: &BuildEvent) {
            self.push(format!("build_finished {:?}", event.failure));
        }

        fn target_started(&mut self, event: &BuildEvent) {
            let name = event.target_ref().map(|target| target.name.clone());
            self.push(format!("target_started {}", name.unwrap_or_default()));
        }

        fn target_finished(&mut self, _event: &BuildEvent) {
            self.push("target_finished".to_string());
        }

        fn task_started(&mut self, event: &BuildEvent) {
            let Some(task) = event.task_ref() else { return };
            match &task.location {
                Some(location) => self.push(format!("task_started {} {location}", task.name)),
                None => self.push(format!("task_started {}", task.name)),
            }
        }

        fn task_finished(&mut self, _event: &BuildEvent) {
            self.push("task_finished".to_string());
        }

        fn message_logged(&mut self, event: &BuildEvent) {
            self.push(format!(
                "message {:?} {}",
                event.priority,
                event.message.as_deref().unwrap_or_default()
            ));
        }
    }

    fn script() -> BuildScript {
        BuildScript::from_toml_str(
            r#"
name = "demo"
failure = "boom"

[properties]
"a" = "1"

[[targets]]
name = "init"
messages = [{ text = "Preparing" }]

[[targets]]
name = "compile"

[[targets.tasks]]
name = "javac"
file = "build.xml"
line = 12
messages = [{ priority = "warn", text = "deprecated" }]

[[targets.tasks]]
name = "jar"
"#,
        )
        .unwrap()
    }

    #[test]
    fn replays_in_build_order() {
        let mut trace = Trace::default();
        let outcome = BuildDriver::new(script()).run(&mut trace, |_| false);
        assert!(!outcome.halted);
        assert_eq!(outcome.tasks_run, 2);
        assert_eq!(outcome.project.property("a").as_deref(), Some("1"));
        expect![[r#"
            build_started demo
            target_started init
            message Info Preparing
            target_finished
            target_started compile
            task_started javac build.xml:12
            message Warn deprecated
            task_finished
            task_started jar
            task_finished
            target_finished
            build_finished Some(Failed("boom"))"#]]
        .assert_eq(&trace.calls.join("\n"));
    }

    #[test]
    fn halting_skips_the_rest_but_finishes_the_build() {
        let mut trace = Trace {
            stop_after: Some(5),
            ..Trace::default()
        };
        let outcome = BuildDriver::new(script()).run(&mut trace, |trace| {
            trace
                .stop_after
                .is_some_and(|limit| trace.calls.len() >= limit)
        });
        assert!(outcome.halted);
        assert_eq!(outcome.tasks_run, 0);
        assert_eq!(
            trace.calls.last().map(String::as_str),
            Some("build_finished Some(Failed(\"boom\"))")
        );
        assert!(!trace.calls.iter().any(|call| call.starts_with("task_started")));
    }

    fn help_script() -> BuildScript {
        BuildScript::from_toml_str(
            r#"
name = "demo"
description = "Demo build"
default = "dist"

[properties]
"mode" = "slow"

[[targets]]
name = "init"

[[targets]]
name = "dist"
description = "Package everything"

[[targets.tasks]]
name = "jar"

[[targets]]
name = "compile"
description = "Compile sources"

[[targets.tasks]]
name = "javac"
"#,
        )
        .unwrap()
    }

    #[test]
    fn default_target_runs_when_none_is_named() {
        let mut trace = Trace::default();
        let driver = BuildDriver::new(help_script());
        assert_eq!(driver.selected_targets(), vec!["dist"]);
        let outcome = driver.run(&mut trace, |_| false);
        assert_eq!(outcome.tasks_run, 1);
        expect![[r#"
            build_started demo
            target_started dist
            task_started jar
            task_finished
            target_finished
            message Info BUILD SUCCESSFUL
            build_finished None"#]]
        .assert_eq(&trace.calls.join("\n"));
    }

    #[test]
    fn named_targets_run_in_the_given_order() {
        let driver = BuildDriver::new(help_script())
            .with_targets(["compile", "init"])
            .unwrap()
            .with_output_level(Priority::Verbose);
        assert_eq!(driver.selected_targets(), vec!["compile", "init"]);
        let mut trace = Trace::default();
        driver.run(&mut trace, |_| false);
        let started: Vec<_> = trace
            .calls
            .iter()
            .filter(|call| call.starts_with("target_started"))
            .collect();
        assert_eq!(started, ["target_started compile", "target_started init"]);
        assert_eq!(
            trace.calls[trace.calls.len() - 2],
            "message Verbose BUILD SUCCESSFUL"
        );
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = BuildDriver::new(help_script())
            .with_targets(["deploy"])
            .unwrap_err();
        assert!(err.to_string().contains("'deploy'"), "{err}");
        let driver = BuildDriver::new(help_script())
            .with_targets(Vec::<String>::new())
            .unwrap();
        assert_eq!(driver.selected_targets(), vec!["dist"]);
    }

    /// Records a property's value as each build starts.
    struct PropertyAtStart(&'static str, Vec<Option<SmolStr>>);

    impl BuildListener for PropertyAtStart {
        fn build_started(&mut self, event: &BuildEvent) {
            self.1.push(event.project.property(self.0));
        }
        fn build_finished(&mut self, _event: &BuildEvent) {}
        fn target_started(&mut self, _event: &BuildEvent) {}
        fn message_logged(&mut self, _event: &BuildEvent) {}
    }

    #[test]
    fn defines_apply_after_the_build_starts() {
        let driver = BuildDriver::new(help_script())
            .define("mode", "fast")
            .define("extra", "1");
        let mut listener = PropertyAtStart("mode", Vec::new());
        let outcome = driver.run(&mut listener, |_| false);
        assert_eq!(listener.1, vec![Some(SmolStr::new("slow"))]);
        assert_eq!(outcome.project.property("mode").as_deref(), Some("fast"));
        assert_eq!(outcome.project.property("extra").as_deref(), Some("1"));
    }

    #[test]
    fn halted_replay_is_not_reported_successful() {
        let mut trace = Trace::default();
        BuildDriver::new(help_script()).run(&mut trace, |_| true);
        assert!(!trace.calls.iter().any(|call| call.contains(BUILD_SUCCESSFUL)));
        assert_eq!(trace.calls.last().map(String::as_str), Some("build_finished None"));
    }

    #[test]
    fn project_help_lists_targets_without_building() {
        let mut trace = Trace::default();
        let project = BuildDriver::new(help_script())
            .define("mode", "fast")
            .project_help(&mut trace);
        assert_eq!(project.property("mode").as_deref(), Some("fast"));
        assert_eq!(trace.calls[0], "message ProjectHelp ");
        expect![[r#"
            message Info Demo build
            message Info Default target:

             dist     Package everything

            message Info Main targets:

             compile  Compile sources
             dist     Package everything

            message Info Subtargets:

             init
            "#]]
        .assert_eq(&trace.calls[1..].join("\n"));
    }

    #[test]
    fn parse_define_splits_at_the_first_equals() {
        assert_eq!(
            parse_define("-Dout.dir= build "),
            Some((SmolStr::new("out.dir"), SmolStr::new("build")))
        );
        assert_eq!(
            parse_define("a=b=c"),
            Some((SmolStr::new("a"), SmolStr::new("b=c")))
        );
        assert_eq!(
            parse_define("=value"),
            Some((SmolStr::default(), SmolStr::new("value")))
        );
        assert_eq!(parse_define("-Dflag"), None);
        assert_eq!(parse_define("flag="), None);
    }
}
