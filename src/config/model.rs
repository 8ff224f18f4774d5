// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::DispatchOrder;

/// Top-level build description as read from a TOML file.
///
/// ```toml
/// [config]
/// dispatch_order = "first"
///
/// [task.generate.properties]
/// out = { output = "build/gen" }
///
/// [task.compile]
/// after = ["lint"]
/// [task.compile.properties]
/// sources = { output_of = "generate" }
/// ```
///
/// This is the unchecked form; convert it with `ConfigFile::try_from` to get
/// a validated [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A build description that passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Skip validation. Only the validator and tests should need this.
    pub fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.task.keys().map(String::as_str)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Which end of the ready queue the scheduler polls.
    #[serde(default)]
    pub dispatch_order: DispatchOrder,

    /// Abort planning when walking any task reports validation problems.
    #[serde(default)]
    pub fail_on_diagnostics: bool,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Explicit dependencies: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Free-form text shown in plan output.
    #[serde(default)]
    pub description: Option<String>,

    /// The task's configuration, walked to discover implicit dependencies.
    #[serde(default)]
    pub properties: toml::Table,
}
