#![allow(dead_code)]

use std::collections::BTreeMap;

use buildplan::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use buildplan::types::DispatchOrder;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn dispatch_order(mut self, order: DispatchOrder) -> Self {
        self.config.config.dispatch_order = order;
        self
    }

    pub fn fail_on_diagnostics(mut self, val: bool) -> Self {
        self.config.config.fail_on_diagnostics = val;
        self
    }

    /// The unvalidated config, for tests of validation itself.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.description = Some(text.to_string());
        self
    }

    /// Any TOML value under `properties.<key>`.
    pub fn property(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.task.properties.insert(key.to_string(), value.into());
        self
    }

    /// `<key> = { output = "<path>" }`
    pub fn output(self, key: &str, path: &str) -> Self {
        self.property(key, reference("output", path))
    }

    /// `<key> = { output_of = "<task>" }`
    pub fn output_of(self, key: &str, task: &str) -> Self {
        self.property(key, reference("output_of", task))
    }

    /// `<key> = { value_of = "<task>" }`
    pub fn value_of(self, key: &str, task: &str) -> Self {
        self.property(key, reference("value_of", task))
    }

    pub fn nested(self, key: &str, table: toml::Table) -> Self {
        self.property(key, toml::Value::Table(table))
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn reference(key: &str, target: &str) -> toml::Value {
    let mut table = toml::Table::new();
    table.insert(key.to_string(), toml::Value::String(target.to_string()));
    toml::Value::Table(table)
}
