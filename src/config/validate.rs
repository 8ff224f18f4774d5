// src/config/validate.rs

use crate::config::bean::{DEPRECATED_OUTPUT_OF_KEY, OUTPUT_OF_KEY, VALUE_OF_KEY};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::DagGraph;
use crate::errors::{BuildPlanError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildPlanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_artifact_references(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BuildPlanError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(BuildPlanError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(BuildPlanError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Every `output_of` / `value_of` string anywhere in a task's properties must
/// name a declared task.
///
/// Malformed references (non-string, empty) are left to the walker, which
/// reports them as diagnostics with a qualified property name.
fn validate_artifact_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let mut stack: Vec<&toml::Value> = task.properties.values().collect();

        while let Some(value) = stack.pop() {
            match value {
                toml::Value::Table(table) => {
                    for key in [OUTPUT_OF_KEY, VALUE_OF_KEY, DEPRECATED_OUTPUT_OF_KEY] {
                        if let Some(toml::Value::String(target)) = table.get(key) {
                            if !target.is_empty() && !cfg.task.contains_key(target) {
                                return Err(BuildPlanError::ConfigError(format!(
                                    "task '{}' references unknown task '{}' in `{}`",
                                    name, target, key
                                )));
                            }
                        }
                    }
                    stack.extend(table.values());
                }
                toml::Value::Array(items) => stack.extend(items.iter()),
                _ => {}
            }
        }
    }
    Ok(())
}

/// Only explicit `after` edges are checked here; discovered edges are checked
/// again once planning has walked every task.
fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let unchecked = ConfigFile::new_unchecked(cfg.config.clone(), cfg.task.clone());
    DagGraph::from_config(&unchecked).ensure_acyclic()
}
