// src/config/bean.rs

//! [`Bean`] implementation over the `properties` table of a task.
//!
//! Each TOML key becomes one property. Its kind tag is decided by the shape
//! of the value:
//!
//! | TOML value                       | kind           | declared                |
//! |----------------------------------|----------------|-------------------------|
//! | string, integer, float, bool     | `input`        | plain                   |
//! | array of scalars                 | `input-files`  | plain                   |
//! | `{ output = "path" }`            | `output-files` | plain                   |
//! | `{ output_of = "task" }`         | `input-files`  | buildable, configurable |
//! | `{ value_of = "task" }`          | `input`        | deferred, configurable  |
//! | array of `{ output = .. }`       | `output-files` | plain                   |
//! | array of `{ output_of = .. }`    | `input-files`  | buildable, configurable |
//! | array of `{ value_of = .. }`     | `input`        | deferred, configurable  |
//! | any other table, array of tables | `nested`       | plain                   |
//! | key starting with `_`            | `internal`     | plain                   |
//!
//! Values the table cannot express cleanly (datetimes, mixed arrays, broken
//! references) are reported as type-level validation problems and the key is
//! not declared as a property.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::errors::AccessorError;
use crate::property::deprecation::nag_deprecated;
use crate::property::{
    Bean, Buildable, Configurable, DeclaredType, DeferredValue, PropertyMetadata, TypeMetadata,
    Value,
};
use crate::walk::kinds;

pub const OUTPUT_KEY: &str = "output";
pub const OUTPUT_OF_KEY: &str = "output_of";
pub const VALUE_OF_KEY: &str = "value_of";
/// Older spelling of [`OUTPUT_OF_KEY`]; still accepted.
pub const DEPRECATED_OUTPUT_OF_KEY: &str = "from";

const DEPRECATED_FROM: &str = "`from` artifact references (use `output_of`)";

const ROOT_TYPE: &str = "TaskProperties";
const NESTED_TYPE: &str = "PropertyTable";

/// The properties of one task, or one table nested inside them.
///
/// Values are converted once, when the bean is built, so every read of a
/// property hands out the same artifacts and nested beans.
pub struct TableBean {
    task: String,
    /// Dot-joined path below the task's `properties` table; empty for the root.
    path: String,
    metadata: Arc<TypeMetadata>,
    values: BTreeMap<String, Slot>,
}

struct Slot {
    value: Value,
    deprecated: Option<&'static str>,
}

impl TableBean {
    /// The root bean for `task`.
    ///
    /// Nested tables are built before the tables containing them, from an
    /// explicit work list, so nesting depth is not bounded by the call stack.
    pub fn for_task(task: impl Into<String>, properties: &toml::Table) -> Arc<Self> {
        let task = task.into();
        let mut prepared = Prepared::new();
        for (table, path) in nested_tables(properties).into_iter().rev() {
            let bean = Self::build(&task, path, table, &prepared);
            prepared.insert(table as *const toml::Table, Arc::new(bean));
        }
        Arc::new(Self::build(&task, String::new(), properties, &prepared))
    }

    fn build(task: &str, path: String, table: &toml::Table, prepared: &Prepared) -> Self {
        let type_name = if path.is_empty() { ROOT_TYPE } else { NESTED_TYPE };
        let mut metadata = TypeMetadata::new(type_name);
        let mut values = BTreeMap::new();

        for (key, raw) in table.iter() {
            match classify(key, raw, prepared) {
                Ok(classified) => {
                    metadata.add_property(PropertyMetadata::new(
                        key.as_str(),
                        classified.kind,
                        classified.declared,
                    ));
                    if let Some(message) = classified.problem {
                        metadata.add_problem(key.as_str(), message);
                    }
                    values.insert(
                        key.clone(),
                        Slot {
                            value: classified.value,
                            deprecated: classified.deprecated,
                        },
                    );
                }
                Err(message) => metadata.add_problem(key.as_str(), message),
            }
        }

        Self {
            task: task.to_string(),
            path,
            metadata: Arc::new(metadata),
            values,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Bean for TableBean {
    fn type_metadata(&self) -> Arc<TypeMetadata> {
        Arc::clone(&self.metadata)
    }

    fn read_property(&self, accessor: &str) -> Result<Option<Value>, AccessorError> {
        let Some(slot) = self.values.get(accessor) else {
            return Err(AccessorError::Invocation(format!(
                "no property named '{accessor}'"
            )));
        };

        if let Some(feature) = slot.deprecated {
            nag_deprecated(feature);
        }
        trace!(task = %self.task, property = %accessor, kind = slot.value.kind_label(), "read property");
        Ok(Some(slot.value.clone()))
    }

    fn display_name(&self) -> String {
        if self.path.is_empty() {
            format!("task '{}'", self.task)
        } else {
            format!("task '{}' table '{}'", self.task, self.path)
        }
    }
}

impl fmt::Debug for TableBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBean")
            .field("task", &self.task)
            .field("path", &self.path)
            .field("properties", &self.metadata.properties().len())
            .finish()
    }
}

/// Beans already built for nested tables, keyed by table identity.
type Prepared = HashMap<*const toml::Table, Arc<TableBean>>;

/// Every table below `root` that becomes a bean of its own, each listed
/// before the tables it contains.
fn nested_tables(root: &toml::Table) -> Vec<(&toml::Table, String)> {
    let mut found = Vec::new();
    let mut stack: Vec<(&toml::Value, String)> =
        root.iter().map(|(key, value)| (value, key.clone())).collect();

    while let Some((value, path)) = stack.pop() {
        match value {
            toml::Value::Table(table) if reference_key(table).is_none() => {
                stack.extend(
                    table
                        .iter()
                        .map(|(key, child)| (child, format!("{path}.{key}"))),
                );
                found.push((table, path));
            }
            toml::Value::Array(items) => stack.extend(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| (item, format!("{path}.${index}"))),
            ),
            _ => {}
        }
    }
    found
}

fn prepared_bean(prepared: &Prepared, table: &toml::Table) -> Result<Arc<dyn Bean>, String> {
    match prepared.get(&(table as *const toml::Table)) {
        Some(bean) => {
            let bean: Arc<dyn Bean> = bean.clone();
            Ok(bean)
        }
        None => Err("nested table was not prepared".to_string()),
    }
}

struct Classified {
    kind: &'static str,
    declared: DeclaredType,
    value: Value,
    problem: Option<String>,
    deprecated: Option<&'static str>,
}

impl Classified {
    fn new(kind: &'static str, declared: DeclaredType, value: Value) -> Self {
        Self {
            kind,
            declared,
            value,
            problem: None,
            deprecated: None,
        }
    }
}

fn classify(key: &str, raw: &toml::Value, prepared: &Prepared) -> Result<Classified, String> {
    let mut classified = match raw {
        toml::Value::Table(table) => match reference_key(table) {
            Some(reference) => classify_reference(reference, table)?,
            None => Classified::new(
                kinds::NESTED,
                DeclaredType::PLAIN,
                Value::Object(prepared_bean(prepared, table)?),
            ),
        },
        toml::Value::Array(items) => classify_array(raw, items, prepared)?,
        _ => Classified::new(kinds::INPUT, DeclaredType::PLAIN, convert(raw, prepared)?),
    };

    if key.starts_with('_') {
        classified.kind = kinds::INTERNAL;
        classified.declared = DeclaredType::PLAIN;
        classified.problem = None;
        classified.deprecated = None;
    }
    Ok(classified)
}

fn classify_array(
    raw: &toml::Value,
    items: &[toml::Value],
    prepared: &Prepared,
) -> Result<Classified, String> {
    let tables = items.iter().filter(|item| item.is_table()).count();
    if tables > 0 && tables < items.len() {
        return Err("array mixes tables and plain values".to_string());
    }

    let references: Vec<(&'static str, &toml::Table)> = items
        .iter()
        .filter_map(toml::Value::as_table)
        .filter_map(|table| reference_key(table).map(|key| (key, table)))
        .collect();

    if references.is_empty() {
        let kind = if tables > 0 { kinds::NESTED } else { kinds::INPUT_FILES };
        return Ok(Classified::new(kind, DeclaredType::PLAIN, convert(raw, prepared)?));
    }
    if references.len() < items.len() {
        return Err("array mixes artifact references and nested tables".to_string());
    }
    classify_reference_array(&references)
}

/// The reference key of `table`, if it is a reference table.
fn reference_key(table: &toml::Table) -> Option<&'static str> {
    [OUTPUT_KEY, OUTPUT_OF_KEY, VALUE_OF_KEY, DEPRECATED_OUTPUT_OF_KEY]
        .into_iter()
        .find(|key| table.contains_key(*key))
}

/// `from` and `output_of` name the same thing.
fn reference_family(key: &str) -> &'static str {
    match key {
        OUTPUT_KEY => OUTPUT_KEY,
        VALUE_OF_KEY => VALUE_OF_KEY,
        _ => OUTPUT_OF_KEY,
    }
}

fn reference_target(key: &str, table: &toml::Table) -> Result<String, String> {
    match table.get(key) {
        Some(toml::Value::String(target)) if !target.is_empty() => Ok(target.clone()),
        Some(toml::Value::String(_)) => Err(format!("`{key}` must not be empty")),
        _ => Err(format!("`{key}` must be a string")),
    }
}

fn extra_keys_problem(key: &str, table: &toml::Table) -> Option<String> {
    if table.len() <= 1 {
        return None;
    }
    let extra: Vec<&str> = table
        .keys()
        .map(String::as_str)
        .filter(|k| *k != key)
        .collect();
    Some(format!(
        "reference table may only contain `{key}`; unexpected key(s): {}",
        extra.join(", ")
    ))
}

fn classify_reference(key: &'static str, table: &toml::Table) -> Result<Classified, String> {
    let target = reference_target(key, table)?;

    let mut classified = match reference_family(key) {
        OUTPUT_KEY => Classified::new(kinds::OUTPUT_FILES, DeclaredType::PLAIN, Value::Text(target)),
        VALUE_OF_KEY => Classified::new(
            kinds::INPUT,
            DeclaredType::DEFERRED.configurable(),
            Value::Deferred(Arc::new(TaskValue::new(target))),
        ),
        _ => Classified::new(
            kinds::INPUT_FILES,
            DeclaredType::BUILDABLE.configurable(),
            Value::Artifact(Arc::new(TaskOutput::new(target))),
        ),
    };

    if key == DEPRECATED_OUTPUT_OF_KEY {
        classified.deprecated = Some(DEPRECATED_FROM);
    }
    classified.problem = extra_keys_problem(key, table);
    Ok(classified)
}

/// An array whose elements are all reference tables of one family becomes a
/// single value carrying every target.
fn classify_reference_array(references: &[(&'static str, &toml::Table)]) -> Result<Classified, String> {
    let family = reference_family(references[0].0);
    let mut targets = Vec::with_capacity(references.len());
    let mut problems = Vec::new();
    let mut deprecated = None;

    for (index, (key, table)) in references.iter().enumerate() {
        if reference_family(key) != family {
            return Err(format!(
                "array mixes `{family}` and `{}` references",
                reference_family(key)
            ));
        }
        targets.push(reference_target(key, table).map_err(|m| format!("element {index}: {m}"))?);
        if let Some(problem) = extra_keys_problem(key, table) {
            problems.push(format!("element {index}: {problem}"));
        }
        if *key == DEPRECATED_OUTPUT_OF_KEY {
            deprecated = Some(DEPRECATED_FROM);
        }
    }

    let mut classified = match family {
        OUTPUT_KEY => Classified::new(
            kinds::OUTPUT_FILES,
            DeclaredType::PLAIN,
            Value::List(targets.into_iter().map(Value::Text).collect()),
        ),
        VALUE_OF_KEY => Classified::new(
            kinds::INPUT,
            DeclaredType::DEFERRED.configurable(),
            Value::Deferred(Arc::new(TaskValue::all(targets))),
        ),
        _ => Classified::new(
            kinds::INPUT_FILES,
            DeclaredType::BUILDABLE.configurable(),
            Value::Artifact(Arc::new(TaskOutput::all(targets))),
        ),
    };
    classified.deprecated = deprecated;
    classified.problem = (!problems.is_empty()).then(|| problems.join("; "));
    Ok(classified)
}

/// Convert a plain TOML value. Tables become their prepared nested beans.
fn convert(raw: &toml::Value, prepared: &Prepared) -> Result<Value, String> {
    enum Step<'a> {
        Enter(&'a toml::Value),
        Collect(usize),
    }

    let mut work = vec![Step::Enter(raw)];
    let mut done: Vec<Value> = Vec::new();

    while let Some(step) = work.pop() {
        match step {
            Step::Enter(toml::Value::Array(items)) => {
                work.push(Step::Collect(items.len()));
                work.extend(items.iter().rev().map(Step::Enter));
            }
            Step::Enter(value) => done.push(convert_one(value, prepared)?),
            Step::Collect(len) => {
                let items = done.split_off(done.len() - len);
                done.push(Value::List(items));
            }
        }
    }
    done.pop().ok_or_else(|| "value could not be converted".to_string())
}

fn convert_one(raw: &toml::Value, prepared: &Prepared) -> Result<Value, String> {
    Ok(match raw {
        toml::Value::String(s) => Value::Text(s.clone()),
        toml::Value::Integer(i) => Value::Integer(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Flag(*b),
        toml::Value::Datetime(_) => {
            return Err("datetime values are not supported; quote the value as a string".to_string());
        }
        toml::Value::Table(table) => match reference_key(table) {
            Some(key) => {
                return Err(format!(
                    "`{key}` references are only supported as a property value or in a flat array"
                ));
            }
            None => Value::Object(prepared_bean(prepared, table)?),
        },
        toml::Value::Array(_) => return Err("unexpected nested array".to_string()),
    })
}

/// The output of another task, consumed as an input artifact.
#[derive(Debug)]
pub struct TaskOutput {
    producers: Vec<String>,
    finalized: AtomicBool,
}

impl TaskOutput {
    pub fn new(producer: impl Into<String>) -> Self {
        Self::all([producer.into()])
    }

    pub fn all(producers: impl IntoIterator<Item = String>) -> Self {
        Self {
            producers: producers.into_iter().collect(),
            finalized: AtomicBool::new(false),
        }
    }
}

impl Buildable for TaskOutput {
    fn producers(&self) -> Vec<String> {
        self.producers.clone()
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }
}

impl Configurable for TaskOutput {
    fn finalize_value(&self) {
        self.finalized.store(true, Ordering::Release);
    }

    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }
}

/// A value another task computes, consumed lazily.
#[derive(Debug)]
pub struct TaskValue {
    producers: Vec<String>,
    finalized: AtomicBool,
}

impl TaskValue {
    pub fn new(producer: impl Into<String>) -> Self {
        Self::all([producer.into()])
    }

    pub fn all(producers: impl IntoIterator<Item = String>) -> Self {
        Self {
            producers: producers.into_iter().collect(),
            finalized: AtomicBool::new(false),
        }
    }
}

impl DeferredValue for TaskValue {
    fn producers(&self) -> Vec<String> {
        self.producers.clone()
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }
}

impl Configurable for TaskValue {
    fn finalize_value(&self) {
        self.finalized.store(true, Ordering::Release);
    }

    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }
}
