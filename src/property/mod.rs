// src/property/mod.rs

//! Property model shared by configuration objects and the walker.
//!
//! - [`Bean`] is the contract every configuration object implements to
//!   expose its properties; there is no runtime reflection.
//! - [`TypeMetadata`] / [`PropertyMetadata`] describe what a bean declares.
//! - [`lazy`] wraps one accessor in a memoized [`LazyPropertyValue`].
//! - [`deprecation`] provides the scoped "suppress deprecation warnings"
//!   context used around raw accessor invocations.

pub mod deprecation;
pub mod lazy;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::AccessorError;

pub use lazy::{DependencyCollector, DependencyContainer, LazyPropertyValue};

/// A realized property value.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A nested configuration object.
    Object(Arc<dyn Bean>),
    /// A value computed later by some work item.
    Deferred(Arc<dyn DeferredValue>),
    /// An artifact produced by other work items.
    Artifact(Arc<dyn Buildable>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The configurable capability of this value, if it has one.
    pub fn as_configurable(&self) -> Option<&dyn Configurable> {
        match self {
            Value::Deferred(d) => d.as_configurable(),
            Value::Artifact(a) => a.as_configurable(),
            _ => None,
        }
    }

    /// Short label used in logs and plan output.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Flag(_) => "flag",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Deferred(_) => "deferred",
            Value::Artifact(_) => "artifact",
        }
    }
}

/// A configuration object whose properties can be walked.
pub trait Bean: Send + Sync + fmt::Debug {
    /// Declared properties and type-level validation problems.
    fn type_metadata(&self) -> Arc<TypeMetadata>;

    /// Invoke the accessor with the given name.
    ///
    /// `Ok(None)` is a null value.
    fn read_property(&self, accessor: &str) -> Result<Option<Value>, AccessorError>;

    /// Receiver identity used in diagnostics.
    fn display_name(&self) -> String {
        self.type_metadata().type_name().to_string()
    }
}

/// A handle to a value computed later.
///
/// Its dependencies are expanded by whoever consumes it, not while walking.
pub trait DeferredValue: Send + Sync + fmt::Debug {
    /// Work items whose execution produces the value.
    fn producers(&self) -> Vec<String>;

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }
}

/// A value that is itself produced by other work items.
pub trait Buildable: Send + Sync + fmt::Debug {
    /// Work items whose execution produces this artifact.
    fn producers(&self) -> Vec<String>;

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }
}

/// A value with a one-way "finalize" transition after which it is read-only.
pub trait Configurable: Send + Sync {
    fn finalize_value(&self);

    fn is_finalized(&self) -> bool;
}

/// A dependency emitted by a property.
#[derive(Debug, Clone)]
pub enum Dependency {
    /// Carrier whose producers are resolved by the consumer.
    Deferred(Arc<dyn DeferredValue>),
    /// Edge to an already realized artifact.
    Artifact(Arc<dyn Buildable>),
}

impl Dependency {
    pub fn producers(&self) -> Vec<String> {
        match self {
            Dependency::Deferred(d) => d.producers(),
            Dependency::Artifact(a) => a.producers(),
        }
    }
}

/// Statically declared capabilities of a property's type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclaredType {
    pub deferred: bool,
    pub buildable: bool,
    pub configurable: bool,
}

impl DeclaredType {
    pub const PLAIN: DeclaredType = DeclaredType {
        deferred: false,
        buildable: false,
        configurable: false,
    };

    pub const DEFERRED: DeclaredType = DeclaredType {
        deferred: true,
        buildable: false,
        configurable: false,
    };

    pub const BUILDABLE: DeclaredType = DeclaredType {
        deferred: false,
        buildable: true,
        configurable: false,
    };

    pub fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }
}

/// Name, accessor, handler kind and declared type of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMetadata {
    pub name: String,
    pub accessor: String,
    /// Tag used to look up the property's handler.
    pub kind: String,
    pub declared: DeclaredType,
}

impl PropertyMetadata {
    /// A property whose accessor has the same name as the property.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, declared: DeclaredType) -> Self {
        let name = name.into();
        Self {
            accessor: name.clone(),
            name,
            kind: kind.into(),
            declared,
        }
    }

    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }
}

/// A type-level validation problem attached to one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProblem {
    pub property: String,
    pub message: String,
}

/// Everything a bean type declares.
#[derive(Debug, Clone, Default)]
pub struct TypeMetadata {
    type_name: String,
    properties: Vec<PropertyMetadata>,
    problems: Vec<ValidationProblem>,
}

impl TypeMetadata {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            problems: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.add_property(property);
        self
    }

    pub fn with_problem(mut self, property: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_problem(property, message);
        self
    }

    pub fn add_property(&mut self, property: PropertyMetadata) {
        self.properties.push(property);
    }

    pub fn add_problem(&mut self, property: impl Into<String>, message: impl Into<String>) {
        self.problems.push(ValidationProblem {
            property: property.into(),
            message: message.into(),
        });
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    pub fn problems(&self) -> &[ValidationProblem] {
        &self.problems
    }
}
