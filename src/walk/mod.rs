// src/walk/mod.rs

//! Breadth-first traversal of configuration objects.
//!
//! - [`walker`] drives the traversal with an explicit queue of pending nodes.
//! - [`node`] holds the node arena, node kinds and the node factory.
//! - [`handler`] maps property kind tags to handlers and ships the built-in
//!   handlers.
//!
//! The walker never resolves dependencies itself; it hands each property to
//! its handler as a [`LazyPropertyValue`] and the visitor decides what to do
//! with it.

pub mod handler;
pub mod node;
pub mod walker;

use std::fmt;

use crate::property::{LazyPropertyValue, PropertyMetadata};

pub use handler::{HandlerRegistry, PropertyHandler, kinds};
pub use node::{ConfigurationNode, DefaultNodeFactory, NodeFactory, NodeId, NodeKind, PendingNodes};
pub use walker::{NestedContext, PropertyFailure, PropertyWalker, WalkOutcome};

/// A validation problem found while walking, tagged with the qualified
/// property name (e.g. `inputs.files`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub property: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property '{}': {}", self.property, self.message)
    }
}

/// Receives validation diagnostics. Reporting never fails.
pub trait DiagnosticsSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticsSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Receives the properties found by the walker, one call per property.
///
/// Which method is called depends on the property's handler.
pub trait PropertyVisitor {
    /// Visitors interested only in outputs let handlers skip everything else.
    fn visit_outputs_only(&self) -> bool {
        false
    }

    fn visit_input_property(
        &mut self,
        _name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
    }

    fn visit_input_file_property(
        &mut self,
        _name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
    }

    fn visit_output_file_property(
        &mut self,
        _name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
    }
}
