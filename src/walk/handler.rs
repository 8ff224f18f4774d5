// src/walk/handler.rs

//! Property handlers and the registry that selects them by kind tag.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::errors::PropertyAccessError;
use crate::property::{LazyPropertyValue, PropertyMetadata};
use crate::walk::PropertyVisitor;
use crate::walk::walker::NestedContext;

/// Kind tags of the built-in handlers.
pub mod kinds {
    pub const INPUT: &str = "input";
    pub const INPUT_FILES: &str = "input-files";
    pub const OUTPUT_FILES: &str = "output-files";
    pub const NESTED: &str = "nested";
    pub const INTERNAL: &str = "internal";
}

/// Decides what happens to one kind of property.
pub trait PropertyHandler: Send + Sync {
    /// Tag this handler is registered under.
    fn kind(&self) -> &str;

    /// Whether properties of this kind are of interest to `visitor`.
    fn should_visit(&self, visitor: &dyn PropertyVisitor) -> bool;

    /// Handle one property. `nested` enqueues values for further traversal.
    fn visit_property_value(
        &self,
        name: &str,
        value: &LazyPropertyValue,
        metadata: &PropertyMetadata,
        visitor: &mut dyn PropertyVisitor,
        nested: &mut NestedContext<'_>,
    ) -> Result<(), PropertyAccessError>;
}

/// Read-only lookup from kind tag to handler.
///
/// Built once and shared (through `Arc`) by concurrent traversals.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn PropertyHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in handler.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_handler(InputPropertyHandler)
            .with_handler(InputFilesHandler)
            .with_handler(OutputFilesHandler)
            .with_handler(NestedBeanHandler)
            .with_handler(InternalPropertyHandler)
    }

    pub fn with_handler(mut self, handler: impl PropertyHandler + 'static) -> Self {
        self.register(handler);
        self
    }

    /// Register `handler` under its kind, returning the handler it replaced.
    pub fn register(
        &mut self,
        handler: impl PropertyHandler + 'static,
    ) -> Option<Arc<dyn PropertyHandler>> {
        let kind = handler.kind().to_string();
        self.handlers.insert(kind, Arc::new(handler))
    }

    pub fn handler_for(&self, kind: &str) -> Option<&Arc<dyn PropertyHandler>> {
        self.handlers.get(kind)
    }

    /// Registered kind tags, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Plain input values.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputPropertyHandler;

impl PropertyHandler for InputPropertyHandler {
    fn kind(&self) -> &str {
        kinds::INPUT
    }

    fn should_visit(&self, visitor: &dyn PropertyVisitor) -> bool {
        !visitor.visit_outputs_only()
    }

    fn visit_property_value(
        &self,
        name: &str,
        value: &LazyPropertyValue,
        metadata: &PropertyMetadata,
        visitor: &mut dyn PropertyVisitor,
        _nested: &mut NestedContext<'_>,
    ) -> Result<(), PropertyAccessError> {
        visitor.visit_input_property(name, value, metadata);
        Ok(())
    }
}

/// Input files and artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputFilesHandler;

impl PropertyHandler for InputFilesHandler {
    fn kind(&self) -> &str {
        kinds::INPUT_FILES
    }

    fn should_visit(&self, visitor: &dyn PropertyVisitor) -> bool {
        !visitor.visit_outputs_only()
    }

    fn visit_property_value(
        &self,
        name: &str,
        value: &LazyPropertyValue,
        metadata: &PropertyMetadata,
        visitor: &mut dyn PropertyVisitor,
        _nested: &mut NestedContext<'_>,
    ) -> Result<(), PropertyAccessError> {
        visitor.visit_input_file_property(name, value, metadata);
        Ok(())
    }
}

/// Output locations. Visited for every visitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFilesHandler;

impl PropertyHandler for OutputFilesHandler {
    fn kind(&self) -> &str {
        kinds::OUTPUT_FILES
    }

    fn should_visit(&self, _visitor: &dyn PropertyVisitor) -> bool {
        true
    }

    fn visit_property_value(
        &self,
        name: &str,
        value: &LazyPropertyValue,
        metadata: &PropertyMetadata,
        visitor: &mut dyn PropertyVisitor,
        _nested: &mut NestedContext<'_>,
    ) -> Result<(), PropertyAccessError> {
        visitor.visit_output_file_property(name, value, metadata);
        Ok(())
    }
}

/// Nested configuration: the value is realized and queued for traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedBeanHandler;

impl PropertyHandler for NestedBeanHandler {
    fn kind(&self) -> &str {
        kinds::NESTED
    }

    fn should_visit(&self, _visitor: &dyn PropertyVisitor) -> bool {
        true
    }

    fn visit_property_value(
        &self,
        name: &str,
        value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
        _visitor: &mut dyn PropertyVisitor,
        nested: &mut NestedContext<'_>,
    ) -> Result<(), PropertyAccessError> {
        match value.call()? {
            Some(bean) => nested.add_nested(name, bean),
            None => trace!(property = %name, "nested property is null; nothing to traverse"),
        }
        Ok(())
    }
}

/// Internal state that never takes part in traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalPropertyHandler;

impl PropertyHandler for InternalPropertyHandler {
    fn kind(&self) -> &str {
        kinds::INTERNAL
    }

    fn should_visit(&self, _visitor: &dyn PropertyVisitor) -> bool {
        false
    }

    fn visit_property_value(
        &self,
        _name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
        _visitor: &mut dyn PropertyVisitor,
        _nested: &mut NestedContext<'_>,
    ) -> Result<(), PropertyAccessError> {
        Ok(())
    }
}
