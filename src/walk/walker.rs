// src/walk/walker.rs

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::errors::PropertyAccessError;
use crate::property::{Bean, LazyPropertyValue, Value};
use crate::walk::handler::HandlerRegistry;
use crate::walk::node::{
    ConfigurationNode, DefaultNodeFactory, NodeFactory, NodeId, NodeKind, PendingNodes,
};
use crate::walk::{Diagnostic, DiagnosticsSink, PropertyVisitor};

/// A property whose value could not be realized during a traversal.
#[derive(Debug, Clone)]
pub struct PropertyFailure {
    /// Qualified property name.
    pub property: String,
    pub error: PropertyAccessError,
}

/// Summary of a traversal.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    pub nodes_visited: usize,
    pub properties_visited: usize,
    /// Failures are collected, not raised: the caller decides whether they
    /// abort anything larger than the property that failed.
    pub access_failures: Vec<PropertyFailure>,
}

impl WalkOutcome {
    fn absorb(&mut self, other: WalkOutcome) {
        self.nodes_visited += other.nodes_visited;
        self.properties_visited += other.properties_visited;
        self.access_failures.extend(other.access_failures);
    }
}

/// Walks the properties reachable from a root bean.
///
/// Traversal is breadth-first over an explicit queue, so nesting depth is
/// bounded by memory rather than by the call stack. One walker can serve
/// many concurrent traversals; the registry is only read.
#[derive(Clone)]
pub struct PropertyWalker {
    registry: Arc<HandlerRegistry>,
    factory: Arc<dyn NodeFactory>,
}

impl PropertyWalker {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_node_factory(registry, Arc::new(DefaultNodeFactory))
    }

    pub fn with_node_factory(registry: Arc<HandlerRegistry>, factory: Arc<dyn NodeFactory>) -> Self {
        Self { registry, factory }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Visit every property reachable from `root`.
    pub fn walk(
        &self,
        root: Arc<dyn Bean>,
        visitor: &mut dyn PropertyVisitor,
        sink: &mut dyn DiagnosticsSink,
    ) -> WalkOutcome {
        let mut pending = PendingNodes::new();
        pending.push(ConfigurationNode::root(root));

        let mut outcome = WalkOutcome::default();
        while let Some(id) = pending.pop_next() {
            let step = self.visit_node(id, &mut pending, visitor, sink);
            outcome.absorb(step);
        }

        debug!(
            nodes = outcome.nodes_visited,
            properties = outcome.properties_visited,
            failures = outcome.access_failures.len(),
            "property walk finished"
        );
        outcome
    }

    /// Visit one node: report its validation problems, hand each of its
    /// properties to the matching handler, and enqueue nested values.
    pub fn visit_node(
        &self,
        id: NodeId,
        pending: &mut PendingNodes,
        visitor: &mut dyn PropertyVisitor,
        sink: &mut dyn DiagnosticsSink,
    ) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let Some(node) = pending.get(id).cloned() else {
            warn!(?id, "node id not present in traversal arena");
            return outcome;
        };
        outcome.nodes_visited = 1;

        let mut nested = NestedContext {
            parent: id,
            pending,
            factory: self.factory.as_ref(),
            sink,
        };

        match node.kind() {
            NodeKind::Bean(bean) => {
                self.visit_bean(&node, bean, visitor, &mut nested, &mut outcome);
            }
            NodeKind::Iterable(items) => {
                for (index, item) in items.iter().enumerate() {
                    let name = node.qualified_property_name(&format!("${index}"));
                    nested.add_nested(&name, item.clone());
                }
            }
            NodeKind::Map(entries) => {
                for (key, item) in entries.iter() {
                    let name = node.qualified_property_name(key);
                    nested.add_nested(&name, item.clone());
                }
            }
            NodeKind::Leaf(_) => {}
        }

        outcome
    }

    fn visit_bean(
        &self,
        node: &ConfigurationNode,
        bean: &Arc<dyn Bean>,
        visitor: &mut dyn PropertyVisitor,
        nested: &mut NestedContext<'_>,
        outcome: &mut WalkOutcome,
    ) {
        let metadata = bean.type_metadata();
        trace!(
            node = %node.display_path(),
            type_name = %metadata.type_name(),
            properties = metadata.properties().len(),
            "visiting bean"
        );

        for problem in metadata.problems() {
            nested.report(Diagnostic::new(
                node.qualified_property_name(&problem.property),
                problem.message.clone(),
            ));
        }

        for property in metadata.properties() {
            let name = node.qualified_property_name(&property.name);

            let Some(handler) = self.registry.handler_for(&property.kind) else {
                nested.report(Diagnostic::new(
                    name,
                    format!("no handler registered for property kind '{}'", property.kind),
                ));
                continue;
            };

            if !handler.should_visit(&*visitor) {
                trace!(property = %name, kind = %property.kind, "handler skips property for this visitor");
                continue;
            }

            let value = LazyPropertyValue::bind(Arc::clone(bean), metadata.type_name(), property);
            outcome.properties_visited += 1;

            if let Err(error) = handler.visit_property_value(&name, &value, property, visitor, nested) {
                warn!(property = %name, %error, "property could not be realized; continuing traversal");
                outcome.access_failures.push(PropertyFailure {
                    property: name,
                    error,
                });
            }
        }
    }
}

impl std::fmt::Debug for PropertyWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyWalker")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Handed to handlers so they can queue nested values for traversal.
pub struct NestedContext<'a> {
    parent: NodeId,
    pending: &'a mut PendingNodes,
    factory: &'a dyn NodeFactory,
    sink: &'a mut dyn DiagnosticsSink,
}

impl NestedContext<'_> {
    /// Queue `value` as a child of the node being visited.
    ///
    /// A bean that is already an ancestor of the current node is reported as
    /// a cycle and not queued.
    pub fn add_nested(&mut self, name: &str, value: Value) {
        if let Value::Object(bean) = &value {
            if let Some(ancestor) = self.pending.find_bean_in_ancestors(self.parent, bean) {
                let message = format!(
                    "Cycles between nested beans are not allowed. Cycle detected between: '{}' and '{}'.",
                    ancestor.display_path(),
                    name
                );
                self.sink.report(Diagnostic::new(name, message));
                return;
            }
        }

        let node = self.factory.create(self.parent, name.to_string(), value);
        self.pending.push(node);
        trace!(child = %name, pending = self.pending.pending(), "queued nested value");
    }

    /// Report a diagnostic for the node being visited.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!(property = %diagnostic.property, message = %diagnostic.message, "validation problem");
        self.sink.report(diagnostic);
    }
}
