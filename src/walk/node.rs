// src/walk/node.rs

//! Nodes of a traversal and the queue that holds them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::property::{Bean, Value};

/// Index of a node in a [`PendingNodes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What a node holds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A configuration object whose declared properties are visited.
    Bean(Arc<dyn Bean>),
    /// Elements are enqueued as children named `$<index>`.
    Iterable(Vec<Value>),
    /// Entries are enqueued as children named by their key.
    Map(BTreeMap<String, Value>),
    /// Nothing to traverse.
    Leaf(Value),
}

/// A node discovered during one traversal.
///
/// `parent` points at the node that discovered this one. It is only used to
/// build diagnostics and detect cycles; the arena owns every node.
#[derive(Debug, Clone)]
pub struct ConfigurationNode {
    parent: Option<NodeId>,
    qualified_name: Option<String>,
    kind: NodeKind,
}

impl ConfigurationNode {
    pub fn root(bean: Arc<dyn Bean>) -> Self {
        Self {
            parent: None,
            qualified_name: None,
            kind: NodeKind::Bean(bean),
        }
    }

    pub fn new(parent: NodeId, qualified_name: String, kind: NodeKind) -> Self {
        Self {
            parent: Some(parent),
            qualified_name: Some(qualified_name),
            kind,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Dot-joined path from the root; `None` for the root itself.
    pub fn qualified_name(&self) -> Option<&str> {
        self.qualified_name.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Qualified name of a property or child of this node.
    pub fn qualified_property_name(&self, child: &str) -> String {
        match &self.qualified_name {
            Some(prefix) => format!("{prefix}.{child}"),
            None => child.to_string(),
        }
    }

    /// Path used in messages; the root is shown as `<root>`.
    pub fn display_path(&self) -> &str {
        self.qualified_name.as_deref().unwrap_or("<root>")
    }

    fn holds_bean(&self, bean: &Arc<dyn Bean>) -> bool {
        match &self.kind {
            NodeKind::Bean(own) => std::ptr::addr_eq(Arc::as_ptr(own), Arc::as_ptr(bean)),
            _ => false,
        }
    }
}

/// Creates child nodes for values a handler asked to traverse.
pub trait NodeFactory: Send + Sync {
    fn create(&self, parent: NodeId, qualified_name: String, value: Value) -> ConfigurationNode;
}

/// Beans, lists and maps are traversed; any other value becomes a leaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNodeFactory;

impl NodeFactory for DefaultNodeFactory {
    fn create(&self, parent: NodeId, qualified_name: String, value: Value) -> ConfigurationNode {
        let kind = match value {
            Value::Object(bean) => NodeKind::Bean(bean),
            Value::List(items) => NodeKind::Iterable(items),
            Value::Map(entries) => NodeKind::Map(entries),
            other => NodeKind::Leaf(other),
        };
        ConfigurationNode::new(parent, qualified_name, kind)
    }
}

/// Arena of nodes plus the FIFO of nodes not yet visited.
///
/// Nodes stay in the arena until the traversal is dropped so that
/// back-references remain valid.
#[derive(Debug, Default)]
pub struct PendingNodes {
    nodes: Vec<ConfigurationNode>,
    queue: VecDeque<NodeId>,
}

impl PendingNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` and append it to the queue.
    pub fn push(&mut self, node: ConfigurationNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.queue.push_back(id);
        id
    }

    /// Next node to visit, in discovery order.
    pub fn pop_next(&mut self) -> Option<NodeId> {
        self.queue.pop_front()
    }

    pub fn get(&self, id: NodeId) -> Option<&ConfigurationNode> {
        self.nodes.get(id.0)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of nodes created so far, visited or not.
    pub fn created(&self) -> usize {
        self.nodes.len()
    }

    /// `id` and its ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &ConfigurationNode> + '_ {
        let mut next = self.get(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.parent.and_then(|parent| self.get(parent));
            Some(current)
        })
    }

    /// The nearest node among `id` and its ancestors that holds `bean`.
    pub fn find_bean_in_ancestors(
        &self,
        id: NodeId,
        bean: &Arc<dyn Bean>,
    ) -> Option<&ConfigurationNode> {
        self.ancestors(id).find(|node| node.holds_bean(bean))
    }
}
