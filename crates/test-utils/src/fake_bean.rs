#![allow(dead_code)]

//! Hand-built beans, artifacts and visitors with invocation counters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use buildplan::errors::AccessorError;
use buildplan::property::{
    Bean, Buildable, Configurable, DeclaredType, DeferredValue, LazyPropertyValue,
    PropertyMetadata, TypeMetadata, Value,
};
use buildplan::walk::PropertyVisitor;

type Accessor = Arc<dyn Fn() -> Result<Option<Value>, AccessorError> + Send + Sync>;

/// A bean whose accessors are closures. Every accessor call is counted.
pub struct FakeBean {
    name: String,
    metadata: Arc<TypeMetadata>,
    accessors: HashMap<String, Accessor>,
    calls: HashMap<String, AtomicUsize>,
}

impl FakeBean {
    pub fn builder(type_name: &str) -> FakeBeanBuilder {
        FakeBeanBuilder {
            name: format!("fake {type_name}"),
            metadata: TypeMetadata::new(type_name),
            accessors: HashMap::new(),
        }
    }

    /// How often the accessor has been invoked.
    pub fn calls(&self, accessor: &str) -> usize {
        self.calls
            .get(accessor)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Bean for FakeBean {
    fn type_metadata(&self) -> Arc<TypeMetadata> {
        Arc::clone(&self.metadata)
    }

    fn read_property(&self, accessor: &str) -> Result<Option<Value>, AccessorError> {
        if let Some(counter) = self.calls.get(accessor) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        match self.accessors.get(accessor) {
            Some(f) => f(),
            None => Err(AccessorError::Invocation(format!("no accessor '{accessor}'"))),
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for FakeBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeBean").field("name", &self.name).finish()
    }
}

pub struct FakeBeanBuilder {
    name: String,
    metadata: TypeMetadata,
    accessors: HashMap<String, Accessor>,
}

impl FakeBeanBuilder {
    pub fn display_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Declare a property whose accessor runs `f`.
    pub fn property(
        mut self,
        name: &str,
        kind: &str,
        declared: DeclaredType,
        f: impl Fn() -> Result<Option<Value>, AccessorError> + Send + Sync + 'static,
    ) -> Self {
        self.metadata
            .add_property(PropertyMetadata::new(name, kind, declared));
        self.accessors.insert(name.to_string(), Arc::new(f));
        self
    }

    /// Declare a plain property that always returns `value`.
    pub fn value(self, name: &str, kind: &str, value: Value) -> Self {
        self.property(name, kind, DeclaredType::PLAIN, move || Ok(Some(value.clone())))
    }

    /// Declare a property whose accessor always raises `message`.
    pub fn failing(self, name: &str, kind: &str, message: &'static str) -> Self {
        self.property(name, kind, DeclaredType::PLAIN, move || {
            Err(AccessorError::Raised(anyhow!(message)))
        })
    }

    /// Declare a property without an accessor behind it.
    pub fn declared_only(mut self, name: &str, kind: &str) -> Self {
        self.metadata
            .add_property(PropertyMetadata::new(name, kind, DeclaredType::PLAIN));
        self
    }

    pub fn problem(mut self, property: &str, message: &str) -> Self {
        self.metadata.add_problem(property, message);
        self
    }

    pub fn build(self) -> Arc<FakeBean> {
        let calls = self
            .accessors
            .keys()
            .map(|k| (k.clone(), AtomicUsize::new(0)))
            .collect();
        Arc::new(FakeBean {
            name: self.name,
            metadata: Arc::new(self.metadata),
            accessors: self.accessors,
            calls,
        })
    }
}

/// Metadata for a single property, for tests that bind values directly.
pub fn metadata(name: &str, kind: &str, declared: DeclaredType) -> PropertyMetadata {
    PropertyMetadata::new(name, kind, declared)
}

/// Bind `name` of `bean` the way the walker does.
pub fn bind(bean: &Arc<FakeBean>, name: &str) -> LazyPropertyValue {
    let metadata = bean.type_metadata();
    let property = metadata
        .properties()
        .iter()
        .find(|p| p.name == name)
        .cloned()
        .expect("property declared on fake bean");
    let as_bean: Arc<dyn Bean> = bean.clone();
    LazyPropertyValue::bind(as_bean, metadata.type_name(), &property)
}

/// A configurable artifact that counts finalize calls.
#[derive(Debug, Default)]
pub struct FakeArtifact {
    producers: Vec<String>,
    configurable: bool,
    finalized: AtomicBool,
    finalize_calls: AtomicUsize,
}

impl FakeArtifact {
    pub fn produced_by(producers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            producers: producers.iter().map(|p| p.to_string()).collect(),
            configurable: true,
            ..Default::default()
        })
    }

    /// An artifact without the configurable capability.
    pub fn fixed(producers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            producers: producers.iter().map(|p| p.to_string()).collect(),
            configurable: false,
            ..Default::default()
        })
    }

    pub fn finalize_calls(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }
}

impl Buildable for FakeArtifact {
    fn producers(&self) -> Vec<String> {
        self.producers.clone()
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        if self.configurable { Some(self) } else { None }
    }
}

impl Configurable for FakeArtifact {
    fn finalize_value(&self) {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        self.finalized.store(true, Ordering::SeqCst);
    }

    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }
}

/// A configurable deferred value that counts finalize calls.
#[derive(Debug, Default)]
pub struct FakeProvider {
    producers: Vec<String>,
    finalized: AtomicBool,
    finalize_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn produced_by(producers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            producers: producers.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn finalize_calls(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }
}

impl DeferredValue for FakeProvider {
    fn producers(&self) -> Vec<String> {
        self.producers.clone()
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }
}

impl Configurable for FakeProvider {
    fn finalize_value(&self) {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        self.finalized.store(true, Ordering::SeqCst);
    }

    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visited {
    Input,
    InputFile,
    OutputFile,
}

/// Records every property the walker hands it, in order.
#[derive(Debug, Default)]
pub struct RecordingVisitor {
    pub outputs_only: bool,
    pub visits: Vec<(Visited, String)>,
}

impl RecordingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs_only() -> Self {
        Self {
            outputs_only: true,
            visits: Vec::new(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.visits.iter().map(|(_, name)| name.as_str()).collect()
    }
}

impl PropertyVisitor for RecordingVisitor {
    fn visit_outputs_only(&self) -> bool {
        self.outputs_only
    }

    fn visit_input_property(
        &mut self,
        name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
        self.visits.push((Visited::Input, name.to_string()));
    }

    fn visit_input_file_property(
        &mut self,
        name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
        self.visits.push((Visited::InputFile, name.to_string()));
    }

    fn visit_output_file_property(
        &mut self,
        name: &str,
        _value: &LazyPropertyValue,
        _metadata: &PropertyMetadata,
    ) {
        self.visits.push((Visited::OutputFile, name.to_string()));
    }
}
