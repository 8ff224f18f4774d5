// src/property/lazy.rs

//! Memoized access to one property of one bean.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::errors::{AccessorError, PropertyAccessError};
use crate::property::deprecation;
use crate::property::{Bean, DeferredValue, Dependency, PropertyMetadata, Value};

type Realized = Result<Option<Value>, PropertyAccessError>;

/// One property accessor bound to one receiver.
///
/// The accessor runs at most once per instance (and per clone: clones share
/// the same memo). Concurrent first callers block until the winning call has
/// finished and then observe the same value or the same failure.
#[derive(Clone)]
pub struct LazyPropertyValue {
    inner: Arc<Inner>,
}

struct Inner {
    bean: Arc<dyn Bean>,
    declaring_type: String,
    property: PropertyMetadata,
    realized: OnceLock<Realized>,
}

impl LazyPropertyValue {
    /// Bind `property` of `bean`. Nothing is invoked until a value is requested.
    pub fn bind(
        bean: Arc<dyn Bean>,
        declaring_type: impl Into<String>,
        property: &PropertyMetadata,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                bean,
                declaring_type: declaring_type.into(),
                property: property.clone(),
                realized: OnceLock::new(),
            }),
        }
    }

    pub fn property(&self) -> &PropertyMetadata {
        &self.inner.property
    }

    /// Whether the accessor has already run.
    pub fn is_realized(&self) -> bool {
        self.inner.realized.get().is_some()
    }

    /// The realized value, computing it on first demand.
    pub fn call(&self) -> Realized {
        self.realize().clone()
    }

    /// Dependencies carried by this property, resolved when the returned
    /// container is visited.
    ///
    /// A deferred property is realized here so that the container can hand
    /// out the deferred value itself; its producers are left to the consumer.
    /// A buildable property is only realized when the container is visited.
    pub fn dependencies(&self) -> Result<DependencyContainer, PropertyAccessError> {
        let declared = self.inner.property.declared;

        if declared.deferred {
            return match self.realize() {
                Err(err) => Err(err.clone()),
                Ok(None) => Ok(DependencyContainer::empty()),
                Ok(Some(Value::Deferred(value))) => Ok(DependencyContainer {
                    source: Source::Carrier(Arc::clone(value)),
                }),
                Ok(Some(_)) => Err(self.unexpected("deferred")),
            };
        }

        if declared.buildable {
            return Ok(DependencyContainer {
                source: Source::Realize(self.clone()),
            });
        }

        Ok(DependencyContainer::empty())
    }

    /// Finalize the value if its declared type is configurable.
    ///
    /// Safe to call repeatedly: the accessor never runs a second time, and
    /// finalizing an already finalized value is a no-op for the value.
    pub fn maybe_finalize(&self) -> Result<(), PropertyAccessError> {
        if !self.inner.property.declared.configurable {
            return Ok(());
        }

        match self.realize() {
            Err(err) => Err(err.clone()),
            Ok(None) => Ok(()),
            Ok(Some(value)) => match value.as_configurable() {
                Some(configurable) => {
                    if !configurable.is_finalized() {
                        trace!(property = %self.inner.property.name, "finalizing property value");
                    }
                    configurable.finalize_value();
                    Ok(())
                }
                None => Err(self.unexpected("configurable")),
            },
        }
    }

    fn realize(&self) -> &Realized {
        self.inner.realized.get_or_init(|| self.inner.invoke())
    }

    fn unexpected(&self, expected: &'static str) -> PropertyAccessError {
        PropertyAccessError::UnexpectedValue {
            property: self.inner.property.name.clone(),
            expected,
        }
    }
}

impl Inner {
    fn invoke(&self) -> Realized {
        debug!(
            declaring_type = %self.declaring_type,
            accessor = %self.property.accessor,
            "realizing property value"
        );

        // Only the raw accessor call is quiet.
        let result = deprecation::run_quietly(|| self.bean.read_property(&self.property.accessor));

        result.map_err(|err| match err {
            AccessorError::Raised(cause) => PropertyAccessError::Raised(Arc::new(cause)),
            invocation @ AccessorError::Invocation(_) => PropertyAccessError::Call {
                declaring_type: self.declaring_type.clone(),
                accessor: self.property.accessor.clone(),
                receiver: self.bean.display_name(),
                reason: Arc::new(invocation),
            },
        })
    }
}

impl fmt::Debug for LazyPropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPropertyValue")
            .field("declaring_type", &self.inner.declaring_type)
            .field("property", &self.inner.property.name)
            .field("realized", &self.is_realized())
            .finish()
    }
}

/// Receives dependencies emitted by a [`DependencyContainer`].
pub trait DependencyCollector {
    fn add(&mut self, dependency: Dependency);
}

impl DependencyCollector for Vec<Dependency> {
    fn add(&mut self, dependency: Dependency) {
        self.push(dependency);
    }
}

/// Deferred producer of a property's dependencies.
#[derive(Debug, Clone)]
pub struct DependencyContainer {
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    Empty,
    Carrier(Arc<dyn DeferredValue>),
    Realize(LazyPropertyValue),
}

impl DependencyContainer {
    pub fn empty() -> Self {
        Self {
            source: Source::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.source, Source::Empty)
    }

    /// Emit this property's dependencies into `collector`.
    pub fn visit_dependencies(
        &self,
        collector: &mut dyn DependencyCollector,
    ) -> Result<(), PropertyAccessError> {
        match &self.source {
            Source::Empty => {}
            Source::Carrier(value) => collector.add(Dependency::Deferred(Arc::clone(value))),
            Source::Realize(lazy) => match lazy.realize() {
                Err(err) => return Err(err.clone()),
                Ok(None) => {}
                Ok(Some(Value::Artifact(artifact))) => {
                    collector.add(Dependency::Artifact(Arc::clone(artifact)));
                }
                Ok(Some(_)) => return Err(lazy.unexpected("buildable")),
            },
        }
        Ok(())
    }
}
