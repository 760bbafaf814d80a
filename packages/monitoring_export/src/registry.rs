use std::collections::BTreeMap;
use std::fmt::{self, Display};

use foldhash::HashMap;
use parking_lot::RwLock;

use crate::{Metadata, Metric, MetricId};

/// The scope of a metric registry. Embedded in the names of the descriptors of its metrics.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum RegistryType {
    /// Metrics every runtime is expected to provide.
    Base,

    /// Metrics specific to the runtime vendor.
    Vendor,

    /// Metrics defined by the application.
    Application,
}

impl RegistryType {
    /// The name of the registry type as used in descriptor names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Vendor => "vendor",
            Self::Application => "application",
        }
    }
}

impl Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source of metrics to export.
///
/// The exporter calls both methods once per flush for every registry it exports.
pub trait MetricRegistry: Send + Sync {
    /// All metrics currently held by the registry, ordered by identity.
    fn metrics(&self) -> BTreeMap<MetricId, Metric>;

    /// The metadata of all metrics in the registry, keyed by metric name.
    fn metadata(&self) -> HashMap<String, Metadata>;
}

/// A simple thread-safe in-memory [`MetricRegistry`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicI64;
///
/// use monitoring_export::{Metadata, Metric, MetricId, MetricRegistry, MetricType, Registry};
///
/// let registry = Registry::new();
/// let requests = Arc::new(AtomicI64::new(0));
///
/// registry.register(
///     MetricId::new("requests").with_tag("method", "GET"),
///     Metadata::new("requests", MetricType::Counter),
///     Metric::Counter(requests),
/// );
///
/// assert_eq!(registry.metrics().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    metrics: BTreeMap<MetricId, Metric>,
    metadata: HashMap<String, Metadata>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a metric, replacing any metric already registered with the same identity.
    ///
    /// Metadata is shared by all metrics with the same name; registering new metadata for a
    /// name replaces the previous metadata.
    pub fn register(&self, id: MetricId, metadata: Metadata, metric: Metric) {
        let mut inner = self.inner.write();

        inner.metadata.insert(id.name().to_string(), metadata);
        inner.metrics.insert(id, metric);
    }

    /// Removes a metric. Returns the removed metric, if there was one.
    ///
    /// Metadata is removed once the last metric with its name is gone.
    pub fn remove(&self, id: &MetricId) -> Option<Metric> {
        let mut inner = self.inner.write();

        let removed = inner.metrics.remove(id)?;

        if !inner.metrics.keys().any(|other| other.name() == id.name()) {
            inner.metadata.remove(id.name());
        }

        Some(removed)
    }
}

impl MetricRegistry for Registry {
    fn metrics(&self) -> BTreeMap<MetricId, Metric> {
        self.inner.read().metrics.clone()
    }

    fn metadata(&self) -> HashMap<String, Metadata> {
        self.inner.read().metadata.clone()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicI64;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::MetricType;

    assert_impl_all!(Registry: Send, Sync);

    fn counter() -> Metric {
        Metric::Counter(Arc::new(AtomicI64::new(0)))
    }

    #[test]
    fn metrics_are_ordered_by_identity() {
        let registry = Registry::new();

        registry.register(
            MetricId::new("b"),
            Metadata::new("b", MetricType::Counter),
            counter(),
        );
        registry.register(
            MetricId::new("a").with_tag("x", "2"),
            Metadata::new("a", MetricType::Counter),
            counter(),
        );
        registry.register(
            MetricId::new("a").with_tag("x", "1"),
            Metadata::new("a", MetricType::Counter),
            counter(),
        );

        let ids = registry.metrics().into_keys().collect::<Vec<_>>();

        assert_eq!(
            ids,
            vec![
                MetricId::new("a").with_tag("x", "1"),
                MetricId::new("a").with_tag("x", "2"),
                MetricId::new("b"),
            ]
        );
    }

    #[test]
    fn metadata_is_keyed_by_name() {
        let registry = Registry::new();

        registry.register(
            MetricId::new("latency").with_tag("route", "/"),
            Metadata::new("latency", MetricType::Timer).with_unit("milliseconds"),
            counter(),
        );

        let metadata = registry.metadata();

        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["latency"].unit(), Some("milliseconds"));
    }

    #[test]
    fn remove_drops_metadata_with_last_metric() {
        let registry = Registry::new();
        let first = MetricId::new("m").with_tag("i", "1");
        let second = MetricId::new("m").with_tag("i", "2");

        registry.register(first.clone(), Metadata::new("m", MetricType::Counter), counter());
        registry.register(second.clone(), Metadata::new("m", MetricType::Counter), counter());

        assert!(registry.remove(&first).is_some());
        assert!(registry.metadata().contains_key("m"));

        assert!(registry.remove(&second).is_some());
        assert!(!registry.metadata().contains_key("m"));

        assert!(registry.remove(&second).is_none());
    }

    #[test]
    fn registry_type_names() {
        assert_eq!(RegistryType::Base.to_string(), "base");
        assert_eq!(RegistryType::Vendor.to_string(), "vendor");
        assert_eq!(RegistryType::Application.to_string(), "application");
    }
}
