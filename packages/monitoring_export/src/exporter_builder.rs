use std::fmt;
use std::sync::Arc;

use crate::exporter::MetricFilter;
use crate::{
    Clock, Config, Exporter, MetricId, MetricRegistry, MetricServiceClient, MonitoredResource,
    RegistryType, ResourceProvider, SystemClock,
};

/// Creates instances of [`Exporter`].
///
/// Use `Exporter::builder()` to create a new instance of this builder.
///
/// Without a resource, the exporter resolves a `global` resource without a project and
/// disables itself when initialized.
pub struct ExporterBuilder {
    client: Box<dyn MetricServiceClient>,
    resource_provider: Box<dyn ResourceProvider>,
    clock: Box<dyn Clock>,
    config: Config,
    registries: Vec<(RegistryType, Arc<dyn MetricRegistry>)>,
    filters: Vec<MetricFilter>,
}

impl ExporterBuilder {
    pub(crate) fn new(client: Box<dyn MetricServiceClient>) -> Self {
        Self {
            client,
            resource_provider: Box::new(MonitoredResource::new("global")),
            clock: Box::new(SystemClock),
            config: Config::default(),
            registries: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Sets the configuration. Defaults to `Config::default()`.
    #[must_use]
    pub fn config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    /// Sets the source of the monitored resource that time series are associated with.
    #[must_use]
    pub fn resource(self, resource_provider: impl ResourceProvider + 'static) -> Self {
        Self {
            resource_provider: Box::new(resource_provider),
            ..self
        }
    }

    /// Adds a registry whose metrics are exported.
    ///
    /// Registries are exported in the order they are added.
    #[must_use]
    pub fn registry(
        mut self,
        registry_type: RegistryType,
        registry: Arc<dyn MetricRegistry>,
    ) -> Self {
        self.registries.push((registry_type, registry));
        self
    }

    /// Adds a filter. Only metrics accepted by every filter are exported.
    ///
    /// Filters are evaluated before the value of a metric is read.
    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&MetricId) -> bool + Send + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Sets the wall clock that flush intervals are stamped with. Defaults to the system clock.
    #[must_use]
    pub fn clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            ..self
        }
    }

    /// Builds the exporter. It is not initialized yet.
    #[must_use]
    pub fn build(self) -> Exporter {
        Exporter::new(
            self.client,
            self.resource_provider,
            self.clock,
            Arc::new(self.config),
            self.registries,
            self.filters,
        )
    }
}

impl fmt::Debug for ExporterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterBuilder")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("registries", &self.registries.len())
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{ExporterState, MockMetricServiceClient};

    #[test]
    fn defaults_disable_on_initialize() {
        let mut exporter = Exporter::builder(MockMetricServiceClient::new()).build();

        assert_eq!(exporter.initialize(), ExporterState::Disabled);
    }

    #[test]
    fn config_is_applied() {
        let exporter = Exporter::builder(MockMetricServiceClient::new())
            .config(Config::builder().sampling_rate(Duration::from_secs(5)).build())
            .build();

        assert_eq!(exporter.config().sampling_rate(), Duration::from_secs(5));
    }

    #[test]
    fn debug_output_lists_settings() {
        let builder = Exporter::builder(MockMetricServiceClient::new())
            .filter(|id| id.name() != "ignored");

        let output = format!("{builder:?}");

        assert!(output.contains("filters: 1"));
    }
}
