use std::sync::Arc;
use std::time::SystemTime;

use crate::{
    Config, FlushInterval, MetricKind, MonitoredResource, ProjectName, Result, TimeInterval,
    to_interval,
};

/// Everything needed to turn metric snapshots into time series during one flush.
///
/// Created once per flush. The configuration, resource and project are shared with the
/// exporter; the interval is specific to the flush.
#[derive(Clone, Debug)]
pub struct ExportContext {
    config: Arc<Config>,
    resource: Arc<MonitoredResource>,
    project: ProjectName,
    start_time: SystemTime,
    interval: FlushInterval,
}

impl ExportContext {
    /// Creates the context of a flush covering `interval`, for an exporter that started
    /// at `start_time`.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        resource: Arc<MonitoredResource>,
        project: ProjectName,
        start_time: SystemTime,
        interval: FlushInterval,
    ) -> Self {
        Self {
            config,
            resource,
            project,
            start_time,
            interval,
        }
    }

    /// The exporter configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resource that time series are associated with.
    #[must_use]
    pub fn resource(&self) -> &MonitoredResource {
        &self.resource
    }

    /// The project that time series are written to.
    #[must_use]
    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    /// When the exporter started. Cumulative points accumulate from this instant.
    #[must_use]
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// The span covered by the flush.
    #[must_use]
    pub fn interval(&self) -> FlushInterval {
        self.interval
    }

    /// The interval of a point of the given kind written during this flush.
    ///
    /// * Gauge points are an instant at the end of the flush interval.
    /// * Cumulative points span from the exporter start time to the end of the flush interval.
    /// * Any other points span the flush interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInterval`][crate::Error::InvalidInterval] if the start of the
    /// resulting interval lies after its end.
    pub fn point_interval(&self, kind: MetricKind) -> Result<TimeInterval> {
        let end = self.interval.end;

        match kind {
            MetricKind::Gauge => to_interval(end, end),
            MetricKind::Cumulative => to_interval(self.start_time, end),
            MetricKind::Unspecified | MetricKind::Delta => to_interval(self.interval.start, end),
        }
    }
}
