use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use itertools::Itertools;
use tokio::sync::oneshot;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, trace, warn};

use crate::{
    Clock, Config, DescriptorCache, Error, ExportContext, ExportHandle, ExporterBuilder,
    FlushInterval, MAX_TIME_SERIES_PER_REQUEST, Metadata, MetricId, MetricRef, MetricRegistry,
    MetricServiceClient, MonitoredResource, ProjectName, RegistryType, ResourceProvider, Result,
    Snapshot, TimeSeries,
};

/// Name of the thread that [`Exporter::start()`] runs the exporter on.
pub const EXPORTER_THREAD_NAME: &str = "monitoring-export";

pub(crate) type MetricFilter = Box<dyn Fn(&MetricId) -> bool + Send>;

/// Lifecycle state of an [`Exporter`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ExporterState {
    /// Created but not yet initialized.
    Uninitialized,

    /// Initialization found no project to export to. Exporting is a no-op for the rest of the
    /// life of the exporter.
    Disabled,

    /// Initialized and exporting.
    Running,

    /// Shut down. Exporting is a no-op.
    Stopped,
}

/// Outcome of a successful flush.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct FlushSummary {
    /// Number of time series written.
    pub time_series: usize,

    /// Number of write requests issued.
    pub requests: usize,

    /// Number of metrics that were not exported because they are of a kind that is not
    /// exported, have no metadata or could not be converted.
    pub skipped: usize,
}

enum State {
    Uninitialized,
    Disabled,
    Running(Watermark),
    Stopped,
}

/// The export bookkeeping of a running exporter.
struct Watermark {
    resource: Arc<MonitoredResource>,
    project: ProjectName,

    // When the exporter was initialized. Cumulative points accumulate from here.
    start_time: SystemTime,

    // End of the last successful flush. Never moves backwards.
    previous_end: Option<SystemTime>,
}

impl Watermark {
    fn has_flushed(&self) -> bool {
        self.previous_end.is_some()
    }
}

/// A metric captured during a flush, waiting to be converted into a time series.
struct Captured {
    registry_type: RegistryType,
    id: MetricId,
    metadata: Metadata,
    snapshot: Snapshot,
}

/// Periodically exports the metrics of a set of registries as time series to a remote
/// monitoring service.
///
/// Every flush captures a snapshot of every metric, converts the snapshots into time series
/// (creating remote metric descriptors as needed) and writes them in batches. The span of time
/// covered by a flush starts where the previous successful flush ended, so a failed flush is
/// covered by the next one.
///
/// The exporter can be driven manually via [`initialize()`][Self::initialize] and
/// [`flush()`][Self::flush], on an existing async runtime via [`run_until()`][Self::run_until]
/// or on a dedicated thread via [`start()`][Self::start].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicI64;
///
/// use monitoring_export::{
///     ClientError, Exporter, ExporterState, Metadata, Metric, MetricDescriptor, MetricId,
///     MetricServiceClient, MetricType, ProjectName, Registry, RegistryType, TimeSeries,
///     global_resource,
/// };
///
/// struct DiscardingClient;
///
/// impl MetricServiceClient for DiscardingClient {
///     fn get_metric_descriptor(&self, name: &str) -> Result<MetricDescriptor, ClientError> {
///         Err(ClientError::NotFound { name: name.to_string() })
///     }
///
///     fn create_metric_descriptor(
///         &self,
///         _project: &ProjectName,
///         descriptor: &MetricDescriptor,
///     ) -> Result<MetricDescriptor, ClientError> {
///         Ok(descriptor.clone())
///     }
///
///     fn create_time_series(
///         &self,
///         _project: &ProjectName,
///         _time_series: &[TimeSeries],
///     ) -> Result<(), ClientError> {
///         Ok(())
///     }
/// }
///
/// let registry = Arc::new(Registry::new());
/// registry.register(
///     MetricId::new("requests"),
///     Metadata::new("requests", MetricType::Counter),
///     Metric::Counter(Arc::new(AtomicI64::new(3))),
/// );
///
/// let mut exporter = Exporter::builder(DiscardingClient)
///     .resource(global_resource("my-project"))
///     .registry(RegistryType::Application, registry)
///     .build();
///
/// assert_eq!(exporter.initialize(), ExporterState::Running);
///
/// let summary = exporter.flush().unwrap();
/// assert_eq!(summary.time_series, 1);
/// ```
pub struct Exporter {
    client: Box<dyn MetricServiceClient>,
    resource_provider: Box<dyn ResourceProvider>,
    clock: Box<dyn Clock>,
    config: Arc<Config>,
    registries: Vec<(RegistryType, Arc<dyn MetricRegistry>)>,
    filters: Vec<MetricFilter>,

    descriptors: DescriptorCache,
    state: State,
}

impl Exporter {
    /// Creates a builder for an exporter that writes to the remote service via `client`.
    #[must_use]
    pub fn builder(client: impl MetricServiceClient + 'static) -> ExporterBuilder {
        ExporterBuilder::new(Box::new(client))
    }

    pub(crate) fn new(
        client: Box<dyn MetricServiceClient>,
        resource_provider: Box<dyn ResourceProvider>,
        clock: Box<dyn Clock>,
        config: Arc<Config>,
        registries: Vec<(RegistryType, Arc<dyn MetricRegistry>)>,
        filters: Vec<MetricFilter>,
    ) -> Self {
        Self {
            client,
            resource_provider,
            clock,
            config,
            registries,
            filters,
            descriptors: DescriptorCache::new(),
            state: State::Uninitialized,
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ExporterState {
        match self.state {
            State::Uninitialized => ExporterState::Uninitialized,
            State::Disabled => ExporterState::Disabled,
            State::Running(_) => ExporterState::Running,
            State::Stopped => ExporterState::Stopped,
        }
    }

    /// The configuration of the exporter.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of remote descriptors resolved so far.
    #[must_use]
    pub fn cached_descriptors(&self) -> usize {
        self.descriptors.len()
    }

    /// Resolves the monitored resource and starts the export bookkeeping.
    ///
    /// If the resource has no project id, the exporter disables itself permanently. Calling
    /// this on an exporter that is already initialized has no effect.
    pub fn initialize(&mut self) -> ExporterState {
        if !matches!(self.state, State::Uninitialized) {
            return self.state();
        }

        let resource = self.resource_provider.resolve();

        let Some(project_id) = resource.project_id() else {
            error!(
                resource_type = %resource.resource_type,
                "no project id for the monitored resource, metrics export is disabled"
            );
            self.state = State::Disabled;
            return self.state();
        };

        let project = ProjectName::new(project_id);
        let start_time = self.clock.now();

        info!(
            %project,
            resource_type = %resource.resource_type,
            sampling_rate = ?self.config.sampling_rate(),
            "metrics export initialized"
        );

        self.state = State::Running(Watermark {
            resource: Arc::new(resource),
            project,
            start_time,
            previous_end: None,
        });

        self.state()
    }

    /// Exports the current value of every metric.
    ///
    /// The flush covers the span from the end of the previous successful flush (or from
    /// initialization) to now. Metrics that cannot be captured or converted are logged and
    /// skipped. The watermark only advances if every write succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] if the exporter is not running and
    /// [`Error::Remote`] if a call to the remote service fails. In the latter case the
    /// remaining batches of the flush are not written.
    pub fn flush(&mut self) -> Result<FlushSummary> {
        let State::Running(watermark) = &self.state else {
            return Err(Error::NotRunning);
        };

        let start = watermark.previous_end.unwrap_or(watermark.start_time);
        // The wall clock may step backwards. The watermark must not.
        let end = self.clock.now().max(start);

        let ctx = ExportContext::new(
            Arc::clone(&self.config),
            Arc::clone(&watermark.resource),
            watermark.project.clone(),
            watermark.start_time,
            FlushInterval::new(start, end),
        );

        let mut summary = FlushSummary::default();

        let captured = self.capture(&mut summary);
        let time_series = self.convert(&ctx, captured, &mut summary)?;

        summary.time_series = time_series.len();

        for batch in &time_series.into_iter().chunks(MAX_TIME_SERIES_PER_REQUEST) {
            let batch = batch.collect_vec();

            self.client.create_time_series(ctx.project(), &batch)?;
            summary.requests = summary.requests.saturating_add(1);
        }

        if let State::Running(watermark) = &mut self.state {
            watermark.previous_end = Some(end);
        }

        debug!(
            time_series = summary.time_series,
            requests = summary.requests,
            skipped = summary.skipped,
            "metrics flushed"
        );

        Ok(summary)
    }

    /// Flushes if running, logging the outcome. This is the body of each scheduled tick.
    pub fn run_scheduled_flush(&mut self) {
        if !matches!(self.state, State::Running(_)) {
            trace!(state = ?self.state(), "skipping scheduled flush");
            return;
        }

        if let Err(e) = self.flush() {
            error!(
                error = %e,
                "metrics flush failed, the next flush will cover the missed interval"
            );
        }
    }

    /// Initializes the exporter and flushes at the configured sampling rate until `shutdown`
    /// completes, then shuts the exporter down.
    ///
    /// The first flush happens after the configured initial delay. Flushes keep a fixed rate
    /// measured from that first flush: if a flush takes longer than the sampling rate, the
    /// missed flushes follow right after it and the schedule returns to its original phase.
    /// Flushes never overlap. A flush in progress when `shutdown` completes is finished first.
    ///
    /// Returns immediately if the exporter is disabled during initialization.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.initialize() != ExporterState::Running {
            self.shutdown();
            return;
        }

        let mut ticks = flush_schedule(&self.config);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticks.tick() => self.run_scheduled_flush(),
            }
        }

        self.shutdown();
    }

    /// Stops the exporter.
    ///
    /// If at least one flush has succeeded, a final flush covers the span since the last one.
    /// Calling this again has no effect.
    pub fn shutdown(&mut self) {
        if let State::Running(watermark) = &self.state {
            if watermark.has_flushed() {
                if let Err(e) = self.flush() {
                    error!(error = %e, "final metrics flush failed");
                }
            }

            info!("metrics export stopped");
        }

        self.state = State::Stopped;
    }

    /// Runs the exporter on a dedicated thread until the returned handle is shut down or
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the thread or its async runtime cannot be created.
    pub fn start(self) -> Result<ExportHandle> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(EXPORTER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut exporter = self;

                runtime.block_on(exporter.run_until(async {
                    // A dropped sender means the handle is gone. Stop either way.
                    _ = shutdown_rx.await;
                }));
            })?;

        Ok(ExportHandle::new(shutdown_tx, thread))
    }

    fn capture(&self, summary: &mut FlushSummary) -> Vec<Captured> {
        let mut captured = Vec::new();

        for (registry_type, registry) in &self.registries {
            let metadata = registry.metadata();

            for (id, metric) in registry.metrics() {
                if !self.filters.iter().all(|filter| filter(&id)) {
                    continue;
                }

                let snapshot = match Snapshot::capture(&id, &metric) {
                    Ok(Some(snapshot)) => snapshot,
                    Ok(None) => {
                        trace!(metric = %id, "metric kind is not exported");
                        summary.skipped = summary.skipped.saturating_add(1);
                        continue;
                    }
                    Err(e) => {
                        warn!(metric = %id, error = %e, "skipping metric, snapshot failed");
                        summary.skipped = summary.skipped.saturating_add(1);
                        continue;
                    }
                };

                let Some(metadata) = metadata.get(id.name()) else {
                    warn!(metric = %id, "skipping metric without metadata");
                    summary.skipped = summary.skipped.saturating_add(1);
                    continue;
                };

                captured.push(Captured {
                    registry_type: *registry_type,
                    id,
                    metadata: metadata.clone(),
                    snapshot,
                });
            }
        }

        captured
    }

    fn convert(
        &mut self,
        ctx: &ExportContext,
        captured: Vec<Captured>,
        summary: &mut FlushSummary,
    ) -> Result<Vec<TimeSeries>> {
        let mut time_series = Vec::with_capacity(captured.len());

        for item in captured {
            let descriptor = self.descriptors.resolve(
                &*self.client,
                ctx,
                item.registry_type,
                &item.id,
                &item.metadata,
                &item.snapshot,
            )?;

            let point = match item.snapshot.to_point(ctx, descriptor, &item.metadata) {
                Ok(point) => point,
                Err(e @ Error::MissingBucketOptions { .. }) => {
                    error!(
                        metric = %item.id,
                        error = %e,
                        "skipping metric, configuration is incomplete"
                    );
                    summary.skipped = summary.skipped.saturating_add(1);
                    continue;
                }
                Err(e) => {
                    warn!(metric = %item.id, error = %e, "skipping metric, conversion failed");
                    summary.skipped = summary.skipped.saturating_add(1);
                    continue;
                }
            };

            time_series.push(TimeSeries {
                metric: MetricRef {
                    metric_type: descriptor.metric_type.clone(),
                    labels: item.id.tags().clone(),
                },
                resource: ctx.resource().clone(),
                metric_kind: descriptor.metric_kind,
                value_type: descriptor.value_type,
                points: vec![point],
                unit: descriptor.unit.clone(),
            });
        }

        Ok(time_series)
    }
}

/// Fixed-rate ticks, the first one after the initial delay.
fn flush_schedule(config: &Config) -> Interval {
    let now = Instant::now();
    let first_tick = now.checked_add(config.initial_delay()).unwrap_or(now);

    let mut ticks = interval_at(first_tick, config.sampling_rate());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
    ticks
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("config", &self.config)
            .field("state", &self.state())
            .field(
                "registries",
                &self
                    .registries
                    .iter()
                    .map(|(registry_type, _)| registry_type)
                    .collect_vec(),
            )
            .field("filters", &self.filters.len())
            .field("descriptors", &self.descriptors.len())
            .finish_non_exhaustive()
    }
}
