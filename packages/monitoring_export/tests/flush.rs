//! Flush behavior of the exporter against an in-memory remote service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use monitoring_export::{
    ClientError, Clock, Error, Exporter, ExporterState, GaugeValue, Metadata, Metric,
    MetricDescriptor, MetricId, MetricKind, MetricServiceClient, MetricType, MonitoredResource,
    ProjectName, Registry, RegistryType, TimeSeries, TypedValue, global_resource,
};
use parking_lot::Mutex;

/// A remote service that keeps everything it is sent.
#[derive(Debug, Default)]
struct RecordingClient {
    descriptors: Mutex<Vec<MetricDescriptor>>,
    lookups: AtomicUsize,
    creations: AtomicUsize,
    writes: Mutex<Vec<Vec<TimeSeries>>>,
    // Number of writes that still succeed before one write fails.
    failing_write: Mutex<Option<usize>>,
}

impl RecordingClient {
    /// Lets `successes` more writes through, then fails the one after them.
    fn fail_write_after(&self, successes: usize) {
        *self.failing_write.lock() = Some(successes);
    }

    fn writes(&self) -> Vec<Vec<TimeSeries>> {
        self.writes.lock().clone()
    }
}

impl MetricServiceClient for RecordingClient {
    fn get_metric_descriptor(&self, name: &str) -> Result<MetricDescriptor, ClientError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        self.descriptors
            .lock()
            .iter()
            .find(|descriptor| descriptor.name == name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                name: name.to_string(),
            })
    }

    fn create_metric_descriptor(
        &self,
        _project: &ProjectName,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricDescriptor, ClientError> {
        self.creations.fetch_add(1, Ordering::Relaxed);

        let mut descriptors = self.descriptors.lock();
        descriptors.retain(|existing| existing.name != descriptor.name);
        descriptors.push(descriptor.clone());

        Ok(descriptor.clone())
    }

    fn create_time_series(
        &self,
        _project: &ProjectName,
        time_series: &[TimeSeries],
    ) -> Result<(), ClientError> {
        let mut failing = self.failing_write.lock();

        match *failing {
            Some(0) => {
                *failing = None;
                return Err(ClientError::Unavailable {
                    message: "service unavailable".to_string(),
                });
            }
            Some(remaining) => *failing = Some(remaining - 1),
            None => {}
        }

        self.writes.lock().push(time_series.to_vec());
        Ok(())
    }
}

/// A wall clock that only moves when told to.
#[derive(Clone, Debug)]
struct ManualClock(Arc<Mutex<SystemTime>>);

impl ManualClock {
    fn at_secs(secs: u64) -> Self {
        Self(Arc::new(Mutex::new(at_secs(secs))))
    }

    fn set_secs(&self, secs: u64) {
        *self.0.lock() = at_secs(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.0.lock()
    }
}

fn at_secs(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn counter(registry: &Registry, name: &str, count: i64) {
    registry.register(
        MetricId::new(name),
        Metadata::new(name, MetricType::Counter),
        Metric::Counter(Arc::new(AtomicI64::new(count))),
    );
}

fn exporter(
    client: &Arc<RecordingClient>,
    clock: &ManualClock,
    registry: &Arc<Registry>,
) -> Exporter {
    Exporter::builder(Arc::clone(client))
        .resource(global_resource("test-project"))
        .clock(clock.clone())
        .registry(RegistryType::Application, Arc::clone(registry) as _)
        .build()
}

#[test]
fn successful_flush_advances_watermark() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(1_000);
    let registry = Arc::new(Registry::new());

    // Invalid metric types are written with an unspecified kind, which carries the raw
    // flush interval.
    registry.register(
        MetricId::new("raw"),
        Metadata::new("raw", MetricType::Invalid),
        Metric::Counter(Arc::new(AtomicI64::new(1))),
    );

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    clock.set_secs(1_060);
    exporter.flush().unwrap();

    clock.set_secs(1_120);
    exporter.flush().unwrap();

    let writes = client.writes();
    assert_eq!(writes.len(), 2);

    let first = writes[0][0].points[0].interval;
    assert_eq!(first.start_time, Some(at_secs(1_000)));
    assert_eq!(first.end_time, at_secs(1_060));

    let second = writes[1][0].points[0].interval;
    assert_eq!(second.start_time, Some(at_secs(1_060)));
    assert_eq!(second.end_time, at_secs(1_120));
}

#[test]
fn failed_flush_leaves_watermark_in_place() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(1_000);
    let registry = Arc::new(Registry::new());

    registry.register(
        MetricId::new("raw"),
        Metadata::new("raw", MetricType::Invalid),
        Metric::Counter(Arc::new(AtomicI64::new(1))),
    );

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    clock.set_secs(1_060);
    exporter.flush().unwrap();

    client.fail_write_after(0);
    clock.set_secs(1_120);
    let error = exporter.flush().unwrap_err();
    assert!(error.is_remote());

    clock.set_secs(1_180);
    exporter.flush().unwrap();

    let writes = client.writes();
    assert_eq!(writes.len(), 2);

    let widened = writes[1][0].points[0].interval;
    assert_eq!(widened.start_time, Some(at_secs(1_060)));
    assert_eq!(widened.end_time, at_secs(1_180));
}

#[test]
fn cumulative_points_start_at_initialization() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(500);
    let registry = Arc::new(Registry::new());
    counter(&registry, "requests", 12);

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    for end in [560, 620] {
        clock.set_secs(end);
        exporter.flush().unwrap();
    }

    for (write, end) in client.writes().iter().zip([560, 620]) {
        let series = &write[0];

        assert_eq!(series.metric_kind, MetricKind::Cumulative);
        assert_eq!(series.points[0].value, TypedValue::Int64(12));
        assert_eq!(series.points[0].interval.start_time, Some(at_secs(500)));
        assert_eq!(series.points[0].interval.end_time, at_secs(end));
    }
}

#[test]
fn large_flush_is_written_in_ordered_batches() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());

    for i in 0..450 {
        counter(&registry, &format!("metric.{i:03}"), i);
    }

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    clock.set_secs(60);
    let summary = exporter.flush().unwrap();

    assert_eq!(summary.time_series, 450);
    assert_eq!(summary.requests, 3);

    let writes = client.writes();
    let sizes = writes.iter().map(Vec::len).collect::<Vec<_>>();
    assert_eq!(sizes, vec![200, 200, 50]);

    let written = writes
        .iter()
        .flatten()
        .map(|series| series.metric.metric_type.clone())
        .collect::<Vec<_>>();
    let expected = (0..450)
        .map(|i| format!("custom.googleapis.com/microprofile/application/metric.{i:03}"))
        .collect::<Vec<_>>();
    assert_eq!(written, expected);
}

#[test]
fn failed_batch_aborts_remaining_batches() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());

    for i in 0..450 {
        counter(&registry, &format!("metric.{i:03}"), i);
    }

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    client.fail_write_after(0);
    clock.set_secs(60);

    assert!(matches!(exporter.flush(), Err(Error::Remote(_))));
    assert!(client.writes().is_empty());
}

#[test]
fn failed_middle_batch_keeps_watermark_and_next_flush_rewrites_all() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());

    // Unspecified kind, so points carry the raw flush interval.
    for i in 0..450 {
        let name = format!("metric.{i:03}");
        registry.register(
            MetricId::new(&name),
            Metadata::new(&name, MetricType::Invalid),
            Metric::Counter(Arc::new(AtomicI64::new(i))),
        );
    }

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    clock.set_secs(60);
    exporter.flush().unwrap();

    // First batch lands, second fails, third is never sent.
    client.fail_write_after(1);
    clock.set_secs(120);
    assert!(matches!(exporter.flush(), Err(Error::Remote(_))));

    let writes = client.writes();
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[3].len(), 200);

    clock.set_secs(180);
    let summary = exporter.flush().unwrap();

    assert_eq!(summary.time_series, 450);
    assert_eq!(summary.requests, 3);

    let writes = client.writes();
    let sizes = writes.iter().map(Vec::len).collect::<Vec<_>>();
    assert_eq!(sizes, vec![200, 200, 50, 200, 200, 200, 50]);

    for series in writes[4..].iter().flatten() {
        let interval = series.points[0].interval;

        assert_eq!(interval.start_time, Some(at_secs(60)));
        assert_eq!(interval.end_time, at_secs(180));
    }
}

#[test]
fn descriptors_are_resolved_once() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());
    counter(&registry, "a", 1);
    counter(&registry, "b", 2);

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    for end in [60, 120, 180] {
        clock.set_secs(end);
        exporter.flush().unwrap();
    }

    assert_eq!(client.lookups.load(Ordering::Relaxed), 2);
    assert_eq!(client.creations.load(Ordering::Relaxed), 2);
    assert_eq!(exporter.cached_descriptors(), 2);
}

#[test]
fn existing_descriptors_are_reused_by_new_exporter() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());
    counter(&registry, "a", 1);

    let mut first = exporter(&client, &clock, &registry);
    first.initialize();
    clock.set_secs(60);
    first.flush().unwrap();

    let mut second = exporter(&client, &clock, &registry);
    second.initialize();
    clock.set_secs(120);
    second.flush().unwrap();

    assert_eq!(client.lookups.load(Ordering::Relaxed), 2);
    assert_eq!(client.creations.load(Ordering::Relaxed), 1);
}

#[test]
fn filtered_metrics_are_never_read() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());
    counter(&registry, "visible", 1);

    let read = Arc::new(AtomicBool::new(false));
    let read_in_gauge = Arc::clone(&read);
    registry.register(
        MetricId::new("internal.queue"),
        Metadata::new("internal.queue", MetricType::Gauge),
        Metric::Gauge(Arc::new(move || {
            read_in_gauge.store(true, Ordering::Relaxed);
            GaugeValue::from(1_i32)
        })),
    );

    let mut exporter = Exporter::builder(Arc::clone(&client))
        .resource(global_resource("test-project"))
        .clock(clock.clone())
        .registry(RegistryType::Application, Arc::clone(&registry) as _)
        .filter(|id| !id.name().starts_with("internal."))
        .build();
    exporter.initialize();

    clock.set_secs(60);
    let summary = exporter.flush().unwrap();

    assert_eq!(summary.time_series, 1);
    assert_eq!(summary.skipped, 0);
    assert!(!read.load(Ordering::Relaxed));
}

#[test]
fn bad_metrics_are_skipped_without_failing_flush() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());
    counter(&registry, "good", 1);

    registry.register(
        MetricId::new("unsupported"),
        Metadata::new("unsupported", MetricType::Gauge),
        Metric::Gauge(Arc::new(GaugeValue::unsupported::<Vec<u8>>)),
    );
    registry.register(
        MetricId::new("panicking"),
        Metadata::new("panicking", MetricType::Gauge),
        Metric::Gauge(Arc::new(|| -> GaugeValue { panic!("gauge is broken") })),
    );

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();

    clock.set_secs(60);
    let summary = exporter.flush().unwrap();

    assert_eq!(summary.time_series, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(
        client.writes()[0][0].metric.metric_type,
        "custom.googleapis.com/microprofile/application/good"
    );
}

#[test]
fn exporter_without_project_is_disabled() {
    let client = Arc::new(RecordingClient::default());
    let registry = Arc::new(Registry::new());
    counter(&registry, "a", 1);

    let mut exporter = Exporter::builder(Arc::clone(&client))
        .resource(MonitoredResource::new("gce_instance").with_label("zone", "europe-west1-b"))
        .registry(RegistryType::Base, Arc::clone(&registry) as _)
        .build();

    assert_eq!(exporter.initialize(), ExporterState::Disabled);

    exporter.run_scheduled_flush();
    exporter.shutdown();

    assert!(client.writes().is_empty());
    assert_eq!(client.lookups.load(Ordering::Relaxed), 0);
}

#[test]
fn time_series_carry_resource_and_tags() {
    let client = Arc::new(RecordingClient::default());
    let clock = ManualClock::at_secs(0);
    let registry = Arc::new(Registry::new());

    registry.register(
        MetricId::new("requests").with_tag("route", "/api"),
        Metadata::new("requests", MetricType::Counter),
        Metric::Counter(Arc::new(AtomicI64::new(3))),
    );

    let mut exporter = exporter(&client, &clock, &registry);
    exporter.initialize();
    clock.set_secs(60);
    exporter.flush().unwrap();

    let writes = client.writes();
    let series = &writes[0][0];

    assert_eq!(series.resource, global_resource("test-project"));
    assert_eq!(series.metric.labels.get("route").map(String::as_str), Some("/api"));
    assert_eq!(series.unit, "1");
}
