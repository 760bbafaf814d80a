//! Stand-alone example showcasing `monitoring_export` functionality.
//!
//! This example demonstrates how to:
//! 1. Register metrics of different kinds in a registry
//! 2. Perform fake work that updates the metrics
//! 3. Export the metrics every 2 seconds on a background thread
//! 4. Print the written time series to the console instead of sending them anywhere

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

use monitoring_export::{
    ClientError, Config, Exporter, GaugeValue, Metadata, Metric, MetricDescriptor, MetricId,
    MetricServiceClient, MetricType, ProjectName, Registry, RegistryType, Sample, SampleReader,
    TimeSeries, TypedValue, global_resource,
};
use parking_lot::Mutex;
use tracing::Level;

/// Prints everything it is asked to write.
struct ConsoleClient;

impl MetricServiceClient for ConsoleClient {
    fn get_metric_descriptor(&self, name: &str) -> Result<MetricDescriptor, ClientError> {
        Err(ClientError::NotFound {
            name: name.to_string(),
        })
    }

    fn create_metric_descriptor(
        &self,
        project: &ProjectName,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricDescriptor, ClientError> {
        println!(
            "{project}: created descriptor {} ({:?}, {:?}, unit '{}')",
            descriptor.metric_type, descriptor.metric_kind, descriptor.value_type, descriptor.unit
        );

        Ok(descriptor.clone())
    }

    fn create_time_series(
        &self,
        project: &ProjectName,
        time_series: &[TimeSeries],
    ) -> Result<(), ClientError> {
        println!("{project}: writing {} time series", time_series.len());

        for series in time_series {
            for point in &series.points {
                let value = match &point.value {
                    TypedValue::Int64(value) => value.to_string(),
                    TypedValue::Double(value) => format!("{value:.2}"),
                    TypedValue::Distribution(distribution) => format!(
                        "count={} mean={:.2} buckets={:?}",
                        distribution.count, distribution.mean, distribution.bucket_counts
                    ),
                };

                println!("  {} {:?} = {value}", series.metric.metric_type, series.metric.labels);
            }
        }

        println!();
        Ok(())
    }
}

/// A timer that keeps the durations recorded since the last sample.
#[derive(Default)]
struct WorkTimer {
    durations: Mutex<Vec<i64>>,
}

impl WorkTimer {
    fn record(&self, duration: Duration) {
        self.durations
            .lock()
            .push(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX));
    }
}

impl SampleReader for WorkTimer {
    fn sample(&self) -> Sample {
        Sample::from_values(self.durations.lock().drain(..).collect())
    }
}

fn main() {
    // Exit early if running in a testing environment.
    if env::var("IS_TESTING").is_ok() {
        println!("Running in testing mode - exiting immediately");
        return;
    }

    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let registry = Arc::new(Registry::new());

    let items = Arc::new(AtomicI64::new(0));
    registry.register(
        MetricId::new("work_items_processed").with_tag("_app", "console"),
        Metadata::new("work_items_processed", MetricType::Counter)
            .with_description("Number of work items processed"),
        Metric::Counter(items.clone()),
    );

    let timer = Arc::new(WorkTimer::default());
    registry.register(
        MetricId::new("work_duration").with_tag("_app", "console"),
        Metadata::new("work_duration", MetricType::Timer).with_unit("milliseconds"),
        Metric::Timer(timer.clone()),
    );

    let queue_items = Arc::clone(&items);
    registry.register(
        MetricId::new("work_queue_fill"),
        Metadata::new("work_queue_fill", MetricType::Gauge).with_unit("percent"),
        Metric::Gauge(Arc::new(move || {
            GaugeValue::from(queue_items.load(Ordering::Relaxed).wrapping_rem(10).wrapping_mul(10))
        })),
    );

    let handle = Exporter::builder(ConsoleClient)
        .config(Config::builder().sampling_rate(Duration::from_secs(2)).build())
        .resource(global_resource("console-example"))
        .registry(RegistryType::Application, registry)
        .build()
        .start()
        .expect("failed to start exporter");

    println!("Doing fake work for 7 seconds, metrics are exported every 2 seconds.");
    println!();

    for i in 0..70_u64 {
        let duration = Duration::from_millis(i.wrapping_rem(20).wrapping_add(1));
        thread::sleep(duration);

        timer.record(duration);
        items.fetch_add(1, Ordering::Relaxed);

        thread::sleep(Duration::from_millis(80));
    }

    // Dropping the handle flushes one final time before the exporter stops.
    drop(handle);
}
