#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! # monitoring_export
//!
//! Periodically exports the metrics held by metric registries as time series to a cloud
//! monitoring service.
//!
//! Applications register live metrics (gauges, counters, histograms, timers, ...) in one or
//! more registries. An [`Exporter`] takes a snapshot of every metric at a fixed rate, converts
//! the snapshots into time series and writes them to the remote service via a
//! [`MetricServiceClient`] provided by the application.
//!
//! # Registering metrics
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicI64;
//!
//! use monitoring_export::{GaugeValue, Metadata, Metric, MetricId, MetricType, Registry};
//!
//! let registry = Registry::new();
//!
//! let requests = Arc::new(AtomicI64::new(0));
//! registry.register(
//!     MetricId::new("requests").with_tag("route", "/api"),
//!     Metadata::new("requests", MetricType::Counter).with_description("Requests served"),
//!     Metric::Counter(requests.clone()),
//! );
//!
//! registry.register(
//!     MetricId::new("load"),
//!     Metadata::new("load", MetricType::Gauge).with_unit("percent"),
//!     Metric::Gauge(Arc::new(|| GaugeValue::from(42.5_f64))),
//! );
//! ```
//!
//! # Exporting
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use monitoring_export::{Config, Exporter, Registry, RegistryType, global_resource};
//! # use monitoring_export::{ClientError, MetricDescriptor, MetricServiceClient, ProjectName, TimeSeries};
//! # struct MyClient;
//! # impl MetricServiceClient for MyClient {
//! #     fn get_metric_descriptor(&self, name: &str) -> Result<MetricDescriptor, ClientError> {
//! #         Err(ClientError::NotFound { name: name.to_string() })
//! #     }
//! #     fn create_metric_descriptor(&self, _: &ProjectName, d: &MetricDescriptor) -> Result<MetricDescriptor, ClientError> {
//! #         Ok(d.clone())
//! #     }
//! #     fn create_time_series(&self, _: &ProjectName, _: &[TimeSeries]) -> Result<(), ClientError> {
//! #         Ok(())
//! #     }
//! # }
//!
//! let registry = Arc::new(Registry::new());
//!
//! let mut handle = Exporter::builder(MyClient)
//!     .config(Config::builder().high_resolution(true).build())
//!     .resource(global_resource("my-project"))
//!     .registry(RegistryType::Application, registry)
//!     .filter(|id| !id.name().starts_with("debug."))
//!     .build()
//!     .start()
//!     .unwrap();
//!
//! // ... run the application ...
//!
//! handle.shutdown();
//! ```
//!
//! # Flush semantics
//!
//! Each flush covers the span from the end of the previous successful flush to now. If a write
//! fails, the next flush covers the missed span as well. Writing overlapping data is preferred
//! over losing data.
//!
//! * Counters and metered metrics are cumulative: their points span from the moment the
//!   exporter was initialized.
//! * Gauges, concurrent gauges, histograms and timers are instantaneous.
//! * Histograms and timers are exported as distributions, with bucket bounds taken from the
//!   [`Config`] for the metric type and unit.
//!
//! Time series are written in batches of at most [`MAX_TIME_SERIES_PER_REQUEST`].
//!
//! # Failure handling
//!
//! Failures never propagate into the application. They are reported via `tracing`:
//!
//! * A metric that cannot be read or converted is skipped (`warn`).
//! * A failed remote call aborts the flush (`error`). The next flush retries.
//! * A resource without a project id disables the exporter for good (`error`, once).

pub mod buckets;
mod client;
mod clock;
mod config;
mod context;
mod descriptors;
mod error;
mod exporter;
mod exporter_builder;
mod handle;
mod identity;
mod interval;
mod metadata;
mod metric;
mod model;
mod registry;
mod resource;
mod snapshot;
pub mod units;

pub use client::*;
pub use clock::*;
pub use config::*;
pub use context::*;
pub use descriptors::*;
pub use error::Error;
pub(crate) use error::Result;
pub use exporter::{EXPORTER_THREAD_NAME, Exporter, ExporterState, FlushSummary};
pub use exporter_builder::*;
pub use handle::*;
pub use identity::*;
pub use interval::*;
pub use metadata::*;
pub use metric::*;
pub use model::*;
pub use registry::*;
pub use resource::*;
pub use snapshot::*;
