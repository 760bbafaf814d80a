//! Data exchanged with the remote monitoring service.
//!
//! These types mirror the wire format of the service: plain data with public fields.

#![allow(
    clippy::exhaustive_structs,
    clippy::exhaustive_enums,
    reason = "the wire format is fixed, so are these types"
)]

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::time::SystemTime;

/// How the points of a time series relate to each other in time.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MetricKind {
    /// Not specified. Points carry the raw flush interval.
    #[default]
    Unspecified,

    /// An instantaneous measurement. Points carry only an end time.
    Gauge,

    /// The change in a value during the point's interval.
    Delta,

    /// A value accumulated from a fixed start time. Intervals of successive points share the
    /// start time and grow.
    Cumulative,
}

/// The type of the values in a time series.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ValueType {
    /// Not specified.
    #[default]
    Unspecified,

    /// A 64-bit signed integer.
    Int64,

    /// A double precision floating point number.
    Double,

    /// A histogram of values.
    Distribution,
}

/// Maturity of a metric descriptor.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum LaunchStage {
    /// Not specified.
    #[default]
    Unspecified,

    /// Early access.
    Alpha,

    /// Public preview.
    Beta,

    /// Generally available.
    Ga,

    /// Scheduled for removal.
    Deprecated,
}

/// The type of the values of a label.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum LabelValueType {
    /// A string.
    #[default]
    String,

    /// A boolean.
    Bool,

    /// A 64-bit signed integer.
    Int64,
}

/// Describes one label of a metric.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct LabelDescriptor {
    /// The label key.
    pub key: String,

    /// The type of the label values.
    pub value_type: LabelValueType,

    /// Human-readable description of the label.
    pub description: String,
}

/// The remote schema of a metric.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricDescriptor {
    /// Resource name, `projects/{project}/metricDescriptors/{type}`.
    pub name: String,

    /// The metric type, e.g. `custom.googleapis.com/microprofile/base/cpu.systemLoadAverage`.
    pub metric_type: String,

    /// The labels time series of this metric may carry.
    pub labels: Vec<LabelDescriptor>,

    /// How the points relate to each other in time.
    pub metric_kind: MetricKind,

    /// The type of the point values.
    pub value_type: ValueType,

    /// The unit of the point values, in UCUM notation.
    pub unit: String,

    /// Human-readable description.
    pub description: String,

    /// Human-readable name.
    pub display_name: String,

    /// Maturity of the metric.
    pub launch_stage: LaunchStage,

    /// The monitored resource types time series of this metric may be associated with.
    pub monitored_resource_types: Vec<String>,
}

/// The entity that produced a time series, e.g. a VM instance or a container.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct MonitoredResource {
    /// The resource type, e.g. `gce_instance` or `global`.
    pub resource_type: String,

    /// Labels identifying the resource. Includes the project id.
    pub labels: BTreeMap<String, String>,
}

impl MonitoredResource {
    /// The resource label that carries the project id.
    pub const PROJECT_ID_LABEL: &'static str = "project_id";

    /// Creates a resource of the given type with no labels.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label to the resource.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// The project the resource belongs to, if known.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.labels
            .get(Self::PROJECT_ID_LABEL)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// The project scope of remote calls, `projects/{project}`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProjectName(String);

impl ProjectName {
    /// Creates the project scope for a project id.
    #[must_use]
    pub fn new(project_id: &str) -> Self {
        Self(format!("projects/{project_id}"))
    }

    /// The project scope as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The time span a point applies to.
///
/// Without a start time, the interval is a single instant.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TimeInterval {
    /// Start of the interval, exclusive. `None` for an instant.
    pub start_time: Option<SystemTime>,

    /// End of the interval, inclusive.
    pub end_time: SystemTime,
}

/// Rule generating the upper bounds of histogram buckets.
///
/// Each rule yields a number of finite buckets. An underflow bucket precedes them and an
/// overflow bucket follows them.
#[derive(Clone, Debug, PartialEq)]
pub enum BucketOptions {
    /// Bucket `i` has the upper bound `offset + width * i`.
    Linear {
        /// Number of finite buckets.
        num_finite_buckets: u32,

        /// Distance between bucket bounds.
        width: f64,

        /// Upper bound of the underflow bucket.
        offset: f64,
    },

    /// Bucket `i` has the upper bound `scale * growth_factor ^ i`.
    Exponential {
        /// Number of finite buckets.
        num_finite_buckets: u32,

        /// Ratio between successive bucket bounds. Must be greater than 1.
        growth_factor: f64,

        /// Upper bound of the underflow bucket.
        scale: f64,
    },

    /// Bucket bounds are listed explicitly, in ascending order.
    Explicit {
        /// The bucket bounds.
        bounds: Vec<f64>,
    },
}

/// A histogram of values.
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution {
    /// Number of values. Equal to the sum of `bucket_counts`.
    pub count: i64,

    /// Arithmetic mean of the values.
    pub mean: f64,

    /// Sum of squared deviations from the mean.
    pub sum_of_squared_deviation: f64,

    /// The rule that generated the bucket bounds.
    pub bucket_options: BucketOptions,

    /// Number of values in each bucket, underflow bucket first, overflow bucket last.
    pub bucket_counts: Vec<i64>,
}

/// A single value of a point.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    /// A 64-bit signed integer.
    Int64(i64),

    /// A double precision floating point number.
    Double(f64),

    /// A histogram.
    Distribution(Distribution),
}

impl TypedValue {
    /// The value type of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int64(_) => ValueType::Int64,
            Self::Double(_) => ValueType::Double,
            Self::Distribution(_) => ValueType::Distribution,
        }
    }
}

/// One observation: a value and the interval it applies to.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    /// The interval the value applies to.
    pub interval: TimeInterval,

    /// The observed value.
    pub value: TypedValue,
}

/// Identifies the metric a time series belongs to.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct MetricRef {
    /// The metric type, as in [`MetricDescriptor::metric_type`].
    pub metric_type: String,

    /// Label values of this time series.
    pub labels: BTreeMap<String, String>,
}

/// Points of one metric from one monitored resource.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    /// The metric the points belong to.
    pub metric: MetricRef,

    /// The resource the points came from.
    pub resource: MonitoredResource,

    /// How the points relate to each other in time.
    pub metric_kind: MetricKind,

    /// The type of the point values.
    pub value_type: ValueType,

    /// The points. The exporter writes exactly one point per time series.
    pub points: Vec<Point>,

    /// The unit of the point values.
    pub unit: String,
}
