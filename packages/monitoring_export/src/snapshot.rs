//! Point-in-time captures of live metrics and their conversion into points.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::buckets::bucket_counts;
use crate::units::{identity_value_converter, nanos_per_unit, timer_value_converter};
use crate::{
    Distribution, Error, ExportContext, GaugeValue, Metadata, Metric, MetricDescriptor, MetricId,
    MetricType, Point, Result, Sample, TypedValue, ValueType,
};

/// A numeric gauge reading, normalized to the two numeric value types of the remote service.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum NumberValue {
    /// An integer reading.
    Int(i64),

    /// A floating point reading.
    Double(f64),
}

/// An immutable capture of the value of a live metric.
///
/// The remote value type of a metric is inferred from the shape of its snapshot, not from its
/// metadata.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Snapshot {
    /// The reading of a gauge.
    Gauge(NumberValue),

    /// The number of parallel invocations of a concurrent gauge.
    ConcurrentGauge {
        /// The count at the time of capture.
        count: i64,
    },

    /// The count of a counter.
    Counter {
        /// The count at the time of capture.
        count: i64,
    },

    /// The count of a metered metric.
    Metered {
        /// The count at the time of capture.
        count: i64,
    },

    /// The sample of a histogram.
    Histogram(Sample),

    /// The sample of a timer. Values are in nanoseconds.
    Timer(Sample),
}

impl Snapshot {
    /// Captures the current value of a live metric.
    ///
    /// Returns `Ok(None)` for metric kinds that are not exported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedGaugeValue`] if a gauge produces a reading that is not
    /// numeric and [`Error::MetricPanicked`] if reading the metric panics.
    pub fn capture(id: &MetricId, metric: &Metric) -> Result<Option<Self>> {
        let reading = catch_unwind(AssertUnwindSafe(|| read(metric))).map_err(|payload| {
            Error::MetricPanicked {
                metric: id.to_string(),
                message: panic_message(payload.as_ref()),
            }
        })?;

        match reading {
            Reading::Gauge(value) => Ok(Some(Self::Gauge(number_value(id, value)?))),
            Reading::Snapshot(snapshot) => Ok(Some(snapshot)),
            Reading::Unsupported => Ok(None),
        }
    }

    /// The remote value type this snapshot is naturally expressed as.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Gauge(NumberValue::Int(_))
            | Self::ConcurrentGauge { .. }
            | Self::Counter { .. }
            | Self::Metered { .. } => ValueType::Int64,
            Self::Gauge(NumberValue::Double(_)) => ValueType::Double,
            Self::Histogram(_) | Self::Timer(_) => ValueType::Distribution,
        }
    }

    /// Converts the snapshot into a point of a time series with the given descriptor.
    ///
    /// The interval of the point follows from the metric kind of the descriptor. The value is
    /// expressed in the value type of the descriptor; numbers are converted between integer
    /// and floating point as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueTypeMismatch`] if the snapshot cannot be expressed in the value
    /// type of the descriptor, [`Error::MissingBucketOptions`] if a distribution has no
    /// configured bucket options and [`Error::InvalidInterval`] if the export context yields
    /// an interval that ends before it starts.
    pub fn to_point(
        &self,
        ctx: &ExportContext,
        descriptor: &MetricDescriptor,
        metadata: &Metadata,
    ) -> Result<Point> {
        let interval = ctx.point_interval(descriptor.metric_kind)?;
        let value = self.to_value(ctx, descriptor, metadata)?;

        Ok(Point { interval, value })
    }

    fn to_value(
        &self,
        ctx: &ExportContext,
        descriptor: &MetricDescriptor,
        metadata: &Metadata,
    ) -> Result<TypedValue> {
        let expected = descriptor.value_type;

        let mismatch = || Error::ValueTypeMismatch {
            metric: metadata.name().to_string(),
            expected,
            actual: self.value_type(),
        };

        match self {
            Self::Gauge(value) => match (expected, value) {
                (ValueType::Distribution, _) => Err(mismatch()),
                (ValueType::Double, value) => Ok(TypedValue::Double(as_double(*value))),
                (ValueType::Int64, value) => Ok(TypedValue::Int64(as_int(*value))),
                (ValueType::Unspecified, NumberValue::Int(value)) => Ok(TypedValue::Int64(*value)),
                (ValueType::Unspecified, NumberValue::Double(value)) => {
                    Ok(TypedValue::Double(*value))
                }
            },
            Self::ConcurrentGauge { count } | Self::Counter { count } | Self::Metered { count } => {
                match expected {
                    ValueType::Distribution => Err(mismatch()),
                    ValueType::Double => {
                        Ok(TypedValue::Double(as_double(NumberValue::Int(*count))))
                    }
                    ValueType::Int64 | ValueType::Unspecified => Ok(TypedValue::Int64(*count)),
                }
            }
            Self::Histogram(sample) => match expected {
                ValueType::Distribution | ValueType::Unspecified => Ok(TypedValue::Distribution(
                    to_distribution(ctx, sample, MetricType::Histogram, metadata.unit())?,
                )),
                ValueType::Int64 | ValueType::Double => Err(mismatch()),
            },
            Self::Timer(sample) => match expected {
                ValueType::Distribution | ValueType::Unspecified => Ok(TypedValue::Distribution(
                    to_distribution(ctx, sample, MetricType::Timer, metadata.unit())?,
                )),
                ValueType::Int64 | ValueType::Double => Err(mismatch()),
            },
        }
    }
}

/// Tallies a sample into a distribution with the bucket options configured for the metric type
/// and unit. Timer samples are converted from nanoseconds into the unit first.
fn to_distribution(
    ctx: &ExportContext,
    sample: &Sample,
    metric_type: MetricType,
    unit: Option<&str>,
) -> Result<Distribution> {
    let bucket_options = ctx.config().bucket_options(metric_type, unit)?.clone();

    let (bucket_counts, divisor) = if metric_type == MetricType::Timer {
        (
            bucket_counts(&bucket_options, sample.values(), timer_value_converter(unit)),
            nanos_per_unit(unit),
        )
    } else {
        (
            bucket_counts(&bucket_options, sample.values(), identity_value_converter),
            1.0,
        )
    };

    let std_dev = sample.std_dev() / divisor;

    #[expect(
        clippy::cast_precision_loss,
        reason = "sample sizes are far below the range where f64 loses integer precision"
    )]
    let sum_of_squared_deviation = std_dev * std_dev * sample.len() as f64;

    Ok(Distribution {
        count: i64::try_from(sample.len()).unwrap_or(i64::MAX),
        mean: sample.mean() / divisor,
        sum_of_squared_deviation,
        bucket_options,
        bucket_counts,
    })
}

/// The raw outcome of reading a live metric, before any validation.
enum Reading {
    Gauge(GaugeValue),
    Snapshot(Snapshot),
    Unsupported,
}

fn read(metric: &Metric) -> Reading {
    match metric {
        Metric::Gauge(reader) => Reading::Gauge(reader.value()),
        Metric::ConcurrentGauge(reader) => Reading::Snapshot(Snapshot::ConcurrentGauge {
            count: reader.count(),
        }),
        Metric::Counter(reader) => Reading::Snapshot(Snapshot::Counter {
            count: reader.count(),
        }),
        Metric::Metered(reader) => Reading::Snapshot(Snapshot::Metered {
            count: reader.count(),
        }),
        Metric::Histogram(reader) => Reading::Snapshot(Snapshot::Histogram(reader.sample())),
        Metric::Timer(reader) => Reading::Snapshot(Snapshot::Timer(reader.sample())),
        Metric::SimpleTimer(_) => Reading::Unsupported,
    }
}

fn number_value(id: &MetricId, value: GaugeValue) -> Result<NumberValue> {
    match value {
        GaugeValue::Int(value) => Ok(NumberValue::Int(value)),
        GaugeValue::BigInt(value) => Ok(NumberValue::Int(
            i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX }),
        )),
        GaugeValue::Float(value) => Ok(NumberValue::Double(f64::from(value))),
        GaugeValue::Double(value) => Ok(NumberValue::Double(value)),
        GaugeValue::Unsupported(type_name) => Err(Error::UnsupportedGaugeValue {
            metric: id.to_string(),
            type_name,
        }),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "integer readings beyond 2^53 are not expected from gauges"
)]
fn as_double(value: NumberValue) -> f64 {
    match value {
        NumberValue::Int(value) => value as f64,
        NumberValue::Double(value) => value,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "truncation towards zero, saturating at the i64 range, is the intended conversion"
)]
fn as_int(value: NumberValue) -> i64 {
    match value {
        NumberValue::Int(value) => value,
        NumberValue::Double(value) => value as i64,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
