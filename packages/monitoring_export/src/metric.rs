use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::MetricType;

/// A live metric held by a [`MetricRegistry`][crate::MetricRegistry].
///
/// The exporter only ever reads from a metric, via the reader trait of its kind. The metric may
/// keep changing while (and after) the exporter reads it.
#[derive(Clone)]
#[non_exhaustive]
pub enum Metric {
    /// An arbitrary instantaneous reading.
    Gauge(Arc<dyn GaugeReader>),

    /// The current number of parallel invocations.
    ConcurrentGauge(Arc<dyn CountReader>),

    /// A monotonically increasing count.
    Counter(Arc<dyn CountReader>),

    /// A count of events, with rate information that is not exported.
    Metered(Arc<dyn CountReader>),

    /// A distribution of sampled values.
    Histogram(Arc<dyn SampleReader>),

    /// A distribution of sampled durations. Sample values are in nanoseconds.
    Timer(Arc<dyn SampleReader>),

    /// A count of timed events plus their total elapsed time.
    ///
    /// Registries may contain these but they are not exported.
    SimpleTimer(Arc<dyn SimpleTimerReader>),
}

impl Metric {
    /// The metric type that corresponds to this kind of live metric.
    #[must_use]
    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::Gauge(_) => MetricType::Gauge,
            Self::ConcurrentGauge(_) => MetricType::ConcurrentGauge,
            Self::Counter(_) => MetricType::Counter,
            Self::Metered(_) => MetricType::Metered,
            Self::Histogram(_) => MetricType::Histogram,
            Self::Timer(_) => MetricType::Timer,
            Self::SimpleTimer(_) => MetricType::SimpleTimer,
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(type_name::<Self>())
            .field(&self.metric_type())
            .finish()
    }
}

/// A reading produced by a gauge.
///
/// Integer readings of any width are exported as 64-bit integers, floating point readings
/// as doubles. Any other kind of reading is a bug in the gauge and fails its export.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum GaugeValue {
    /// An integer of at most 64 bits.
    Int(i64),

    /// An integer wider than 64 bits. Exported saturated to the 64-bit range.
    BigInt(i128),

    /// A single precision floating point number.
    Float(f32),

    /// A double precision floating point number.
    Double(f64),

    /// A reading of a type the exporter does not know how to express, identified by type name.
    Unsupported(&'static str),
}

impl GaugeValue {
    /// Creates an unsupported reading for the type `T`.
    #[must_use]
    pub fn unsupported<T: ?Sized>() -> Self {
        Self::Unsupported(type_name::<T>())
    }
}

macro_rules! gauge_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for GaugeValue {
                fn from(value: $t) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

gauge_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<i128> for GaugeValue {
    fn from(value: i128) -> Self {
        Self::BigInt(value)
    }
}

impl From<u64> for GaugeValue {
    fn from(value: u64) -> Self {
        Self::BigInt(i128::from(value))
    }
}

impl From<f32> for GaugeValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for GaugeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Reads the current value of a gauge.
pub trait GaugeReader: Send + Sync {
    /// The current reading of the gauge.
    fn value(&self) -> GaugeValue;
}

impl<F> GaugeReader for F
where
    F: Fn() -> GaugeValue + Send + Sync,
{
    fn value(&self) -> GaugeValue {
        self()
    }
}

/// Reads the current count of a counter, concurrent gauge or metered metric.
pub trait CountReader: Send + Sync {
    /// The current count.
    fn count(&self) -> i64;
}

impl CountReader for AtomicI64 {
    fn count(&self) -> i64 {
        self.load(Ordering::Relaxed)
    }
}

/// Reads the sampled values of a histogram or timer.
pub trait SampleReader: Send + Sync {
    /// Takes a statistical sample of the values currently held by the metric.
    fn sample(&self) -> Sample;
}

/// Reads a simple timer.
pub trait SimpleTimerReader: Send + Sync {
    /// Number of timed events.
    fn count(&self) -> i64;

    /// Total time spent in the timed events.
    fn elapsed(&self) -> Duration;
}

/// A statistical sample of the values held by a histogram or timer.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    values: Vec<i64>,
    mean: f64,
    std_dev: f64,
}

impl Sample {
    /// Creates a sample from precomputed statistics over the values.
    #[must_use]
    pub fn new(values: Vec<i64>, mean: f64, std_dev: f64) -> Self {
        Self {
            values,
            mean,
            std_dev,
        }
    }

    /// Creates a sample from raw values, computing the mean and population standard deviation.
    ///
    /// # Example
    ///
    /// ```
    /// use monitoring_export::Sample;
    ///
    /// let sample = Sample::from_values(vec![2, 4, 4, 4, 5, 5, 7, 9]);
    ///
    /// assert_eq!(sample.len(), 8);
    /// assert!((sample.mean() - 5.0).abs() < f64::EPSILON);
    /// assert!((sample.std_dev() - 2.0).abs() < f64::EPSILON);
    /// ```
    #[must_use]
    pub fn from_values(values: Vec<i64>) -> Self {
        if values.is_empty() {
            return Self::new(values, 0.0, 0.0);
        }

        #[expect(
            clippy::cast_precision_loss,
            reason = "statistics are approximate by nature"
        )]
        let count = values.len() as f64;

        #[expect(
            clippy::cast_precision_loss,
            reason = "statistics are approximate by nature"
        )]
        let mean = values.iter().map(|v| *v as f64).sum::<f64>() / count;

        #[expect(
            clippy::cast_precision_loss,
            reason = "statistics are approximate by nature"
        )]
        let variance = values
            .iter()
            .map(|v| {
                let deviation = *v as f64 - mean;
                deviation * deviation
            })
            .sum::<f64>()
            / count;

        Self::new(values, mean, variance.sqrt())
    }

    /// The sampled values, in the unit the metric records them in.
    #[must_use]
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Number of sampled values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the sample holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the sampled values.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation of the sampled values.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}
