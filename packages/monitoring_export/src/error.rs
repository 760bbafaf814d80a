use std::time::SystemTime;

use thiserror::Error;

use crate::{ClientError, MetricType, ValueType};

/// Errors that can occur while converting metrics to time series or exporting them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A gauge produced a reading that is not one of the supported numeric kinds.
    ///
    /// This indicates a bug in the code that registered the gauge, not an unsupported metric.
    #[error("gauge '{metric}' produced an unsupported value of type '{type_name}'")]
    UnsupportedGaugeValue {
        /// Name of the offending metric.
        metric: String,

        /// Name of the type of the value the gauge produced.
        type_name: &'static str,
    },

    /// No histogram bucket options are configured for a metric type and unit,
    /// not even a `default` fallback entry.
    #[error("no bucket options configured for {metric_type:?} metrics with unit '{unit}'")]
    MissingBucketOptions {
        /// The metric type that needed bucket options.
        metric_type: MetricType,

        /// The unit of the metric that needed bucket options.
        unit: String,
    },

    /// A time interval was requested whose start lies after its end.
    #[error("interval start {start:?} is after interval end {end:?}")]
    InvalidInterval {
        /// The requested start of the interval.
        start: SystemTime,

        /// The requested end of the interval.
        end: SystemTime,
    },

    /// A snapshot cannot be expressed in the value type declared by its descriptor.
    #[error("metric '{metric}' cannot be written as {expected:?}, snapshot is {actual:?}")]
    ValueTypeMismatch {
        /// Name of the metric.
        metric: String,

        /// The value type declared by the descriptor.
        expected: ValueType,

        /// The value type of the snapshot.
        actual: ValueType,
    },

    /// Reading the live value of a metric panicked.
    #[error("reading metric '{metric}' panicked: {message}")]
    MetricPanicked {
        /// Name of the metric.
        metric: String,

        /// The panic message, if it could be extracted.
        message: String,
    },

    /// The remote metrics service rejected a call or could not be reached.
    #[error("remote call failed: {0}")]
    Remote(#[from] ClientError),

    /// The operation requires an initialized exporter.
    #[error("exporter is not running")]
    NotRunning,

    /// The background runtime for the exporter could not be created.
    #[error("failed to start exporter runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the remote service.
    ///
    /// Remote errors abort the whole flush cycle. All other conversion errors only cause the
    /// affected metric to be skipped.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// A specialized `Result` type for export operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
