use std::sync::Arc;

use thiserror::Error;

use crate::{MetricDescriptor, ProjectName, TimeSeries};

/// Maximum number of time series the remote service accepts in one write request.
pub const MAX_TIME_SERIES_PER_REQUEST: usize = 200;

/// The subset of the remote monitoring service used by the exporter.
///
/// All calls are synchronous and block the calling thread until the service responds.
#[cfg_attr(test, mockall::automock)]
pub trait MetricServiceClient: Send {
    /// Fetches a metric descriptor by its resource name.
    ///
    /// Returns [`ClientError::NotFound`] if no such descriptor exists.
    fn get_metric_descriptor(&self, name: &str) -> Result<MetricDescriptor, ClientError>;

    /// Creates a metric descriptor in the given project and returns it as stored by the service.
    fn create_metric_descriptor(
        &self,
        project: &ProjectName,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricDescriptor, ClientError>;

    /// Writes time series to the given project.
    ///
    /// Callers must not pass more than [`MAX_TIME_SERIES_PER_REQUEST`] time series.
    fn create_time_series(
        &self,
        project: &ProjectName,
        time_series: &[TimeSeries],
    ) -> Result<(), ClientError>;
}

impl<C> MetricServiceClient for Arc<C>
where
    C: MetricServiceClient + Sync + ?Sized,
{
    fn get_metric_descriptor(&self, name: &str) -> Result<MetricDescriptor, ClientError> {
        (**self).get_metric_descriptor(name)
    }

    fn create_metric_descriptor(
        &self,
        project: &ProjectName,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricDescriptor, ClientError> {
        (**self).create_metric_descriptor(project, descriptor)
    }

    fn create_time_series(
        &self,
        project: &ProjectName,
        time_series: &[TimeSeries],
    ) -> Result<(), ClientError> {
        (**self).create_time_series(project, time_series)
    }
}

/// Errors reported by a [`MetricServiceClient`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The requested resource does not exist.
    #[error("resource not found: {name}")]
    NotFound {
        /// Name of the resource that was requested.
        name: String,
    },

    /// The service rejected the request.
    #[error("request rejected: {message}")]
    Rejected {
        /// Explanation provided by the service.
        message: String,
    },

    /// The service could not be reached or did not respond in time.
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Description of the transport failure.
        message: String,
    },
}

impl ClientError {
    /// Whether the error means the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
