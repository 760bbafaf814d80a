/// The declared type of a metric, as recorded in its [`Metadata`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum MetricType {
    /// A monotonically increasing count.
    Counter,

    /// A count of parallel invocations, reported as its current value.
    ConcurrentGauge,

    /// An arbitrary instantaneous reading.
    Gauge,

    /// A count of events with rate information.
    Metered,

    /// A distribution of sampled values.
    Histogram,

    /// A distribution of sampled durations, recorded in nanoseconds.
    Timer,

    /// A count of timed events plus their total elapsed time.
    SimpleTimer,

    /// The type could not be determined.
    Invalid,
}

/// Descriptive information about a metric, supplied by the registry and looked up by name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Metadata {
    name: String,
    display_name: String,
    description: Option<String>,
    unit: Option<String>,
    metric_type: MetricType,
}

impl Metadata {
    /// Creates metadata for the metric with the given name and type.
    ///
    /// The display name defaults to the name. There is no description and no unit.
    #[must_use]
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        let name = name.into();

        Self {
            display_name: name.clone(),
            name,
            description: None,
            unit: None,
            metric_type,
        }
    }

    /// Sets the human-readable name of the metric.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Sets the description of the metric.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the unit of the metric, e.g. `milliseconds` or `bytes`.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// The name of the metric.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The human-readable name of the metric.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The description of the metric, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The unit of the metric, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// The declared type of the metric.
    #[must_use]
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }
}
