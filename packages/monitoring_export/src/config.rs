use std::time::Duration;

use foldhash::{HashMap, HashMapExt};

use crate::{BucketOptions, Error, MetricType, Result};

/// Period between flushes at standard resolution.
pub const STANDARD_SAMPLING_RATE: Duration = Duration::from_secs(60);

/// Period between flushes at high resolution.
pub const HIGH_RESOLUTION_SAMPLING_RATE: Duration = Duration::from_secs(10);

/// Unit key of the fallback bucket options of a metric type.
pub const DEFAULT_UNIT_KEY: &str = "default";

/// Prefix of the types of all descriptors created by the exporter.
pub const DEFAULT_METRIC_TYPE_PREFIX: &str = "custom.googleapis.com/microprofile";

/// Immutable settings of an [`Exporter`][crate::Exporter].
///
/// Use `Config::builder()` to create an instance, or `Config::default()` for the defaults.
#[derive(Clone, Debug)]
pub struct Config {
    sampling_rate: Duration,
    initial_delay: Duration,
    metric_type_prefix: String,

    // Metric type -> unit (or DEFAULT_UNIT_KEY) -> options.
    bucket_options: HashMap<MetricType, HashMap<String, BucketOptions>>,

    label_descriptions: HashMap<String, String>,
}

impl Config {
    /// Creates a builder that starts out with the default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use monitoring_export::{BucketOptions, Config, MetricType};
    ///
    /// let config = Config::builder()
    ///     .high_resolution(true)
    ///     .bucket_options(
    ///         MetricType::Histogram,
    ///         "percent",
    ///         BucketOptions::Linear {
    ///             num_finite_buckets: 10,
    ///             width: 10.0,
    ///             offset: 0.0,
    ///         },
    ///     )
    ///     .build();
    ///
    /// assert_eq!(config.sampling_rate(), Duration::from_secs(10));
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Period between flushes.
    #[must_use]
    pub fn sampling_rate(&self) -> Duration {
        self.sampling_rate
    }

    /// Delay between starting the exporter and its first flush.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Prefix of the types of all descriptors created by the exporter.
    #[must_use]
    pub fn metric_type_prefix(&self) -> &str {
        &self.metric_type_prefix
    }

    /// The bucket options to use for distributions of the given metric type and unit.
    ///
    /// Falls back to the options registered for the metric type under
    /// [`DEFAULT_UNIT_KEY`] if there are none for the specific unit. Units are matched
    /// regardless of letter case, as they are when timer samples are converted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBucketOptions`] if there are neither options for the unit nor
    /// fallback options for the metric type.
    pub fn bucket_options(
        &self,
        metric_type: MetricType,
        unit: Option<&str>,
    ) -> Result<&BucketOptions> {
        let unit = unit_key(unit.unwrap_or(DEFAULT_UNIT_KEY));

        self.bucket_options
            .get(&metric_type)
            .and_then(|by_unit| {
                by_unit
                    .get(&unit)
                    .or_else(|| by_unit.get(DEFAULT_UNIT_KEY))
            })
            .ok_or(Error::MissingBucketOptions { metric_type, unit })
    }

    /// Human-readable description of a well-known label key, if there is one.
    #[must_use]
    pub fn label_description(&self, key: &str) -> Option<&str> {
        self.label_descriptions.get(key).map(String::as_str)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Creates instances of [`Config`].
///
/// Use `Config::builder()` to create a new instance of this builder.
#[derive(Debug)]
pub struct ConfigBuilder {
    sampling_rate: Option<Duration>,
    high_resolution: bool,
    initial_delay: Option<Duration>,
    metric_type_prefix: String,
    bucket_options: HashMap<MetricType, HashMap<String, BucketOptions>>,
    label_descriptions: HashMap<String, String>,
}

impl ConfigBuilder {
    fn new() -> Self {
        let mut builder = Self {
            sampling_rate: None,
            high_resolution: false,
            initial_delay: None,
            metric_type_prefix: DEFAULT_METRIC_TYPE_PREFIX.to_string(),
            bucket_options: HashMap::new(),
            label_descriptions: HashMap::new(),
        };

        for (metric_type, unit, options) in default_bucket_options() {
            builder.insert_bucket_options(metric_type, unit, options);
        }

        builder.label_descriptions.extend(
            DEFAULT_LABEL_DESCRIPTIONS
                .iter()
                .map(|(key, description)| ((*key).to_string(), (*description).to_string())),
        );

        builder
    }

    /// Sets the period between flushes. Takes precedence over [`high_resolution()`][1].
    ///
    /// # Panics
    ///
    /// Panics if the period is zero.
    ///
    /// [1]: Self::high_resolution
    #[must_use]
    pub fn sampling_rate(self, sampling_rate: Duration) -> Self {
        assert!(!sampling_rate.is_zero(), "sampling rate must not be zero");

        Self {
            sampling_rate: Some(sampling_rate),
            ..self
        }
    }

    /// Selects the high resolution sampling rate instead of the standard one, unless a
    /// sampling rate is set explicitly.
    #[must_use]
    pub fn high_resolution(self, high_resolution: bool) -> Self {
        Self {
            high_resolution,
            ..self
        }
    }

    /// Sets the delay before the first flush. Defaults to the sampling rate.
    #[must_use]
    pub fn initial_delay(self, initial_delay: Duration) -> Self {
        Self {
            initial_delay: Some(initial_delay),
            ..self
        }
    }

    /// Sets the prefix of the types of all descriptors created by the exporter.
    #[must_use]
    pub fn metric_type_prefix(self, prefix: impl Into<String>) -> Self {
        Self {
            metric_type_prefix: prefix.into(),
            ..self
        }
    }

    /// Sets the bucket options for distributions of a metric type with the given unit.
    ///
    /// Use [`DEFAULT_UNIT_KEY`] as the unit to set the fallback for the metric type.
    #[must_use]
    pub fn bucket_options(
        mut self,
        metric_type: MetricType,
        unit: impl Into<String>,
        options: BucketOptions,
    ) -> Self {
        self.insert_bucket_options(metric_type, unit.into(), options);
        self
    }

    /// Removes all bucket options, including the built-in defaults.
    #[must_use]
    pub fn clear_bucket_options(mut self) -> Self {
        self.bucket_options.clear();
        self
    }

    /// Sets the human-readable description of a label key.
    #[must_use]
    pub fn label_description(
        mut self,
        key: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.label_descriptions.insert(key.into(), description.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        let sampling_rate = self.sampling_rate.unwrap_or(if self.high_resolution {
            HIGH_RESOLUTION_SAMPLING_RATE
        } else {
            STANDARD_SAMPLING_RATE
        });

        Config {
            sampling_rate,
            initial_delay: self.initial_delay.unwrap_or(sampling_rate),
            metric_type_prefix: self.metric_type_prefix,
            bucket_options: self.bucket_options,
            label_descriptions: self.label_descriptions,
        }
    }

    fn insert_bucket_options(
        &mut self,
        metric_type: MetricType,
        unit: String,
        options: BucketOptions,
    ) {
        self.bucket_options
            .entry(metric_type)
            .or_default()
            .insert(unit_key(&unit), options);
    }
}

fn unit_key(unit: &str) -> String {
    unit.to_ascii_lowercase()
}

const DEFAULT_LABEL_DESCRIPTIONS: &[(&str, &str)] = &[
    ("_app", "Name of the application that owns the metric"),
    ("mp_scope", "Scope of the registry that holds the metric"),
];

fn exponential(num_finite_buckets: u32, scale: f64) -> BucketOptions {
    BucketOptions::Exponential {
        num_finite_buckets,
        growth_factor: 2.0,
        scale,
    }
}

fn default_bucket_options() -> Vec<(MetricType, String, BucketOptions)> {
    vec![
        // Timers without a unit are exported in nanoseconds: 1 µs up to about 19 hours.
        (MetricType::Timer, DEFAULT_UNIT_KEY.to_string(), exponential(36, 1_000.0)),
        (MetricType::Timer, "nanoseconds".to_string(), exponential(36, 1_000.0)),
        (MetricType::Timer, "microseconds".to_string(), exponential(36, 1.0)),
        (MetricType::Timer, "milliseconds".to_string(), exponential(26, 1.0)),
        (MetricType::Timer, "seconds".to_string(), exponential(17, 1.0)),
        (MetricType::Histogram, DEFAULT_UNIT_KEY.to_string(), exponential(32, 1.0)),
        (
            MetricType::Histogram,
            "percent".to_string(),
            BucketOptions::Linear {
                num_finite_buckets: 20,
                width: 5.0,
                offset: 0.0,
            },
        ),
    ]
}
