//! Translation of metric units and types into the terms of the remote service.

use crate::{MetricKind, MetricType};

/// SI and binary prefixes that may precede one of the [`PREFIXABLE_UNITS`].
const PREFIXES: &[(&str, &str)] = &[
    ("kibi", "Ki"),
    ("mebi", "Mi"),
    ("gibi", "Gi"),
    ("tebi", "Ti"),
    ("micro", "u"),
    ("milli", "m"),
    ("nano", "n"),
    ("kilo", "k"),
    ("mega", "M"),
    ("giga", "G"),
    ("tera", "T"),
];

/// Base units that accept a prefix.
const PREFIXABLE_UNITS: &[(&str, &str)] = &[("bits", "bit"), ("bytes", "By"), ("seconds", "s")];

/// Units that are translated as a whole.
const WHOLE_UNITS: &[(&str, &str)] = &[
    ("none", "1"),
    ("percent", "%"),
    ("per_second", "1/s"),
    ("minutes", "min"),
    ("hours", "h"),
    ("days", "d"),
];

/// Translates a metric unit such as `milliseconds` or `kibibytes` into UCUM notation
/// (`ms`, `KiBy`) as understood by the remote service.
///
/// Units that are not recognized are passed through unchanged. A missing or empty unit
/// becomes the dimensionless unit `1`.
///
/// # Example
///
/// ```
/// use monitoring_export::units::to_ucum;
///
/// assert_eq!(to_ucum(Some("milliseconds")), "ms");
/// assert_eq!(to_ucum(Some("kibibytes")), "KiBy");
/// assert_eq!(to_ucum(Some("furlongs")), "furlongs");
/// assert_eq!(to_ucum(None), "1");
/// ```
#[must_use]
pub fn to_ucum(unit: Option<&str>) -> String {
    let Some(unit) = unit.map(str::trim).filter(|unit| !unit.is_empty()) else {
        return "1".to_string();
    };

    let lower = unit.to_ascii_lowercase();

    if let Some((_, ucum)) = WHOLE_UNITS.iter().find(|(name, _)| *name == lower) {
        return (*ucum).to_string();
    }

    if let Some((_, ucum)) = PREFIXABLE_UNITS.iter().find(|(name, _)| *name == lower) {
        return (*ucum).to_string();
    }

    for (prefix, ucum_prefix) in PREFIXES {
        let Some(rest) = lower.strip_prefix(prefix) else {
            continue;
        };

        if let Some((_, ucum)) = PREFIXABLE_UNITS.iter().find(|(name, _)| *name == rest) {
            return format!("{ucum_prefix}{ucum}");
        }
    }

    unit.to_string()
}

/// The metric kind that time series of a metric of the given type are written as.
#[must_use]
pub fn metric_kind(metric_type: MetricType) -> MetricKind {
    match metric_type {
        MetricType::Counter | MetricType::Metered | MetricType::SimpleTimer => {
            MetricKind::Cumulative
        }
        MetricType::Gauge
        | MetricType::ConcurrentGauge
        | MetricType::Histogram
        | MetricType::Timer => MetricKind::Gauge,
        MetricType::Invalid => MetricKind::Unspecified,
    }
}

/// Number of nanoseconds in one of the given time unit.
///
/// Timers record nanoseconds. A timer without a time unit is exported in nanoseconds.
pub(crate) fn nanos_per_unit(unit: Option<&str>) -> f64 {
    match unit.map(str::to_ascii_lowercase).as_deref() {
        Some("microseconds") => 1e3,
        Some("milliseconds") => 1e6,
        Some("seconds") => 1e9,
        Some("minutes") => 60e9,
        Some("hours") => 3_600e9,
        Some("days") => 86_400e9,
        _ => 1.0,
    }
}

/// Returns a function that converts raw timer samples, which are nanoseconds, into the unit
/// declared for the timer.
///
/// # Example
///
/// ```
/// use monitoring_export::units::timer_value_converter;
///
/// let convert = timer_value_converter(Some("milliseconds"));
///
/// assert_eq!(convert(2_500_000), 2.5);
/// ```
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "sample values are far below the range where f64 loses integer precision"
)]
pub fn timer_value_converter(unit: Option<&str>) -> impl Fn(i64) -> f64 + Copy {
    let divisor = nanos_per_unit(unit);

    move |nanos: i64| nanos as f64 / divisor
}

/// Conversion applied to raw sample values that are already in the declared unit.
#[expect(
    clippy::cast_precision_loss,
    reason = "sample values are far below the range where f64 loses integer precision"
)]
pub(crate) fn identity_value_converter(value: i64) -> f64 {
    value as f64
}
