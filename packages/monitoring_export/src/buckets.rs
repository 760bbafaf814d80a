//! Tallying of sampled values into histogram buckets.

use crate::BucketOptions;

/// One histogram bucket: an exclusive upper bound and the number of values below it
/// (and not below the bound of any preceding bucket).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Bucket {
    /// Exclusive upper bound. `None` for the overflow bucket, which has no upper bound.
    pub upper: Option<i64>,

    /// Number of values tallied into this bucket.
    pub count: i64,
}

impl Bucket {
    fn bounded(upper: i64) -> Self {
        Self {
            upper: Some(upper),
            count: 0,
        }
    }

    fn overflow() -> Self {
        Self {
            upper: None,
            count: 0,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "bounds are far below the range where f64 loses integer precision"
    )]
    fn accepts(&self, value: f64) -> bool {
        self.upper.is_none_or(|upper| value < upper as f64)
    }
}

/// Generates the empty buckets described by the bucket options, in ascending order of
/// upper bound, followed by the overflow bucket.
///
/// Exponential and linear rules yield `num_finite_buckets + 1` bounded buckets, the first of
/// which is the underflow bucket. Explicit rules yield one bounded bucket per listed bound.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "bounds are rounded to whole numbers and saturate at the i64 range"
)]
pub fn upper_bounds(options: &BucketOptions) -> Vec<Bucket> {
    let mut buckets = match options {
        BucketOptions::Exponential {
            num_finite_buckets,
            growth_factor,
            scale,
        } => (0..=*num_finite_buckets)
            .map(|i| {
                let exponent = i32::try_from(i).unwrap_or(i32::MAX);
                Bucket::bounded((scale * growth_factor.powi(exponent)).round() as i64)
            })
            .collect::<Vec<_>>(),
        BucketOptions::Linear {
            num_finite_buckets,
            width,
            offset,
        } => (0..=*num_finite_buckets)
            .map(|i| Bucket::bounded(width.mul_add(f64::from(i), *offset).round() as i64))
            .collect::<Vec<_>>(),
        BucketOptions::Explicit { bounds } => bounds
            .iter()
            .map(|bound| Bucket::bounded(bound.round() as i64))
            .collect::<Vec<_>>(),
    };

    buckets.push(Bucket::overflow());
    buckets
}

/// Tallies values into the buckets described by the bucket options.
///
/// Each value is first passed through `convert`, which maps it into the unit the bucket bounds
/// are expressed in. It is then counted in the first bucket whose upper bound exceeds it.
///
/// Returns one count per bucket, in the order of [`upper_bounds()`]. The counts add up to the
/// number of values.
///
/// # Example
///
/// ```
/// use monitoring_export::BucketOptions;
/// use monitoring_export::buckets::bucket_counts;
///
/// let options = BucketOptions::Explicit {
///     bounds: vec![2.0, 5.0, 20.0, 1000.0],
/// };
///
/// let counts = bucket_counts(&options, &[0, 1, 3, 9, 15, 5000, 50000], |v| v as f64);
///
/// assert_eq!(counts, vec![2, 1, 2, 0, 2]);
/// ```
#[must_use]
pub fn bucket_counts(
    options: &BucketOptions,
    values: &[i64],
    convert: impl Fn(i64) -> f64,
) -> Vec<i64> {
    let mut buckets = upper_bounds(options);

    for value in values {
        let converted = convert(*value);

        if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.accepts(converted)) {
            bucket.count = bucket.count.saturating_add(1);
        }
    }

    buckets.into_iter().map(|bucket| bucket.count).collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::units::{identity_value_converter, timer_value_converter};

    const VALUES: &[i64] = &[0, 1, 3, 9, 15, 5000, 50000];

    fn bounds(options: &BucketOptions) -> Vec<Option<i64>> {
        upper_bounds(options)
            .into_iter()
            .map(|bucket| bucket.upper)
            .collect()
    }

    #[test]
    fn exponential_bounds() {
        let options = BucketOptions::Exponential {
            num_finite_buckets: 5,
            growth_factor: 2.0,
            scale: 1.0,
        };

        assert_eq!(
            bounds(&options),
            vec![Some(1), Some(2), Some(4), Some(8), Some(16), Some(32), None]
        );
    }

    #[test]
    fn exponential_counts() {
        let options = BucketOptions::Exponential {
            num_finite_buckets: 5,
            growth_factor: 2.0,
            scale: 1.0,
        };

        assert_eq!(
            bucket_counts(&options, VALUES, identity_value_converter),
            vec![1, 1, 1, 0, 2, 0, 2]
        );
    }

    #[test]
    fn linear_bounds() {
        let options = BucketOptions::Linear {
            num_finite_buckets: 5,
            width: 4.0,
            offset: 3.0,
        };

        assert_eq!(
            bounds(&options),
            vec![Some(3), Some(7), Some(11), Some(15), Some(19), Some(23), None]
        );
    }

    #[test]
    fn linear_counts() {
        let options = BucketOptions::Linear {
            num_finite_buckets: 5,
            width: 4.0,
            offset: 3.0,
        };

        assert_eq!(
            bucket_counts(&options, VALUES, identity_value_converter),
            vec![2, 1, 1, 0, 1, 0, 2]
        );
    }

    #[test]
    fn explicit_counts() {
        let options = BucketOptions::Explicit {
            bounds: vec![2.0, 5.0, 20.0, 1000.0],
        };

        assert_eq!(
            bucket_counts(&options, VALUES, identity_value_converter),
            vec![2, 1, 2, 0, 2]
        );
    }

    #[test]
    fn counts_add_up_to_number_of_values() {
        let all_options = [
            BucketOptions::Exponential {
                num_finite_buckets: 3,
                growth_factor: 10.0,
                scale: 1.0,
            },
            BucketOptions::Linear {
                num_finite_buckets: 8,
                width: 100.0,
                offset: 0.0,
            },
            BucketOptions::Explicit {
                bounds: vec![-10.0, 0.0, 10.0],
            },
            BucketOptions::Explicit { bounds: Vec::new() },
        ];
        let values = [-50, -10, 0, 1, 99, 100, 101, 999, 1000, i64::MAX, i64::MIN];

        for options in &all_options {
            let counts = bucket_counts(options, &values, identity_value_converter);

            assert_eq!(counts.len(), upper_bounds(options).len());
            assert_eq!(counts.iter().sum::<i64>(), i64::try_from(values.len()).unwrap());
        }
    }

    #[test]
    fn values_on_a_bound_go_to_the_next_bucket() {
        let options = BucketOptions::Explicit {
            bounds: vec![10.0, 20.0],
        };

        assert_eq!(
            bucket_counts(&options, &[10, 20], identity_value_converter),
            vec![0, 1, 1]
        );
    }

    #[test]
    fn values_are_converted_before_tallying() {
        let options = BucketOptions::Explicit {
            bounds: vec![1.0, 10.0],
        };

        // 500 µs, 5 ms and 50 ms, in nanoseconds, tallied in milliseconds.
        let counts = bucket_counts(
            &options,
            &[500_000, 5_000_000, 50_000_000],
            timer_value_converter(Some("milliseconds")),
        );

        assert_eq!(counts, vec![1, 1, 1]);
    }
}
