use std::time::{Duration, SystemTime};

use crate::{Error, Result, TimeInterval};

/// Creates the time interval of a point that starts at `start` and ends at `end`.
///
/// The remote service works at millisecond precision. If both instants fall within the same
/// millisecond, the interval is an instant at `end` without a start time.
///
/// # Errors
///
/// Returns [`Error::InvalidInterval`] if `start` lies after `end`.
///
/// # Example
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use monitoring_export::to_interval;
///
/// let start = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
/// let end = start + Duration::from_secs(60);
///
/// let interval = to_interval(start, end).unwrap();
/// assert_eq!(interval.start_time, Some(start));
///
/// let instant = to_interval(end, end).unwrap();
/// assert_eq!(instant.start_time, None);
/// ```
pub fn to_interval(start: SystemTime, end: SystemTime) -> Result<TimeInterval> {
    if start > end {
        return Err(Error::InvalidInterval { start, end });
    }

    let start_time = (epoch_millis(start) != epoch_millis(end)).then_some(start);

    Ok(TimeInterval {
        start_time,
        end_time: end,
    })
}

/// Whole milliseconds since the Unix epoch, rounded towards negative infinity.
fn epoch_millis(at: SystemTime) -> i128 {
    match at.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since) => i128::from(millis(since)),
        Err(before) => {
            let before = before.duration();
            let whole = i128::from(millis(before));
            let partial = i128::from(before != Duration::from_millis(millis(before)));

            0_i128.saturating_sub(whole).saturating_sub(partial)
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// The wall clock span covered by one flush: from the end of the previous successful flush
/// (or the exporter start time) to the moment the flush began.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct FlushInterval {
    /// Start of the span.
    pub start: SystemTime,

    /// End of the span.
    pub end: SystemTime,
}

impl FlushInterval {
    /// Creates a flush interval.
    #[must_use]
    pub fn new(start: SystemTime, end: SystemTime) -> Self {
        Self { start, end }
    }
}
