use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Identifies one observable metric instance: a metric name plus a set of tags.
///
/// Equality, ordering and hashing are structural over the name and the full tag set. Tags are
/// kept sorted by key so that two identities built with the same tags in a different order are
/// the same identity.
///
/// # Example
///
/// ```
/// use monitoring_export::MetricId;
///
/// let a = MetricId::new("requests").with_tag("method", "GET").with_tag("code", "200");
/// let b = MetricId::new("requests").with_tag("code", "200").with_tag("method", "GET");
///
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MetricId {
    name: String,
    tags: BTreeMap<String, String>,
}

impl MetricId {
    /// Creates an identity with the given name and no tags.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag to the identity, replacing any existing tag with the same key.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// The name of the metric.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tags of the metric, sorted by key.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;

        if self.tags.is_empty() {
            return Ok(());
        }

        write!(f, "{{")?;
        for (index, (key, value)) in self.tags.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{key}=\"{value}\"")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use foldhash::{HashSet, HashSetExt};

    use super::*;

    #[test]
    fn tag_order_does_not_matter() {
        let a = MetricId::new("m").with_tag("a", "1").with_tag("b", "2");
        let b = MetricId::new("m").with_tag("b", "2").with_tag("a", "1");

        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn different_tags_are_different_identities() {
        let a = MetricId::new("m").with_tag("a", "1");
        let b = MetricId::new("m").with_tag("a", "2");
        let c = MetricId::new("m");

        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_without_tags() {
        assert_eq!(MetricId::new("uptime").to_string(), "uptime");
    }

    #[test]
    fn display_with_tags() {
        let id = MetricId::new("requests")
            .with_tag("method", "GET")
            .with_tag("code", "200");

        assert_eq!(id.to_string(), "requests{code=\"200\",method=\"GET\"}");
    }
}
