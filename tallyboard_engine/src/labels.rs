//! Label sets attached to metric samples.

use std::collections::BTreeMap;

use serde::Serialize;

/// The value reported for any label a sample does not carry.
pub const UNKNOWN: &str = "unknown";

/// The labels of a single sample.
///
/// Keys are unique. Iteration, equality and serialization follow key order so
/// two samples with the same label pairs compare equal no matter how the pairs
/// were written in the exposition text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Labels {
    inner: BTreeMap<String, String>,
}

impl Labels {
    /// Create an empty label set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, returning the previous value for `key` if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner.insert(key.into(), value.into())
    }

    /// Look up a label value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Look up a label value, reading a missing key as [`UNKNOWN`].
    #[must_use]
    pub fn get_or_unknown(&self, key: &str) -> &str {
        self.get(key).unwrap_or(UNKNOWN)
    }

    /// Number of pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no pairs are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Read `key` from an optional label set, defaulting to [`UNKNOWN`].
#[must_use]
pub fn label_or_unknown<'a>(labels: Option<&'a Labels>, key: &str) -> &'a str {
    labels.map_or(UNKNOWN, |l| l.get_or_unknown(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_unknown() {
        let labels: Labels = [("provider_id", "alpha")].into_iter().collect();
        assert_eq!(labels.get_or_unknown("provider_id"), "alpha");
        assert_eq!(labels.get_or_unknown("status"), UNKNOWN);
        assert_eq!(label_or_unknown(None, "status"), UNKNOWN);
        assert_eq!(label_or_unknown(Some(&labels), "provider_id"), "alpha");
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let mut a = Labels::new();
        a.insert("method", "GET");
        a.insert("route", "/x");
        let mut b = Labels::new();
        b.insert("route", "/x");
        b.insert("method", "GET");
        assert_eq!(a, b);
        assert_eq!(
            a.iter().collect::<Vec<_>>(),
            vec![("method", "GET"), ("route", "/x")]
        );
    }

    #[test]
    fn serializes_as_plain_object() {
        let labels: Labels = [("b", "2"), ("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&labels).expect("labels serialize");
        assert_eq!(json, r#"{"a":"1","b":"2"}"#);
    }
}
