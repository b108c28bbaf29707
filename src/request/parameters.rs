use std::collections::BTreeMap;
use std::iter::FromIterator;

use serde_derive::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// The parameters of a request, exactly as they were received.
///
/// There is deliberately no method to change the parameters after construction. Every
/// normalization of a request is recorded in its working state instead, so that the original
/// submission stays available for comparison and auditing.
///
/// Each key must appear at most once. A key that was sent several times is kept but has no value
/// and is reported by `is_ambiguous`. This prevents order dependent processing or confusion
/// between components that parse the query from different ends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParameters {
    /// The value is `None` if the key appeared at least twice.
    inner: BTreeMap<String, Option<String>>,
}

impl RequestParameters {
    /// An empty set of parameters.
    pub fn new() -> Self {
        RequestParameters::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query or body.
    pub fn from_query(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Take the parameters from the query of a request uri.
    pub fn from_url(url: &Url) -> Self {
        url.query_pairs().into_owned().collect()
    }

    /// Get the **unique** value associated with a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|value| value.as_ref())
            .map(String::as_str)
    }

    /// Whether the key was present at all, possibly several times.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Whether the key appeared more than once.
    pub fn is_ambiguous(&self, key: &str) -> bool {
        matches!(self.inner.get(key), Some(None))
    }

    /// Iterate over all keys with a unique value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key.as_str(), value.as_str())))
    }

    /// The number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// If no parameter was given.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn insert_or_poison(&mut self, key: String, val: String) {
        self.inner
            .entry(key)
            .and_modify(|val| *val = None)
            .or_insert(Some(val));
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut target = RequestParameters::new();
        iter.into_iter()
            .for_each(|(k, v)| target.insert_or_poison(k.into(), v.into()));
        target
    }
}
