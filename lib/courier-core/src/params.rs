//! Key/value containers used for query parameters, form data, path
//! parameters and cookies.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::BuildHasher;

use crate::{Error, Result};

/// Types that can be flattened into `(key, value)` pairs.
///
/// This is the bulk-setter counterpart of the containers: anything that
/// implements it can be fed to `set_with`. Structs get it through
/// `#[derive(Params)]`.
///
/// # Example
///
/// ```ignore
/// use courier::Params;
///
/// #[derive(Params)]
/// #[param(rename_all = "camelCase")]
/// struct Search {
///     query_text: String,
///     page: Option<u32>,
///     #[param(format = "csv")]
///     tags: Vec<String>,
/// }
/// ```
pub trait ToParams {
    /// Enumerate the pairs in a stable order.
    fn to_params(&self) -> Vec<(String, String)>;
}

impl<T: ToParams + ?Sized> ToParams for &T {
    fn to_params(&self) -> Vec<(String, String)> {
        (**self).to_params()
    }
}

impl<K: Display, V: Display> ToParams for [(K, V)] {
    fn to_params(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl<K: Display, V: Display, const N: usize> ToParams for [(K, V); N] {
    fn to_params(&self) -> Vec<(String, String)> {
        self.as_slice().to_params()
    }
}

impl<K: Display, V: Display> ToParams for Vec<(K, V)> {
    fn to_params(&self) -> Vec<(String, String)> {
        self.as_slice().to_params()
    }
}

impl<K: Display, V: Display> ToParams for BTreeMap<K, V> {
    fn to_params(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl<K: Display, V: Display, S: BuildHasher> ToParams for HashMap<K, V, S> {
    fn to_params(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// ============================================================================
// Multi-valued map
// ============================================================================

/// Ordered, multi-valued, case-sensitive map.
///
/// Insertion order is kept and duplicate keys are allowed. `set` replaces
/// every value of a key in place of the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<(String, String)>,
}

/// Query parameters of a client or a request.
pub type QueryParams = MultiMap;

/// Form fields, sent url-encoded or as the text parts of a multipart body.
pub type FormData = MultiMap;

impl MultiMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a value, keeping existing values of the key.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Replace every value of the key with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                let mut index = 0;
                self.entries.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
                if let Some(entry) = self.entries.get_mut(first) {
                    entry.1 = value;
                }
            }
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Append every pair.
    pub fn add_all<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.add(key, value);
        }
        self
    }

    /// Replace the values of every key found in `pairs` with the values
    /// `pairs` holds for it. A key repeated in `pairs` keeps all its values.
    pub fn set_all<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut replaced: Vec<String> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            if replaced.contains(&key) {
                self.add(key, value);
            } else {
                replaced.push(key.clone());
                self.set(key, value);
            }
        }
        self
    }

    /// [`MultiMap::set_all`] with the pairs enumerated by `params`.
    pub fn set_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.set_all(params.to_params())
    }

    /// First value of the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of the key, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the key has at least one value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove every value of each given key.
    pub fn del<I>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            self.entries.retain(|(k, _)| k != key);
        }
        self
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every pair, keeping the allocation.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Encode as `application/x-www-form-urlencoded`.
    pub fn to_query_string(&self) -> Result<String> {
        serde_html_form::to_string(&self.entries).map_err(|e| Error::encode("form", e.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.add_all(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for MultiMap {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.add_all(iter);
    }
}

impl ToParams for MultiMap {
    fn to_params(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }
}

// ============================================================================
// Single-valued map
// ============================================================================

/// Single-valued map iterated in key order.
///
/// `add` and `set` both replace the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    entries: BTreeMap<String, String>,
}

/// `:name` substitutions applied to the request URL path.
pub type PathParams = ValueMap;

/// Cookies sent with a request.
pub type Cookies = ValueMap;

impl ValueMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Same as [`ValueMap::set`]: a key holds one value.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set(key, value)
    }

    /// Set the value of a key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// `set` every pair, in order.
    pub fn set_all<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.set(key, value);
        }
        self
    }

    /// `set` every pair enumerated by `params`.
    pub fn set_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.set_all(params.to_params())
    }

    /// Value of the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove each given key.
    pub fn del<I>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for key in keys {
            self.entries.remove(key.as_ref());
        }
        self
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every key.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.set_all(iter);
        map
    }
}

impl ToParams for ValueMap {
    fn to_params(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multimap_add_keeps_duplicates() {
        let mut params = QueryParams::new();
        params.add("bar", "foo1").add("bar", "foo2").add("baz", "x");

        assert_eq!(params.len(), 3);
        assert_eq!(params.get("bar"), Some("foo1"));
        assert_eq!(params.get_all("bar").collect::<Vec<_>>(), ["foo1", "foo2"]);
    }

    #[test]
    fn multimap_set_replaces_in_place() {
        let mut params = QueryParams::new();
        params
            .add("a", "1")
            .add("b", "2")
            .add("a", "3")
            .set("a", "4")
            .set("c", "5");

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, [("a", "4"), ("b", "2"), ("c", "5")]);
    }

    #[test]
    fn multimap_set_all_keeps_repeated_keys() {
        let mut params = QueryParams::new();
        params.add("ids", "0").add("page", "1").add("ids", "9");
        params.set_all([("ids", "1"), ("ids", "2")]);

        assert_eq!(params.get_all("ids").collect::<Vec<_>>(), ["1", "2"]);
        assert_eq!(params.get("page"), Some("1"));
    }

    #[test]
    fn multimap_del_and_reset() {
        let mut params: MultiMap = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        params.del(["a"]);
        assert_eq!(params.iter().collect::<Vec<_>>(), [("b", "2")]);

        params.reset();
        assert!(params.is_empty());
        params.add("c", "1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn multimap_iteration_is_restartable() {
        let params: MultiMap = [("x", "1"), ("y", "2")].into_iter().collect();
        let first: Vec<_> = params.iter().collect();
        let second: Vec<_> = params.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn multimap_query_string() {
        let mut form = FormData::new();
        form.add("name", "John Doe").add("tag", "a&b").add("tag", "c");
        assert_eq!(
            form.to_query_string().expect("encode"),
            "name=John+Doe&tag=a%26b&tag=c"
        );
    }

    #[test]
    fn valuemap_add_is_set() {
        let mut path = PathParams::new();
        path.add("id", "1").add("id", "2").set("name", "fiber");

        assert_eq!(path.get("id"), Some("2"));
        assert_eq!(path.len(), 2);
        assert_eq!(path.iter().collect::<Vec<_>>(), [("id", "2"), ("name", "fiber")]);
    }

    #[test]
    fn set_with_accepts_maps_and_slices() {
        let mut cookies = Cookies::new();
        cookies.set_with(&[("session", "abc"), ("theme", "dark")]);

        let mut extra = HashMap::new();
        extra.insert("session", "xyz");
        cookies.set_with(&extra);

        assert_eq!(cookies.get("session"), Some("xyz"));
        assert_eq!(cookies.get("theme"), Some("dark"));

        let mut query = QueryParams::new();
        query.set_with(&vec![("page", 2), ("size", 10)]);
        assert_eq!(query.get("page"), Some("2"));
    }
}
