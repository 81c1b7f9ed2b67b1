//! Case-insensitive, multi-valued header container.

use crate::params::ToParams;

/// Ordered header list with case-insensitive keys.
///
/// Besides the values, the container remembers which keys were written with
/// [`Header::set`] since they were last deleted. When a request header set is
/// merged over a client header set, those keys replace the client values
/// instead of being appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<(String, String)>,
    overrides: Vec<String>,
}

impl Header {
    /// Create an empty header set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            overrides: Vec::new(),
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
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        if !self.is_overridden(&key) {
            self.overrides.push(key.to_ascii_lowercase());
        }
        self.entries.push((key, value.into()));
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
            if replaced.iter().any(|k| k.eq_ignore_ascii_case(&key)) {
                self.add(key, value);
            } else {
                replaced.push(key.clone());
                self.set(key, value);
            }
        }
        self
    }

    /// [`Header::set_all`] with the pairs enumerated by `params`.
    pub fn set_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.set_all(params.to_params())
    }

    /// First value of the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of the key, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the key has at least one value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Returns `true` if the key went through [`Header::set`] since it was
    /// last deleted. A later [`Header::add`] keeps the mark.
    #[must_use]
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.iter().any(|k| k.eq_ignore_ascii_case(key))
    }

    /// Remove every value of each given key.
    pub fn del<I>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
            self.overrides.retain(|k| !k.eq_ignore_ascii_case(key));
        }
        self
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every value and override mark.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.overrides.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Header {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut header = Self::new();
        header.add_all(iter);
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let mut header = Header::new();
        header.add("X-Token", "a").add("x-token", "b");

        assert_eq!(header.get("X-TOKEN"), Some("a"));
        assert_eq!(header.get_all("x-Token").count(), 2);
        assert!(header.contains_key("x-token"));
    }

    #[test]
    fn set_replaces_and_marks_override() {
        let mut header = Header::new();
        header.add("Accept", "text/plain").add("Accept", "text/html");
        assert!(!header.is_overridden("accept"));

        header.set("accept", "application/json");
        assert_eq!(header.get_all("Accept").collect::<Vec<_>>(), ["application/json"]);
        assert!(header.is_overridden("ACCEPT"));
    }

    #[test]
    fn add_after_set_keeps_override() {
        let mut header = Header::new();
        header.set("Accept", "text/html").add("accept", "text/plain");

        assert!(header.is_overridden("Accept"));
        assert_eq!(header.get_all("accept").count(), 2);
    }

    #[test]
    fn set_all_keeps_repeated_keys() {
        let mut header = Header::new();
        header.add("Via", "old").add("X-A", "1");
        header.set_all([("via", "a"), ("Via", "b")]);

        assert_eq!(header.get_all("via").collect::<Vec<_>>(), ["a", "b"]);
        assert!(header.is_overridden("via"));
        assert_eq!(header.get("x-a"), Some("1"));
    }

    #[test]
    fn del_clears_override() {
        let mut header = Header::new();
        header.set("Authorization", "Bearer t").add("X-A", "1");
        header.del(["authorization"]);

        assert!(!header.contains_key("Authorization"));
        assert!(!header.is_overridden("Authorization"));
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn reset_empties_everything() {
        let mut header: Header = [("a", "1"), ("b", "2")].into_iter().collect();
        header.set("c", "3");
        header.reset();

        assert!(header.is_empty());
        assert!(!header.is_overridden("c"));
    }
}
