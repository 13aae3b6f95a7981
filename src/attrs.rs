//! Ordered attribute map for NIML element headers.
//!
//! This module provides [`AttrMap`], a wrapper around [`IndexMap`] that keeps
//! header attributes in insertion order. NIML headers are re-serialized with a
//! deterministic key order, but the parse result preserves the order the
//! document used, which keeps diffs between a source document and its
//! re-serialization readable.
//!
//! Keys are unique within one element: inserting an existing key replaces its
//! value in place.
//!
//! ## Examples
//!
//! ```rust
//! use niml::AttrMap;
//!
//! let mut attrs = AttrMap::new();
//! attrs.insert("dset_type", "Node_Bucket");
//! attrs.insert("self_idcode", "XYZ");
//!
//! let keys: Vec<_> = attrs.keys().collect();
//! assert_eq!(keys, vec!["dset_type", "self_idcode"]);
//! ```

use indexmap::IndexMap;

/// An insertion-ordered map of header attribute keys to string values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttrMap(IndexMap<String, String>);

impl AttrMap {
    /// Creates an empty `AttrMap`.
    #[must_use]
    pub fn new() -> Self {
        AttrMap(IndexMap::new())
    }

    /// Inserts a key-value pair, returning the previous value if the key was
    /// already present. Replacement keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn shift_remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the keys, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns an iterator over the key-value pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for AttrMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        AttrMap(IndexMap::from_iter(iter))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for AttrMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        AttrMap(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl IntoIterator for AttrMap {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_preserved() {
        let mut attrs = AttrMap::new();
        attrs.insert("zz", "1");
        attrs.insert("aa", "2");
        attrs.insert("mm", "3");
        let keys: Vec<_> = attrs.keys().collect();
        assert_eq!(keys, vec!["zz", "aa", "mm"]);
    }

    #[test]
    fn duplicate_key_replaces_in_place() {
        let mut attrs = AttrMap::new();
        attrs.insert("a", "1");
        attrs.insert("b", "2");
        assert_eq!(attrs.insert("a", "3"), Some("1".to_string()));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("a"), Some("3"));
        assert_eq!(attrs.keys().next(), Some("a"));
    }
}
