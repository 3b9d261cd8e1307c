//! Product record - an ordered, open set of string fields
//!
//! The field set differs from page to page (characteristics are harvested
//! verbatim), so a record is a string map that keeps insertion order rather
//! than a fixed struct.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::constants::fields;

/// One extracted product (or one variant of a product)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord {
    fields: IndexMap<String, String>,
}

impl ProductRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Merge characteristics (or any other mapping) in iteration order
    pub fn merge<I, K, V>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in other {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Deduplication key
    pub fn product_url(&self) -> Option<&str> {
        self.get(fields::PRODUCT_URL)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ProductRecord {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Product URLs already handed to persistence during one city run.
///
/// Owned by a single city run and only ever grows.
#[derive(Debug, Default)]
pub struct SeenProducts {
    urls: HashSet<String>,
}

impl SeenProducts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the records whose product URL has not been seen yet, recording them as seen.
    /// Records without a product URL are dropped.
    pub fn retain_unseen(&mut self, records: Vec<ProductRecord>) -> Vec<ProductRecord> {
        records
            .into_iter()
            .filter(|record| match record.product_url() {
                Some(url) => self.urls.insert(url.to_string()),
                None => false,
            })
            .collect()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
