//! Catalog navigation values: cities and the links discovered between levels

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::constants::site;

/// One navigational link at category, subcategory or sub-subcategory level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLink {
    /// Trimmed anchor text
    pub text: String,
    /// Absolute URL
    pub url: String,
}

impl CatalogLink {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for CatalogLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.url)
    }
}

/// A city storefront of the site, identified by its URL slug
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct City {
    pub slug: String,
}

impl City {
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }

    /// Storefront root: the bare domain for the root city, `{domain}/{slug}` otherwise
    pub fn base_url(&self, domain: &str, root_city: &str) -> String {
        let domain = domain.trim_end_matches('/');
        if self.slug == root_city {
            domain.to_string()
        } else {
            format!("{}/{}", domain, self.slug)
        }
    }

    /// Prefix of every per-city artifact name
    pub fn store_prefix(&self) -> String {
        format!("{}-", self.slug)
    }

    /// Cities of a default run
    pub fn defaults() -> Vec<City> {
        site::CITIES.iter().map(|slug| City::new(*slug)).collect()
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug)
    }
}
