//! URL handling module for Sitemap-Hunter
//!
//! This module provides URL normalization and the `Domain` type, the
//! normalized origin every piece of traversal state is keyed by.

mod domain;
mod normalize;

pub use domain::{extract_domain, Domain};
pub use normalize::{normalize_url, resolve_link};
