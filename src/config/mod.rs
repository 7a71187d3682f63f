//! Configuration module for Sitemap-Hunter
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and reading the seed list of domains to crawl.
//!
//! # Example
//!
//! ```no_run
//! use sitemap_hunter::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Politeness floor: {}ms", config.crawler.min_delay_ms);
//! ```

mod parser;
mod seeds;
mod types;
mod validation;

// Re-export types
pub use types::{BudgetConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use seeds::{load_seed_list, parse_seed_list};
