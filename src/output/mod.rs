//! Output module for reporting crawl results
//!
//! The content tree itself is the product; this module only reports on
//! the state store (`--stats`).

pub mod stats;

pub use stats::{
    format_statistics, load_statistics, print_statistics, CrawlStatistics, DomainStatistics,
};
