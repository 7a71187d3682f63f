//! State module for tracking traversal progress
//!
//! # Components
//!
//! - `Frontier`: FIFO work queue plus the visited set of the current epoch
//! - `UrlRecord`: cached validators and classification of a fetched URL
//! - `ErrorRecords`: per-URL failure counters
//! - `DomainState`: everything persisted for one domain
//! - `DomainStatus`: where a domain is in its traversal during a run

mod domain_state;
mod frontier;
mod status;
mod url_record;

// Re-export main types
pub use domain_state::DomainState;
pub use frontier::Frontier;
pub use status::{DomainStatus, SuspendReason};
pub use url_record::{ErrorRecords, UrlRecord, Validator};
