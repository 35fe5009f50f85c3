//! Data models for relwatch.
//!
//! These are the shapes the HTTP surface and the dashboard consume, so field
//! names are part of the public contract.

mod records;
mod version;

pub use records::*;
pub use version::*;
