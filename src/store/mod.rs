//! Storage Module
//!
//! In-memory, last-write-wins storage of timestamped records.

pub mod record;
mod versioned;

pub use record::Record;
pub use versioned::VersionedStore;
