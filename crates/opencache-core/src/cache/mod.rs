//! In-memory geocache cache for a map session.
//!
//! `GeocacheStore` accumulates every geocache returned by viewport fetches.
//! It is append/overwrite only and lives exactly as long as its owner;
//! nothing is written to disk.

pub mod store;

pub use store::{GeocacheStore, MergeStats};
