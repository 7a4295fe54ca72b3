//! FILENAME: core/connector/src/lib.rs
//! Remote data source for the grid.
//!
//! - `bundle`: Configuration bundles and tolerant per-bundle decoding
//! - `source`: The `ConfigSource` trait and its HTTP, file and in-memory forms
//! - `load`: Load tokens that let a host drop stale responses
//! - `error`: `SourceError`

pub mod bundle;
pub mod error;
pub mod load;
pub mod source;

pub use bundle::{decode_bundle, decode_bundles, decode_bundles_str, field_value_from_json, ConfigBundle};
pub use error::SourceError;
pub use load::{LoadToken, LoadTracker};
pub use source::{ConfigSource, FileConfigSource, HttpConfigSource, StaticConfigSource};
