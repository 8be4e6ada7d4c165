//! Domain layer: event records, identity, and reference data.
//!
//! This module holds the storage-independent model: the ten-column
//! [`EventRecord`], its null-safe [`IdentityKey`], and the lookup tables
//! used to derive display values.

pub mod event_record;
pub mod identity_key;
pub mod reference;
pub mod timestamp;

pub use event_record::EventRecord;
pub use identity_key::{IdentityKey, Sentinels};
pub use reference::ReferenceData;
