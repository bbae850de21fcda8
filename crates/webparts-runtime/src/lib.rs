//! `webparts-runtime` - personalization engine, connection resolver and page manager for WebParts.
//!
//! One request builds a [`manager::WebPartManager`] around a
//! [`personalization::Personalization`] service. The manager registers
//! zones and parts, applies stored personalization, activates connections
//! and finally extracts and saves what changed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Personalization configuration loading.
pub mod config;
/// Connections, transformers and conflict resolution.
pub mod connection;
/// Personalization, connection and manager errors.
pub mod error;
/// Test harness for page request lifecycles.
pub mod harness;
/// Tracing subscriber set-up.
pub mod logging;
/// Page-level orchestration.
pub mod manager;
/// Per-type property metadata cache.
pub mod metadata;
/// Per-request personalization service.
pub mod personalization;
/// Request description.
pub mod request;
/// Personalization state engine.
pub mod state;
/// Personalization blob stores.
pub mod store;

pub use config::{PersonalizationConfig, StoreConfig};
pub use connection::{
    ConnectionCollection, ConnectionPointCache, RowToFieldTransformer, Transformer,
    TransformerRegistry, WebPartConnection,
};
pub use error::WebPartsError;
pub use harness::{PageHarness, PageRun};
pub use manager::{
    ConnectOutcome, ConnectionSubmission, DisplayMode, ManagerHooks, ManagerServices,
    PartCatalog, PartRegistry, WebPartManager, Zone,
};
pub use metadata::PropertyMetadataCache;
pub use personalization::{Personalization, SaveOutcome};
pub use request::{RequestContext, RequestMethod};
pub use state::{ApplyOptions, ExtractOptions, PersonalizationFlags, PersonalizationState};
pub use store::{FileStore, MemoryStore, PersonalizationStore};
