//! Per-type personalizable property metadata.

#![allow(missing_docs)]

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use webparts_core::{Part, PartType, PropertyDescriptor};

/// Process-wide cache of each part type's personalizable properties.
///
/// Descriptors are computed outside the lock; two requests racing on a new
/// type may both compute it and the first insert wins.
#[derive(Debug, Default)]
pub struct PropertyMetadataCache {
    entries: RwLock<FxHashMap<PartType, Arc<[PropertyDescriptor]>>>,
}

impl PropertyMetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors for the runtime type of `part`.
    pub fn properties_for(&self, part: &dyn Part) -> Arc<[PropertyDescriptor]> {
        let part_type = part.part_type();
        if let Some(found) = self.entries.read().get(&part_type) {
            return Arc::clone(found);
        }
        let computed: Arc<[PropertyDescriptor]> = part.describe_properties().into();
        Arc::clone(self.entries.write().entry(part_type).or_insert(computed))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
