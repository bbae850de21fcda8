//! Connection point discovery cache.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use webparts_core::{ConnectionPointSet, Part, PartType};

/// Process-wide cache of declared connection points keyed by part type and culture.
///
/// Display names are localized, so the culture is part of the key. Racing
/// requests may compute the same key twice; the first stored set wins.
#[derive(Debug, Default)]
pub struct ConnectionPointCache {
    entries: RwLock<FxHashMap<(PartType, SmolStr), Arc<ConnectionPointSet>>>,
    computed: AtomicUsize,
}

impl ConnectionPointCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points_for(&self, part: &dyn Part, culture: &str) -> Arc<ConnectionPointSet> {
        let key = (part.part_type(), SmolStr::new(culture));
        if let Some(found) = self.entries.read().get(&key) {
            return Arc::clone(found);
        }
        let points = Arc::new(part.describe_connection_points(culture));
        self.computed.fetch_add(1, Ordering::Relaxed);
        Arc::clone(self.entries.write().entry(key).or_insert(points))
    }

    /// How many times descriptors were computed, including lost races.
    #[must_use]
    pub fn computations(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
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
