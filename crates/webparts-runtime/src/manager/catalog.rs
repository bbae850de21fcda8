//! Creation of dynamic part instances by type.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use webparts_core::{Part, PartType};

/// Creates fresh part instances for stored or catalog part types.
pub trait PartCatalog: Send + Sync {
    fn create(&self, part_type: &PartType, id: &str) -> Option<Box<dyn Part>>;
}

pub type PartFactory = Arc<dyn Fn(&str) -> Box<dyn Part> + Send + Sync>;

/// Catalog backed by registered factories.
#[derive(Clone, Default)]
pub struct PartRegistry {
    factories: IndexMap<PartType, PartFactory>,
}

impl fmt::Debug for PartRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl PartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, part_type: PartType, factory: PartFactory) {
        self.factories.insert(part_type, factory);
    }

    #[must_use]
    pub fn with(mut self, part_type: PartType, factory: PartFactory) -> Self {
        self.register(part_type, factory);
        self
    }

    pub fn types(&self) -> impl Iterator<Item = &PartType> {
        self.factories.keys()
    }
}

impl PartCatalog for PartRegistry {
    fn create(&self, part_type: &PartType, id: &str) -> Option<Box<dyn Part>> {
        self.factories.get(part_type).map(|factory| factory(id))
    }
}
