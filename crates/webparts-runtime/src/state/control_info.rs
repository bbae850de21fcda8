#![allow(missing_docs)]

use std::sync::Arc;

use webparts_core::{PersonalizationDictionary, PropertyDescriptor, PropertyMap};

/// Whether a part carries shared or user personalization.
///
/// Reported by Apply and Extract so the owner of the part (or of the wrapper
/// hosting it) can show "personalized" affordances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersonalizationFlags {
    pub has_shared_data: bool,
    pub has_user_data: bool,
}

impl PersonalizationFlags {
    pub fn merge(&mut self, other: PersonalizationFlags) {
        self.has_shared_data |= other.has_shared_data;
        self.has_user_data |= other.has_user_data;
    }
}

/// Request-local bookkeeping for one personalized identifier.
#[derive(Debug)]
pub(crate) struct ControlInfo {
    pub(crate) properties: Arc<[PropertyDescriptor]>,
    /// Values before the current scope's layer was applied.
    pub(crate) defaults: Option<PropertyMap>,
    /// Stored layer for the current scope; the diff baseline.
    pub(crate) initial: Option<PropertyMap>,
    pub(crate) custom_initial: Option<PersonalizationDictionary>,
    pub(crate) dirty: bool,
    pub(crate) flags: PersonalizationFlags,
    /// Closed while the engine itself writes into the part.
    pub(crate) allow_set_dirty: bool,
}

impl ControlInfo {
    pub(crate) fn new(properties: Arc<[PropertyDescriptor]>) -> Self {
        Self {
            properties,
            defaults: None,
            initial: None,
            custom_initial: None,
            dirty: false,
            flags: PersonalizationFlags::default(),
            allow_set_dirty: false,
        }
    }
}
