//! Part capability traits.
//!
//! A part is the unit a page composes. The engine only needs identity, a
//! type for stale-data detection, an ordered list of personalizable
//! properties with get/set by name, and optional load/save capabilities.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use crate::connection_point::{ConnectionPointKind, ConnectionPointSet, InterfaceType};
use crate::entry::PersonalizationDictionary;
use crate::error::PartError;
use crate::scope::PersonalizationScope;
use crate::value::{PropertyMap, PropertyValue};

/// Type name shared by all template-backed parts. Such parts are told
/// apart by their virtual path.
pub const TEMPLATED_CONTROL_TYPE: &str = "TemplatedControl";

/// Runtime type of a part, as stored with static personalization records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartType {
    name: SmolStr,
    virtual_path: Option<SmolStr>,
}

impl PartType {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            virtual_path: None,
        }
    }

    /// Type of a part instantiated from a template file.
    #[must_use]
    pub fn templated(virtual_path: impl Into<SmolStr>) -> Self {
        Self {
            name: SmolStr::new_inline(TEMPLATED_CONTROL_TYPE),
            virtual_path: Some(virtual_path.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn virtual_path(&self) -> Option<&str> {
        self.virtual_path.as_deref()
    }

    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.name == TEMPLATED_CONTROL_TYPE
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.virtual_path {
            Some(path) => write!(f, "{}({path})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Metadata for one personalizable property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: SmolStr,
    pub scope: PersonalizationScope,
    pub is_sensitive: bool,
}

impl PropertyDescriptor {
    #[must_use]
    pub fn user(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            scope: PersonalizationScope::User,
            is_sensitive: false,
        }
    }

    #[must_use]
    pub fn shared(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            scope: PersonalizationScope::Shared,
            is_sensitive: false,
        }
    }

    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }
}

/// Channel through which a part asks to be marked dirty while it loads.
///
/// Only handed out during `Personalizable::load` and
/// `TrackingPersonalizable::end_load`; writes the engine performs on the
/// part's properties never carry one.
#[derive(Debug, Default)]
pub struct LoadContext {
    dirty: bool,
}

impl LoadContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn dirty_requested(&self) -> bool {
        self.dirty
    }
}

/// Free-form state kept outside typed properties.
pub trait Personalizable {
    fn is_dirty(&self) -> bool;
    fn load(&mut self, state: &PersonalizationDictionary, cx: &mut LoadContext);
    fn save(&self, state: &mut PersonalizationDictionary);
}

/// Opt-in load/save bracketing. A part that tracks its own changes is not
/// diffed on postback.
pub trait TrackingPersonalizable {
    fn tracks_changes(&self) -> bool;
    fn begin_load(&mut self);
    fn end_load(&mut self, cx: &mut LoadContext);
    fn begin_save(&mut self);
    fn end_save(&mut self);
}

/// Receives stored properties that no longer map to a live property.
pub trait VersioningPersonalizable {
    fn load_unused(&mut self, unused: &PropertyMap);
}

/// A composable page unit.
pub trait Part {
    fn id(&self) -> &str;

    fn part_type(&self) -> PartType;

    /// Personalizable properties in declaration order. Called once per type.
    fn describe_properties(&self) -> Vec<PropertyDescriptor>;

    fn property(&self, name: &str) -> Option<PropertyValue>;

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PartError>;

    fn as_personalizable(&mut self) -> Option<&mut dyn Personalizable> {
        None
    }

    fn as_tracking(&mut self) -> Option<&mut dyn TrackingPersonalizable> {
        None
    }

    fn as_versioning(&mut self) -> Option<&mut dyn VersioningPersonalizable> {
        None
    }

    /// Connection points declared by this part's type, with display names
    /// for `culture`. Called once per type and culture.
    fn describe_connection_points(&self, _culture: &str) -> ConnectionPointSet {
        ConnectionPointSet::new(self.part_type())
    }

    fn connection_point_enabled(&self, _kind: ConnectionPointKind, _point_id: &str) -> bool {
        true
    }

    /// Extra interfaces a provider point offers next to its primary one.
    fn secondary_interfaces(&self, _point_id: &str) -> Vec<InterfaceType> {
        Vec::new()
    }

    /// Whether a consumer point accepts a provider offering `secondary`.
    fn accepts_secondary_interfaces(&self, _point_id: &str, _secondary: &[InterfaceType]) -> bool {
        true
    }

    /// Value published on a provider point.
    fn provide(&self, _point_id: &str) -> Option<PropertyValue> {
        None
    }

    /// Receives a value on a consumer point.
    fn consume(&mut self, _point_id: &str, _value: Option<PropertyValue>) {}
}
