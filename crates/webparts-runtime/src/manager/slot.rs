//! Web parts as the manager tracks them.

#![allow(missing_docs)]

use smol_str::SmolStr;
use webparts_core::{Part, PartError, PartType, PropertyDescriptor, PropertyValue};

use crate::state::PersonalizationFlags;

pub const ERROR_PART_TYPE: &str = "ErrorWebPart";
pub const UNAUTHORIZED_PART_TYPE: &str = "UnauthorizedWebPart";

/// Persisted description of a dynamically added part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicPartEntry {
    pub id: SmolStr,
    pub type_name: SmolStr,
    pub virtual_path: Option<SmolStr>,
    pub wrapper_id: Option<SmolStr>,
}

impl DynamicPartEntry {
    #[must_use]
    pub fn for_type(id: impl Into<SmolStr>, part_type: &PartType) -> Self {
        Self {
            id: id.into(),
            type_name: part_type.name().into(),
            virtual_path: part_type.virtual_path().map(SmolStr::new),
            wrapper_id: None,
        }
    }

    #[must_use]
    pub fn part_type(&self) -> PartType {
        match &self.virtual_path {
            Some(path) => PartType::templated(path.clone()),
            None => PartType::new(self.type_name.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// The stored type could not be instantiated.
    Error,
    /// A hook refused the stored type.
    Unauthorized,
}

/// Stands in for a part that cannot be shown, keeping its slot and data.
#[derive(Debug, Clone)]
pub struct PlaceholderPart {
    id: SmolStr,
    kind: PlaceholderKind,
    original: PartType,
}

impl PlaceholderPart {
    #[must_use]
    pub fn new(id: impl Into<SmolStr>, kind: PlaceholderKind, original: PartType) -> Self {
        Self {
            id: id.into(),
            kind,
            original,
        }
    }

    #[must_use]
    pub fn kind(&self) -> PlaceholderKind {
        self.kind
    }

    #[must_use]
    pub fn original_type(&self) -> &PartType {
        &self.original
    }

    #[must_use]
    pub fn message(&self) -> SmolStr {
        match self.kind {
            PlaceholderKind::Error => {
                format!("web part type '{}' could not be created", self.original).into()
            }
            PlaceholderKind::Unauthorized => {
                format!("web part type '{}' is not authorized", self.original).into()
            }
        }
    }
}

impl Part for PlaceholderPart {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        match self.kind {
            PlaceholderKind::Error => PartType::new(ERROR_PART_TYPE),
            PlaceholderKind::Unauthorized => PartType::new(UNAUTHORIZED_PART_TYPE),
        }
    }

    fn describe_properties(&self) -> Vec<PropertyDescriptor> {
        Vec::new()
    }

    fn property(&self, _name: &str) -> Option<PropertyValue> {
        None
    }

    fn set_property(&mut self, name: &str, _value: PropertyValue) -> Result<(), PartError> {
        Err(PartError::UnknownProperty(name.into()))
    }
}

/// A part on the page plus the manager's bookkeeping for it.
pub struct PartSlot {
    pub(crate) part: Box<dyn Part>,
    pub(crate) zone_id: Option<SmolStr>,
    pub(crate) zone_index: usize,
    pub(crate) is_closed: bool,
    pub(crate) is_static: bool,
    pub(crate) is_shared: bool,
    pub(crate) flags: PersonalizationFlags,
    pub(crate) connect_error: Option<SmolStr>,
    /// Set for dynamic parts; written back on save.
    pub(crate) entry: Option<DynamicPartEntry>,
    pub(crate) placeholder: Option<PlaceholderKind>,
}

impl std::fmt::Debug for PartSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartSlot")
            .field("id", &self.part.id())
            .field("part_type", &self.part.part_type())
            .field("zone_id", &self.zone_id)
            .field("zone_index", &self.zone_index)
            .field("is_closed", &self.is_closed)
            .field("is_static", &self.is_static)
            .field("is_shared", &self.is_shared)
            .field("flags", &self.flags)
            .field("connect_error", &self.connect_error)
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}

impl PartSlot {
    pub(crate) fn new_static(part: Box<dyn Part>, zone_id: SmolStr, zone_index: usize) -> Self {
        Self {
            part,
            zone_id: Some(zone_id),
            zone_index,
            is_closed: false,
            is_static: true,
            is_shared: true,
            flags: PersonalizationFlags::default(),
            connect_error: None,
            entry: None,
            placeholder: None,
        }
    }

    pub(crate) fn new_dynamic(
        part: Box<dyn Part>,
        entry: DynamicPartEntry,
        is_shared: bool,
    ) -> Self {
        Self {
            part,
            zone_id: None,
            zone_index: 0,
            is_closed: false,
            is_static: false,
            is_shared,
            flags: PersonalizationFlags::default(),
            connect_error: None,
            entry: Some(entry),
            placeholder: None,
        }
    }

    pub(crate) fn with_placeholder(mut self, kind: PlaceholderKind) -> Self {
        self.placeholder = Some(kind);
        self
    }

    #[must_use]
    pub fn part(&self) -> &dyn Part {
        self.part.as_ref()
    }

    #[must_use]
    pub fn zone_id(&self) -> Option<&str> {
        self.zone_id.as_deref()
    }

    #[must_use]
    pub fn zone_index(&self) -> usize {
        self.zone_index
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    /// Whether shared or user personalization was found for this part.
    #[must_use]
    pub fn flags(&self) -> PersonalizationFlags {
        self.flags
    }

    #[must_use]
    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<PlaceholderKind> {
        self.placeholder
    }

    #[must_use]
    pub fn entry(&self) -> Option<&DynamicPartEntry> {
        self.entry.as_ref()
    }
}
