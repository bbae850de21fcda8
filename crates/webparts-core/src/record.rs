//! Per-identifier personalization records.

#![allow(missing_docs)]

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::entry::PersonalizationDictionary;
use crate::part::PartType;
use crate::value::PropertyMap;

/// Stored personalization of one part.
///
/// Both maps are either absent or non-empty; the codec never writes an
/// empty one and decodes a zero count as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalizationRecord {
    pub control_id: SmolStr,
    /// Type of a page-declared part. Dynamic parts store no type.
    pub declared_type: Option<PartType>,
    pub properties: Option<PropertyMap>,
    pub custom_properties: Option<PersonalizationDictionary>,
}

impl PersonalizationRecord {
    #[must_use]
    pub fn new(control_id: impl Into<SmolStr>) -> Self {
        Self {
            control_id: control_id.into(),
            ..Self::default()
        }
    }

    /// Record for a page-declared part of type `declared_type`.
    #[must_use]
    pub fn for_static(control_id: impl Into<SmolStr>, declared_type: PartType) -> Self {
        Self {
            control_id: control_id.into(),
            declared_type: Some(declared_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = (!properties.is_empty()).then_some(properties);
        self
    }

    #[must_use]
    pub fn with_custom_properties(mut self, custom: PersonalizationDictionary) -> Self {
        self.custom_properties = (!custom.is_empty()).then_some(custom);
        self
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.declared_type.is_some()
    }

    /// True when neither map holds any data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.as_ref().is_none_or(IndexMap::is_empty)
            && self
                .custom_properties
                .as_ref()
                .is_none_or(PersonalizationDictionary::is_empty)
    }
}

/// Records keyed by personalization identifier.
pub type PersonalizationMap = IndexMap<SmolStr, PersonalizationRecord>;
