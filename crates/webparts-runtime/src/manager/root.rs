//! The manager's own personalization record.
//!
//! Page structure that is not a property of any single part (zone
//! placement, dynamic parts, dynamic and deleted connections) is kept as
//! custom entries on a record named after the manager. Each kind has a
//! shared and a user key so both layers can coexist in one merged load.
//! Values are flat lists with a fixed number of slots per item.

#![allow(missing_docs)]

use smol_str::SmolStr;
use tracing::debug;
use webparts_core::{
    LoadContext, Part, PartError, PartType, Personalizable, PersonalizationDictionary,
    PersonalizationEntry, PersonalizationScope, PropertyDescriptor, PropertyValue,
};

use super::slot::DynamicPartEntry;

pub const MANAGER_PART_TYPE: &str = "WebPartManager";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateKey {
    WebPartState,
    DynamicWebParts,
    DeletedConnections,
    DynamicConnections,
}

impl StateKey {
    pub(crate) fn name(self, scope: PersonalizationScope) -> &'static str {
        match (self, scope) {
            (Self::WebPartState, PersonalizationScope::Shared) => "WebPartStateShared",
            (Self::WebPartState, PersonalizationScope::User) => "WebPartStateUser",
            (Self::DynamicWebParts, PersonalizationScope::Shared) => "DynamicWebPartsShared",
            (Self::DynamicWebParts, PersonalizationScope::User) => "DynamicWebPartsUser",
            (Self::DeletedConnections, PersonalizationScope::Shared) => "DeletedConnectionsShared",
            (Self::DeletedConnections, PersonalizationScope::User) => "DeletedConnectionsUser",
            (Self::DynamicConnections, PersonalizationScope::Shared) => "DynamicConnectionsShared",
            (Self::DynamicConnections, PersonalizationScope::User) => "DynamicConnectionsUser",
        }
    }

    fn width(self) -> usize {
        match self {
            Self::WebPartState | Self::DynamicWebParts => 4,
            Self::DeletedConnections => 1,
            Self::DynamicConnections => 7,
        }
    }
}

/// Zone placement of one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartState {
    pub(crate) id: SmolStr,
    pub(crate) zone: SmolStr,
    pub(crate) index: usize,
    pub(crate) closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConnectionEntry {
    pub(crate) id: SmolStr,
    pub(crate) consumer: SmolStr,
    pub(crate) consumer_point: SmolStr,
    pub(crate) provider: SmolStr,
    pub(crate) provider_point: SmolStr,
    pub(crate) transformer: Option<SmolStr>,
    pub(crate) configuration: Option<PropertyValue>,
}

/// Decoded items plus whether any item had to be skipped.
#[derive(Debug)]
pub(crate) struct Decoded<T> {
    pub(crate) items: Vec<T>,
    pub(crate) malformed: bool,
}

#[derive(Debug)]
pub(crate) struct ManagerRoot {
    id: SmolStr,
    loaded: PersonalizationDictionary,
    pending: PersonalizationDictionary,
    pub(crate) has_data_changed: bool,
}

impl ManagerRoot {
    pub(crate) fn new(id: SmolStr) -> Self {
        Self {
            id,
            loaded: PersonalizationDictionary::new(),
            pending: PersonalizationDictionary::new(),
            has_data_changed: false,
        }
    }

    pub(crate) fn set_pending(&mut self, pending: PersonalizationDictionary) {
        self.pending = pending;
    }

    fn items(&self, key: StateKey, scope: PersonalizationScope) -> Decoded<&[PropertyValue]> {
        let name = key.name(scope);
        let Some(value) = self.loaded.value(name) else {
            return Decoded {
                items: Vec::new(),
                malformed: false,
            };
        };
        let Some(list) = value.as_list() else {
            debug!(key = name, kind = value.kind(), "ignoring manager state that is not a list");
            return Decoded {
                items: Vec::new(),
                malformed: true,
            };
        };
        let width = key.width();
        let chunks = list.chunks_exact(width);
        let malformed = !chunks.remainder().is_empty();
        if malformed {
            debug!(key = name, len = list.len(), width, "manager state has a partial item");
        }
        Decoded {
            items: chunks.collect(),
            malformed,
        }
    }

    pub(crate) fn part_states(&self, scope: PersonalizationScope) -> Decoded<PartState> {
        self.decode(StateKey::WebPartState, scope, |item| {
            Some(PartState {
                id: SmolStr::new(item[0].as_str()?),
                zone: SmolStr::new(item[1].as_str()?),
                index: usize::try_from(item[2].as_int()?).ok()?,
                closed: item[3].as_bool()?,
            })
        })
    }

    pub(crate) fn dynamic_parts(&self, scope: PersonalizationScope) -> Decoded<DynamicPartEntry> {
        self.decode(StateKey::DynamicWebParts, scope, |item| {
            Some(DynamicPartEntry {
                id: SmolStr::new(item[0].as_str()?),
                type_name: SmolStr::new(item[1].as_str()?),
                virtual_path: optional_string(&item[2])?,
                wrapper_id: optional_string(&item[3])?,
            })
        })
    }

    pub(crate) fn deleted_connections(&self, scope: PersonalizationScope) -> Decoded<SmolStr> {
        self.decode(StateKey::DeletedConnections, scope, |item| {
            item[0].as_str().map(SmolStr::new)
        })
    }

    pub(crate) fn dynamic_connections(
        &self,
        scope: PersonalizationScope,
    ) -> Decoded<ConnectionEntry> {
        self.decode(StateKey::DynamicConnections, scope, |item| {
            Some(ConnectionEntry {
                id: SmolStr::new(item[0].as_str()?),
                consumer: SmolStr::new(item[1].as_str()?),
                consumer_point: SmolStr::new(item[2].as_str()?),
                provider: SmolStr::new(item[3].as_str()?),
                provider_point: SmolStr::new(item[4].as_str()?),
                transformer: optional_string(&item[5])?,
                configuration: (!item[6].is_null()).then(|| item[6].clone()),
            })
        })
    }

    fn decode<T>(
        &self,
        key: StateKey,
        scope: PersonalizationScope,
        read: impl Fn(&[PropertyValue]) -> Option<T>,
    ) -> Decoded<T> {
        let raw = self.items(key, scope);
        let mut malformed = raw.malformed;
        let mut items = Vec::with_capacity(raw.items.len());
        for item in raw.items {
            match read(item) {
                Some(decoded) => items.push(decoded),
                None => {
                    debug!(key = key.name(scope), "skipping malformed manager state item");
                    malformed = true;
                }
            }
        }
        Decoded { items, malformed }
    }
}

fn optional_string(value: &PropertyValue) -> Option<Option<SmolStr>> {
    match value {
        PropertyValue::Null => Some(None),
        PropertyValue::String(text) => Some(Some(text.clone())),
        _ => None,
    }
}

fn optional_value(value: Option<&SmolStr>) -> PropertyValue {
    value.map_or(PropertyValue::Null, |text| PropertyValue::String(text.clone()))
}

fn index_value(index: usize) -> PropertyValue {
    PropertyValue::Int(i32::try_from(index).unwrap_or(i32::MAX))
}

/// Builder for the custom entries written on save.
#[derive(Debug)]
pub(crate) struct StateWriter {
    scope: PersonalizationScope,
    dict: PersonalizationDictionary,
}

impl StateWriter {
    pub(crate) fn new(scope: PersonalizationScope) -> Self {
        Self {
            scope,
            dict: PersonalizationDictionary::new(),
        }
    }

    fn put(&mut self, key: StateKey, values: Vec<PropertyValue>) {
        if values.is_empty() {
            return;
        }
        self.dict.insert(
            key.name(self.scope),
            PersonalizationEntry::new(PropertyValue::List(values), self.scope),
        );
    }

    pub(crate) fn part_states(&mut self, states: &[PartState]) {
        let values = states
            .iter()
            .flat_map(|state| {
                [
                    PropertyValue::String(state.id.clone()),
                    PropertyValue::String(state.zone.clone()),
                    index_value(state.index),
                    PropertyValue::Bool(state.closed),
                ]
            })
            .collect();
        self.put(StateKey::WebPartState, values);
    }

    pub(crate) fn dynamic_parts<'a>(
        &mut self,
        entries: impl IntoIterator<Item = &'a DynamicPartEntry>,
    ) {
        let values = entries
            .into_iter()
            .flat_map(|entry| {
                [
                    PropertyValue::String(entry.id.clone()),
                    PropertyValue::String(entry.type_name.clone()),
                    optional_value(entry.virtual_path.as_ref()),
                    optional_value(entry.wrapper_id.as_ref()),
                ]
            })
            .collect();
        self.put(StateKey::DynamicWebParts, values);
    }

    pub(crate) fn deleted_connections<'a>(&mut self, ids: impl IntoIterator<Item = &'a SmolStr>) {
        let values = ids
            .into_iter()
            .map(|id| PropertyValue::String(id.clone()))
            .collect();
        self.put(StateKey::DeletedConnections, values);
    }

    pub(crate) fn dynamic_connections(&mut self, entries: &[ConnectionEntry]) {
        let values = entries
            .iter()
            .flat_map(|entry| {
                [
                    PropertyValue::String(entry.id.clone()),
                    PropertyValue::String(entry.consumer.clone()),
                    PropertyValue::String(entry.consumer_point.clone()),
                    PropertyValue::String(entry.provider.clone()),
                    PropertyValue::String(entry.provider_point.clone()),
                    optional_value(entry.transformer.as_ref()),
                    entry.configuration.clone().unwrap_or(PropertyValue::Null),
                ]
            })
            .collect();
        self.put(StateKey::DynamicConnections, values);
    }

    pub(crate) fn finish(self) -> PersonalizationDictionary {
        self.dict
    }
}

impl Part for ManagerRoot {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        PartType::new(MANAGER_PART_TYPE)
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

    fn as_personalizable(&mut self) -> Option<&mut dyn Personalizable> {
        Some(self)
    }
}

impl Personalizable for ManagerRoot {
    fn is_dirty(&self) -> bool {
        self.has_data_changed
    }

    fn load(&mut self, state: &PersonalizationDictionary, _cx: &mut LoadContext) {
        self.loaded = state.clone();
    }

    fn save(&self, state: &mut PersonalizationDictionary) {
        for (name, entry) in &self.pending {
            state.insert(name.clone(), entry.clone());
        }
    }
}
