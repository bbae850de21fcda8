//! Scope-tagged personalization entries.
//!
//! Parts that keep free-form state outside their typed properties hand it
//! to the engine as a [`PersonalizationDictionary`]. Each entry carries the
//! scope it was written in so user-scope saves can strip shared values.

#![allow(missing_docs)]

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::scope::PersonalizationScope;
use crate::value::PropertyValue;

/// A value with its scope and sensitivity flag.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizationEntry {
    pub value: PropertyValue,
    pub scope: PersonalizationScope,
    /// Sensitive entries are left out of exports.
    pub is_sensitive: bool,
}

impl PersonalizationEntry {
    #[must_use]
    pub fn new(value: impl Into<PropertyValue>, scope: PersonalizationScope) -> Self {
        Self {
            value: value.into(),
            scope,
            is_sensitive: false,
        }
    }

    #[must_use]
    pub fn sensitive(value: impl Into<PropertyValue>, scope: PersonalizationScope) -> Self {
        Self {
            value: value.into(),
            scope,
            is_sensitive: true,
        }
    }
}

/// Ordered name to entry map. Names compare case-insensitively; the
/// spelling of the first insert is the one reported back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalizationDictionary {
    entries: IndexMap<SmolStr, (SmolStr, PersonalizationEntry)>,
}

type Slot = (SmolStr, PersonalizationEntry);

fn fold(name: &str) -> SmolStr {
    if name.chars().any(char::is_uppercase) {
        name.to_lowercase().into()
    } else {
        name.into()
    }
}

fn split(slot: &Slot) -> (&SmolStr, &PersonalizationEntry) {
    (&slot.0, &slot.1)
}

impl PersonalizationDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `name`, returning the old entry.
    pub fn insert(
        &mut self,
        name: impl Into<SmolStr>,
        entry: PersonalizationEntry,
    ) -> Option<PersonalizationEntry> {
        let name = name.into();
        match self.entries.get_mut(&fold(&name)) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, entry)),
            None => {
                self.entries.insert(fold(&name), (name, entry));
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PersonalizationEntry> {
        self.entries.get(&fold(name)).map(|slot| &slot.1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PersonalizationEntry> {
        self.entries.get_mut(&fold(name)).map(|slot| &mut slot.1)
    }

    /// Value of `name`, if present.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.get(name).map(|entry| &entry.value)
    }

    pub fn remove(&mut self, name: &str) -> Option<PersonalizationEntry> {
        self.entries.shift_remove(&fold(name)).map(|slot| slot.1)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &PersonalizationEntry)> {
        self.entries.values().map(split)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.entries.values().map(|slot| &slot.0)
    }

    /// Drops every entry whose scope is shared.
    pub fn remove_shared_properties(&mut self) {
        self.entries.retain(|_, slot| !slot.1.scope.is_shared());
    }

    /// Copies every entry of `other` into `self`, replacing entries with the same name.
    pub fn merge_overriding(&mut self, other: &PersonalizationDictionary) {
        for (name, entry) in other {
            self.insert(name.clone(), entry.clone());
        }
    }
}

impl FromIterator<(SmolStr, PersonalizationEntry)> for PersonalizationDictionary {
    fn from_iter<T: IntoIterator<Item = (SmolStr, PersonalizationEntry)>>(iter: T) -> Self {
        let mut dict = Self::new();
        for (name, entry) in iter {
            dict.insert(name, entry);
        }
        dict
    }
}

impl<'a> IntoIterator for &'a PersonalizationDictionary {
    type Item = (&'a SmolStr, &'a PersonalizationEntry);
    type IntoIter = std::iter::Map<
        indexmap::map::Values<'a, SmolStr, Slot>,
        fn(&'a Slot) -> (&'a SmolStr, &'a PersonalizationEntry),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .values()
            .map(split as fn(&'a Slot) -> (&'a SmolStr, &'a PersonalizationEntry))
    }
}
