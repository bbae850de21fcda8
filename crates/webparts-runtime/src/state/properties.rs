//! Reading, writing and comparing typed property snapshots.

use tracing::debug;
use webparts_core::{Part, PersonalizationScope, PropertyDescriptor, PropertyMap, PropertyValue};

/// Reads the current values of `descriptors` from `part`.
///
/// In user scope shared-scope properties are skipped. A value equal to its
/// default is left out unless the name was part of the initial snapshot,
/// so a property reset to its default is still written back.
pub(crate) fn collect_properties(
    part: &dyn Part,
    descriptors: &[PropertyDescriptor],
    defaults: Option<&PropertyMap>,
    initial: Option<&PropertyMap>,
    scope: PersonalizationScope,
) -> Option<PropertyMap> {
    if descriptors.is_empty() {
        return None;
    }
    let mut out = PropertyMap::new();
    for descriptor in descriptors {
        if scope.is_user() && descriptor.scope.is_shared() {
            continue;
        }
        let value = part.property(&descriptor.name).unwrap_or(PropertyValue::Null);
        let in_initial = initial.is_some_and(|initial| initial.contains_key(&descriptor.name));
        if !in_initial {
            if let Some(defaults) = defaults {
                let default = defaults.get(&descriptor.name).unwrap_or(&PropertyValue::Null);
                if *default == value {
                    continue;
                }
            }
        }
        out.insert(descriptor.name.clone(), value);
    }
    (!out.is_empty()).then_some(out)
}

/// Writes `state` into `part` and returns what could not be applied.
///
/// A user-scope write never touches a shared-scope property. Unknown names
/// and values the part rejects end up in the returned map.
pub(crate) fn assign_properties(
    part: &mut dyn Part,
    descriptors: &[PropertyDescriptor],
    state: &PropertyMap,
    scope: PersonalizationScope,
) -> Option<PropertyMap> {
    if descriptors.is_empty() {
        return (!state.is_empty()).then(|| state.clone());
    }
    let mut unused = PropertyMap::new();
    for (name, value) in state {
        let writable = descriptors
            .iter()
            .find(|descriptor| descriptor.name == *name)
            .is_some_and(|descriptor| scope.is_shared() || descriptor.scope.is_user());
        let applied = writable
            && match part.set_property(name, value.clone()) {
                Ok(()) => true,
                Err(err) => {
                    debug!(
                        part = part.id(),
                        property = %name,
                        error = %err,
                        "stored value rejected"
                    );
                    false
                }
            };
        if !applied {
            unused.insert(name.clone(), value.clone());
        }
    }
    (!unused.is_empty()).then_some(unused)
}

/// True when the two snapshots differ. `None` and an empty map are equal.
pub(crate) fn properties_differ(new: Option<&PropertyMap>, old: Option<&PropertyMap>) -> bool {
    let new_len = new.map_or(0, PropertyMap::len);
    let old_len = old.map_or(0, PropertyMap::len);
    if new_len != old_len {
        return true;
    }
    let (Some(new), Some(old)) = (new, old) else {
        return false;
    };
    new.iter().any(|(name, value)| old.get(name) != Some(value))
}

/// Layers `overrides` on top of `base`.
pub(crate) fn merge_unused(
    base: Option<PropertyMap>,
    overrides: Option<PropertyMap>,
) -> Option<PropertyMap> {
    match (base, overrides) {
        (Some(mut base), Some(overrides)) => {
            base.extend(overrides);
            Some(base)
        }
        (base, None) => base,
        (None, overrides) => overrides,
    }
}
