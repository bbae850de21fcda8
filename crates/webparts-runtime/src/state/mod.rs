//! Personalization state engine.
//!
//! One [`PersonalizationState`] lives for one request. It holds the decoded
//! shared layer, the raw user layer (decoded on first use), a `ControlInfo`
//! per personalized identifier, and the records extracted for saving.
//!
//! Apply layers default, shared and user values onto a live part. Extract
//! reads the part back after the postback ran and keeps only what differs
//! from the loaded baseline.

#![allow(missing_docs)]

mod bracket;
mod control_info;
mod properties;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;
use webparts_core::{
    decode_state, encode_state, LoadContext, Part, PartType, PersonalizationDictionary,
    PersonalizationMap, PersonalizationRecord, PersonalizationScope,
};

use crate::error::WebPartsError;
use crate::metadata::PropertyMetadataCache;

use bracket::{LoadBracket, SaveBracket};
use control_info::ControlInfo;
pub use control_info::PersonalizationFlags;
use properties::{assign_properties, collect_properties, merge_unused, properties_differ};

/// How a part takes part in Apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// The page manager's own record: custom state only, no typed properties.
    pub is_root: bool,
    /// Scope used to decide which stored user values may be applied.
    pub extraction_scope: PersonalizationScope,
}

impl ApplyOptions {
    #[must_use]
    pub fn root(scope: PersonalizationScope) -> Self {
        Self {
            is_root: true,
            extraction_scope: scope,
        }
    }

    #[must_use]
    pub fn part(extraction_scope: PersonalizationScope) -> Self {
        Self {
            is_root: false,
            extraction_scope,
        }
    }
}

/// How a part takes part in Extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub is_root: bool,
    pub scope: PersonalizationScope,
    /// Page-declared parts store their type for stale-data detection.
    pub is_static: bool,
}

impl ExtractOptions {
    #[must_use]
    pub fn root(scope: PersonalizationScope) -> Self {
        Self {
            is_root: true,
            scope,
            is_static: true,
        }
    }

    #[must_use]
    pub fn part(scope: PersonalizationScope, is_static: bool) -> Self {
        Self {
            is_root: false,
            scope,
            is_static,
        }
    }
}

#[derive(Debug)]
pub struct PersonalizationState {
    scope: PersonalizationScope,
    is_post_request: bool,
    shared: Option<PersonalizationMap>,
    raw_user: Option<Vec<u8>>,
    user: Option<PersonalizationMap>,
    controls: FxHashMap<SmolStr, ControlInfo>,
    applied: bool,
    extracted: PersonalizationMap,
    dirty: bool,
    metadata: Arc<PropertyMetadataCache>,
}

impl PersonalizationState {
    #[must_use]
    pub fn new(
        scope: PersonalizationScope,
        is_post_request: bool,
        metadata: Arc<PropertyMetadataCache>,
    ) -> Self {
        Self {
            scope,
            is_post_request,
            shared: None,
            raw_user: None,
            user: None,
            controls: FxHashMap::default(),
            applied: false,
            extracted: PersonalizationMap::new(),
            dirty: false,
            metadata,
        }
    }

    #[must_use]
    pub fn scope(&self) -> PersonalizationScope {
        self.scope
    }

    /// Decodes the shared blob now and keeps the user blob for first use.
    pub fn load_data_blobs(
        &mut self,
        shared: Option<&[u8]>,
        user: Option<Vec<u8>>,
    ) -> Result<(), WebPartsError> {
        let shared = decode_state(shared.unwrap_or_default())?;
        debug!(records = shared.len(), "loaded shared personalization");
        self.shared = Some(shared);
        self.raw_user = user;
        self.user = None;
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.shared.is_some()
    }

    fn user_state(&mut self) -> Result<&PersonalizationMap, WebPartsError> {
        if self.user.is_none() {
            let decoded = decode_state(self.raw_user.as_deref().unwrap_or_default())?;
            debug!(records = decoded.len(), "decoded user personalization");
            self.raw_user = None;
            self.user = Some(decoded);
        }
        Ok(self.user.get_or_insert_with(PersonalizationMap::new))
    }

    /// Applies stored personalization to `part` under `id`.
    pub fn apply(
        &mut self,
        part: &mut dyn Part,
        id: &str,
        options: ApplyOptions,
    ) -> Result<PersonalizationFlags, WebPartsError> {
        if self.controls.contains_key(id) {
            return Err(WebPartsError::AlreadyApplied(id.into()));
        }
        let Some(shared_state) = self.shared.as_ref() else {
            return Err(WebPartsError::NotLoaded);
        };
        let part_type = part.part_type();
        let mut info = ControlInfo::new(self.metadata.properties_for(part));
        let mut flags = PersonalizationFlags::default();

        let mut shared = shared_state.get(id).cloned();
        if shared.as_ref().is_some_and(|record| is_stale(record, &part_type)) {
            debug!(id, %part_type, "discarding shared personalization of another part type");
            shared = None;
            if self.scope.is_shared() {
                info.dirty = true;
            }
        }

        let mut user = None;
        if self.scope.is_user() {
            user = self.user_state()?.get(id).cloned();
            if user.as_ref().is_some_and(|record| is_stale(record, &part_type)) {
                debug!(id, %part_type, "discarding user personalization of another part type");
                user = None;
                info.dirty = true;
            }
        }
        self.applied = true;

        let mut bracket = LoadBracket::open(part);
        self.load_custom_properties(
            bracket.part(),
            &mut info,
            &mut flags,
            shared.as_ref(),
            user.as_ref(),
            options.is_root,
        );
        if !options.is_root {
            self.apply_typed_properties(
                bracket.part(),
                &mut info,
                &mut flags,
                shared.as_ref(),
                user.as_ref(),
                options.extraction_scope,
            );
        }
        info.allow_set_dirty = true;
        if bracket.finish() {
            info.dirty = true;
        }

        info.flags = flags;
        self.controls.insert(id.into(), info);
        Ok(flags)
    }

    fn load_custom_properties(
        &self,
        part: &mut dyn Part,
        info: &mut ControlInfo,
        flags: &mut PersonalizationFlags,
        shared: Option<&PersonalizationRecord>,
        user: Option<&PersonalizationRecord>,
        is_root: bool,
    ) {
        let Some(personalizable) = part.as_personalizable() else {
            return;
        };
        let shared_custom = shared.and_then(|record| record.custom_properties.as_ref());
        let user_custom = user.and_then(|record| record.custom_properties.as_ref());
        let merged = match (shared_custom, user_custom) {
            (Some(shared), Some(user)) => {
                let mut merged = shared.clone();
                merged.merge_overriding(user);
                Some(merged)
            }
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        };
        info.custom_initial = match self.scope {
            PersonalizationScope::Shared => shared_custom.cloned(),
            PersonalizationScope::User => user_custom.cloned(),
        };
        if !is_root {
            flags.has_shared_data |= shared_custom.is_some();
            flags.has_user_data |= user_custom.is_some();
        }
        if let Some(merged) = merged {
            let mut cx = LoadContext::new();
            personalizable.load(&merged, &mut cx);
            if cx.dirty_requested() {
                info.dirty = true;
            }
        }
    }

    fn apply_typed_properties(
        &self,
        part: &mut dyn Part,
        info: &mut ControlInfo,
        flags: &mut PersonalizationFlags,
        shared: Option<&PersonalizationRecord>,
        user: Option<&PersonalizationRecord>,
        extraction_scope: PersonalizationScope,
    ) {
        let descriptors = Arc::clone(&info.properties);
        if self.scope.is_shared() {
            info.defaults = collect_properties(part, &descriptors, None, None, extraction_scope);
        }

        let shared_properties = shared
            .and_then(|record| record.properties.as_ref())
            .filter(|properties| !properties.is_empty());
        let mut unused_shared = None;
        if let Some(properties) = shared_properties {
            flags.has_shared_data = true;
            unused_shared =
                assign_properties(part, &descriptors, properties, PersonalizationScope::Shared);
        }

        let mut unused_user = None;
        if self.scope.is_user() {
            // A user diff is taken against the shared layer, not the bare part.
            info.defaults = collect_properties(part, &descriptors, None, None, extraction_scope);
            let user_properties = user
                .and_then(|record| record.properties.as_ref())
                .filter(|properties| !properties.is_empty());
            if let Some(properties) = user_properties {
                flags.has_user_data = true;
                unused_user = assign_properties(part, &descriptors, properties, extraction_scope);
            }
            info.initial = user_properties.cloned();
        } else {
            info.initial = shared_properties.cloned();
        }

        if let Some(unused) = merge_unused(unused_shared, unused_user) {
            debug!(part = part.id(), count = unused.len(), "stored properties no longer apply");
            match part.as_versioning() {
                Some(versioning) => versioning.load_unused(&unused),
                None => info.dirty = true,
            }
        }
    }

    /// Reads `part` back and records what should be persisted for `id`.
    pub fn extract(
        &mut self,
        part: &mut dyn Part,
        id: &str,
        options: ExtractOptions,
    ) -> Result<PersonalizationFlags, WebPartsError> {
        if !self.applied {
            return Err(WebPartsError::NotApplied);
        }
        let Some(info) = self.controls.get(id) else {
            return Err(WebPartsError::CannotExtract(id.into()));
        };
        let part_type = part.part_type();
        let descriptors = Arc::clone(&info.properties);
        let dirty = info.dirty;
        let mut properties = info.initial.clone();
        let mut custom = info.custom_initial.clone();
        let mut changed = false;

        {
            let mut bracket = SaveBracket::open(part);
            let part = bracket.part();
            if self.is_post_request {
                let tracks_changes = part
                    .as_tracking()
                    .is_some_and(|tracking| tracking.tracks_changes());
                let diff_with_initial = !dirty;
                if dirty || !tracks_changes {
                    if let Some(personalizable) = part.as_personalizable() {
                        if dirty || personalizable.is_dirty() {
                            let mut saved = PersonalizationDictionary::new();
                            personalizable.save(&mut saved);
                            let had_custom = custom.as_ref().is_some_and(|c| !c.is_empty());
                            if !saved.is_empty() || had_custom {
                                if options.scope.is_user() {
                                    saved.remove_shared_properties();
                                }
                                custom = (!saved.is_empty()).then_some(saved);
                                changed = true;
                            }
                        }
                    }
                    if !options.is_root {
                        let fresh = collect_properties(
                            part,
                            &descriptors,
                            info.defaults.as_ref(),
                            info.initial.as_ref(),
                            options.scope,
                        );
                        if !diff_with_initial
                            || properties_differ(fresh.as_ref(), info.initial.as_ref())
                        {
                            properties = fresh;
                            changed = true;
                        }
                    }
                }
            } else if dirty {
                if let Some(personalizable) = part.as_personalizable() {
                    let mut saved = PersonalizationDictionary::new();
                    personalizable.save(&mut saved);
                    if !saved.is_empty() || custom.as_ref().is_some_and(|c| !c.is_empty()) {
                        if options.scope.is_user() {
                            saved.remove_shared_properties();
                        }
                        custom = (!saved.is_empty()).then_some(saved);
                    }
                }
                if !options.is_root {
                    properties =
                        collect_properties(part, &descriptors, None, None, options.scope);
                }
                changed = true;
            }
        }

        let record = PersonalizationRecord {
            control_id: id.into(),
            declared_type: options.is_static.then_some(part_type),
            properties: properties.filter(|map| !map.is_empty()),
            custom_properties: custom.filter(|dict| !dict.is_empty()),
        };
        let has_data = !record.is_empty();
        self.extracted.insert(id.into(), record);
        if changed {
            self.dirty = true;
        }

        let mut flags = PersonalizationFlags::default();
        if has_data && !options.is_root {
            match self.scope {
                PersonalizationScope::Shared => flags.has_shared_data = true,
                PersonalizationScope::User => flags.has_user_data = true,
            }
        }
        if let Some(info) = self.controls.get_mut(id) {
            info.flags.merge(flags);
        }
        Ok(flags)
    }

    /// Carries the loaded record for `id` into the saved set unchanged.
    ///
    /// Used for placeholder parts whose real type could not be created.
    pub fn round_trip(&mut self, id: &str) -> Result<(), WebPartsError> {
        let record = match self.scope {
            PersonalizationScope::Shared => self
                .shared
                .as_ref()
                .ok_or(WebPartsError::NotLoaded)?
                .get(id)
                .cloned(),
            PersonalizationScope::User => {
                if self.shared.is_none() {
                    return Err(WebPartsError::NotLoaded);
                }
                self.user_state()?.get(id).cloned()
            }
        };
        if let Some(record) = record {
            self.extracted.insert(id.into(), record);
        }
        Ok(())
    }

    /// Copies property values and custom state from `source` onto `target`.
    pub fn copy_personalization_state(
        &self,
        source: &mut dyn Part,
        target: &mut dyn Part,
    ) -> Result<(), WebPartsError> {
        let source_properties = self.metadata.properties_for(source);
        let target_properties = self.metadata.properties_for(target);
        if let Some(values) = collect_properties(
            source,
            &source_properties,
            None,
            None,
            PersonalizationScope::Shared,
        ) {
            if let Some(unused) = assign_properties(
                target,
                &target_properties,
                &values,
                PersonalizationScope::Shared,
            ) {
                debug!(target = target.id(), count = unused.len(), "template values not copied");
            }
        }
        let mut custom = PersonalizationDictionary::new();
        if let Some(personalizable) = source.as_personalizable() {
            personalizable.save(&mut custom);
        }
        if !custom.is_empty() {
            if let Some(personalizable) = target.as_personalizable() {
                personalizable.load(&custom, &mut LoadContext::new());
            }
        }
        Ok(())
    }

    /// Marks `id` dirty if the part is currently allowed to do so.
    pub fn set_part_dirty(&mut self, id: &str) -> bool {
        match self.controls.get_mut(id) {
            Some(info) if info.allow_set_dirty => {
                info.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Marks `id` dirty regardless of the guard.
    pub fn force_part_dirty(&mut self, id: &str) {
        if let Some(info) = self.controls.get_mut(id) {
            info.dirty = true;
        }
    }

    #[must_use]
    pub fn is_part_dirty(&self, id: &str) -> bool {
        self.controls.get(id).is_some_and(|info| info.dirty)
    }

    /// Flags recorded by Apply and Extract for `id`.
    #[must_use]
    pub fn personalization_flags(&self, id: &str) -> PersonalizationFlags {
        self.controls
            .get(id)
            .map(|info| info.flags)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_applied(&self, id: &str) -> bool {
        self.controls.contains_key(id)
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when an extraction changed something worth saving.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn extracted(&self) -> &PersonalizationMap {
        &self.extracted
    }

    /// True when nothing extracted carries data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extracted.values().all(PersonalizationRecord::is_empty)
    }

    /// Encodes the extracted records; `None` means there is nothing to keep.
    #[must_use]
    pub fn save_data_blob(&self) -> Option<Vec<u8>> {
        encode_state(&self.extracted)
    }
}

fn is_stale(record: &PersonalizationRecord, part_type: &PartType) -> bool {
    record
        .declared_type
        .as_ref()
        .is_some_and(|declared| declared != part_type)
}
