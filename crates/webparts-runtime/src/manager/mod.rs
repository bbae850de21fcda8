//! Page-level orchestration of zones, web parts and connections.
//!
//! A [`WebPartManager`] lives for one request. The host drives it through
//! the lifecycle: structure is registered first, [`WebPartManager::on_init`]
//! loads personalization, [`WebPartManager::on_init_complete`] restores
//! dynamic parts and connections and personalizes every part, user actions
//! run, [`WebPartManager::on_load_complete`] activates connections and
//! [`WebPartManager::on_save_state_complete`] extracts and persists.

#![allow(missing_docs)]

mod catalog;
mod connections;
mod display;
mod editing;
mod hooks;
mod parts;
mod root;
mod slot;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, warn};
use webparts_core::{PersonalizationDictionary, PersonalizationScope};

use crate::connection::{
    ConnectionCollection, ConnectionPointCache, TransformerRegistry, WebPartConnection,
};
use crate::error::WebPartsError;
use crate::personalization::{Personalization, SaveOutcome};
use crate::state::{ApplyOptions, ExtractOptions};

pub use catalog::{PartCatalog, PartFactory, PartRegistry};
pub use connections::{ConnectOutcome, ConnectionSubmission};
pub use display::{DisplayMode, Zone, ZoneKind};
pub use hooks::{
    AuthorizationRequest, HookContext, HookDecision, ManagerEvent, ManagerHooks, NoHooks,
};
pub use root::MANAGER_PART_TYPE;
pub use slot::{
    DynamicPartEntry, PartSlot, PlaceholderKind, PlaceholderPart, ERROR_PART_TYPE,
    UNAUTHORIZED_PART_TYPE,
};

use root::{ConnectionEntry, ManagerRoot, PartState, StateWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecyclePhase {
    Created,
    Initialized,
    InitComplete,
    LoadComplete,
    SaveStateComplete,
}

impl LifecyclePhase {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Created => "creation",
            Self::Initialized => "init",
            Self::InitComplete => "init complete",
            Self::LoadComplete => "load complete",
            Self::SaveStateComplete => "save state complete",
        }
    }
}

/// Process-wide collaborators shared by every request's manager.
#[derive(Clone)]
pub struct ManagerServices {
    pub catalog: Arc<dyn PartCatalog>,
    pub points: Arc<ConnectionPointCache>,
    pub transformers: Arc<TransformerRegistry>,
}

impl fmt::Debug for ManagerServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerServices")
            .field("points", &self.points)
            .field("transformers", &self.transformers)
            .finish_non_exhaustive()
    }
}

impl ManagerServices {
    #[must_use]
    pub fn new(catalog: Arc<dyn PartCatalog>) -> Self {
        Self {
            catalog,
            points: Arc::new(ConnectionPointCache::new()),
            transformers: Arc::new(TransformerRegistry::with_builtins()),
        }
    }

    #[must_use]
    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = Arc::new(transformers);
        self
    }
}

pub struct WebPartManager {
    id: SmolStr,
    personalization: Personalization,
    services: ManagerServices,
    hooks: Box<dyn ManagerHooks>,
    root: ManagerRoot,
    zones: IndexMap<SmolStr, Zone>,
    parts: IndexMap<SmolStr, PartSlot>,
    static_connections: ConnectionCollection,
    dynamic_connections: ConnectionCollection,
    display_mode: DisplayMode,
    selected: Option<SmolStr>,
    phase: LifecyclePhase,
}

impl fmt::Debug for WebPartManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebPartManager")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("personalization", &self.personalization)
            .field("zones", &self.zones.keys().collect::<Vec<_>>())
            .field("parts", &self.parts)
            .field("static_connections", &self.static_connections)
            .field("dynamic_connections", &self.dynamic_connections)
            .field("display_mode", &self.display_mode)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl WebPartManager {
    #[must_use]
    pub fn new(
        id: impl Into<SmolStr>,
        personalization: Personalization,
        services: ManagerServices,
    ) -> Self {
        let id = id.into();
        Self {
            root: ManagerRoot::new(id.clone()),
            id,
            personalization,
            services,
            hooks: Box::new(NoHooks),
            zones: IndexMap::new(),
            parts: IndexMap::new(),
            static_connections: ConnectionCollection::new("static"),
            dynamic_connections: ConnectionCollection::new("dynamic"),
            display_mode: DisplayMode::Browse,
            selected: None,
            phase: LifecyclePhase::Created,
        }
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn ManagerHooks>) {
        self.hooks = hooks;
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    #[must_use]
    pub fn personalization(&self) -> &Personalization {
        &self.personalization
    }

    pub fn personalization_mut(&mut self) -> &mut Personalization {
        &mut self.personalization
    }

    #[must_use]
    pub fn scope(&self) -> PersonalizationScope {
        self.personalization.scope()
    }

    /// Custom page state changed in this request and must be saved.
    #[must_use]
    pub fn has_data_changed(&self) -> bool {
        self.root.has_data_changed
    }

    /// Loads personalization and restores the manager's own record.
    pub fn on_init(&mut self) -> Result<(), WebPartsError> {
        self.ensure_phase("init", LifecyclePhase::Created)?;
        self.personalization.load()?;
        let scope = self.personalization.scope();
        let id = self.id.clone();
        self.personalization
            .apply_part(&mut self.root, &id, ApplyOptions::root(scope))?;
        self.phase = LifecyclePhase::Initialized;
        Ok(())
    }

    /// Restores dynamic structure and personalizes every part.
    pub fn on_init_complete(&mut self) -> Result<(), WebPartsError> {
        self.ensure_phase("init complete", LifecyclePhase::Initialized)?;
        self.load_dynamic_connections()?;
        self.load_deleted_connections();
        self.load_dynamic_parts();
        self.load_part_states();
        self.apply_parts()?;
        self.phase = LifecyclePhase::InitComplete;
        Ok(())
    }

    /// Closes orphaned parts and activates connections.
    pub fn on_load_complete(&mut self) -> Result<(), WebPartsError> {
        self.ensure_phase("load complete", LifecyclePhase::InitComplete)?;
        self.close_orphans()?;
        self.activate_connections()?;
        self.phase = LifecyclePhase::LoadComplete;
        Ok(())
    }

    /// Extracts personalization from the manager and every part, then saves.
    pub fn on_save_state_complete(&mut self) -> Result<SaveOutcome, WebPartsError> {
        self.ensure_phase("save state complete", LifecyclePhase::LoadComplete)?;
        let scope = self.personalization.scope();
        let id = self.id.clone();

        let pending = self.custom_state();
        self.root.set_pending(pending);
        if self.root.has_data_changed {
            self.personalization.force_part_dirty(&id);
        }
        self.personalization
            .extract_part(&mut self.root, &id, ExtractOptions::root(scope))?;

        for (part_id, slot) in &mut self.parts {
            if slot.placeholder.is_some() {
                self.personalization.round_trip(part_id)?;
                continue;
            }
            let options =
                ExtractOptions::part(extraction_scope(scope, slot.is_shared), slot.is_static);
            let flags = self
                .personalization
                .extract_part(slot.part.as_mut(), part_id, options)?;
            slot.flags.merge(flags);
        }

        let outcome = self.personalization.save()?;
        debug!(manager = %self.id, ?outcome, "page state saved");
        self.phase = LifecyclePhase::SaveStateComplete;
        Ok(outcome)
    }

    fn ensure_phase(
        &self,
        operation: &'static str,
        expected: LifecyclePhase,
    ) -> Result<(), WebPartsError> {
        if self.phase > expected {
            return Err(WebPartsError::TooLate {
                operation,
                phase: self.phase.name(),
            });
        }
        if self.phase < expected {
            return Err(WebPartsError::TooEarly {
                operation,
                phase: expected.name(),
            });
        }
        Ok(())
    }

    fn ensure_not_past(
        &self,
        operation: &'static str,
        last: LifecyclePhase,
    ) -> Result<(), WebPartsError> {
        if self.phase > last {
            return Err(WebPartsError::TooLate {
                operation,
                phase: self.phase.name(),
            });
        }
        Ok(())
    }

    fn ensure_reached(
        &self,
        operation: &'static str,
        first: LifecyclePhase,
    ) -> Result<(), WebPartsError> {
        if self.phase < first {
            return Err(WebPartsError::TooEarly {
                operation,
                phase: first.name(),
            });
        }
        Ok(())
    }

    /// Structural edits run between init complete and connection activation.
    fn ensure_editable(&self, operation: &'static str) -> Result<(), WebPartsError> {
        self.ensure_reached(operation, LifecyclePhase::InitComplete)?;
        self.ensure_not_past(operation, LifecyclePhase::InitComplete)
    }

    fn before(&mut self, event: &ManagerEvent, cascade: bool) -> bool {
        let decision = self.hooks.before(event, HookContext { cascade });
        cascade || decision == HookDecision::Proceed
    }

    fn after(&mut self, event: ManagerEvent) {
        self.hooks.after(&event);
    }

    fn mark_changed(&mut self) {
        self.root.has_data_changed = true;
    }

    fn load_dynamic_connections(&mut self) -> Result<(), WebPartsError> {
        for scope in [PersonalizationScope::Shared, PersonalizationScope::User] {
            let decoded = self.root.dynamic_connections(scope);
            if decoded.malformed {
                self.mark_changed();
            }
            for entry in decoded.items {
                let transformer = match &entry.transformer {
                    Some(name) => match self.services.transformers.create(name) {
                        Some(mut transformer) => {
                            transformer.load_configuration(entry.configuration.as_ref());
                            Some(transformer)
                        }
                        None => {
                            warn!(
                                connection = %entry.id,
                                transformer = %name,
                                "dropping connection with unavailable transformer"
                            );
                            self.mark_changed();
                            continue;
                        }
                    },
                    None => None,
                };
                let mut connection = WebPartConnection::dynamic(
                    entry.id,
                    entry.provider,
                    entry.provider_point,
                    entry.consumer,
                    entry.consumer_point,
                    scope.is_shared(),
                );
                connection.set_transformer(transformer);
                self.dynamic_connections.push(connection)?;
            }
        }
        Ok(())
    }

    fn load_deleted_connections(&mut self) {
        for scope in [PersonalizationScope::Shared, PersonalizationScope::User] {
            let decoded = self.root.deleted_connections(scope);
            let mut stale = decoded.malformed;
            for id in decoded.items {
                if let Some(connection) = self.static_connections.get_mut(&id) {
                    connection.mark_deleted(scope);
                } else if let Some(connection) = self.dynamic_connections.get_mut(&id) {
                    connection.mark_deleted(scope);
                } else {
                    debug!(connection = %id, "deleted connection no longer exists");
                    stale = true;
                }
            }
            if stale {
                self.mark_changed();
            }
        }
    }

    fn load_dynamic_parts(&mut self) {
        for scope in [PersonalizationScope::Shared, PersonalizationScope::User] {
            let decoded = self.root.dynamic_parts(scope);
            if decoded.malformed {
                self.mark_changed();
            }
            for entry in decoded.items {
                if self.parts.contains_key(&entry.id) {
                    debug!(part = %entry.id, "dynamic web part id already in use");
                    self.mark_changed();
                    continue;
                }
                let is_shared = scope.is_shared();
                let part_type = entry.part_type();
                let request = AuthorizationRequest {
                    part_type: part_type.clone(),
                    part_id: entry.id.clone(),
                    is_shared,
                };
                let id = entry.id.clone();
                let slot = if !self.hooks.authorize(&request) {
                    debug!(part = %id, %part_type, "dynamic web part is not authorized");
                    let placeholder =
                        PlaceholderPart::new(id.clone(), PlaceholderKind::Unauthorized, part_type);
                    PartSlot::new_dynamic(Box::new(placeholder), entry, is_shared)
                        .with_placeholder(PlaceholderKind::Unauthorized)
                } else {
                    match self.services.catalog.create(&part_type, &id) {
                        Some(part) => PartSlot::new_dynamic(part, entry, is_shared),
                        None => {
                            warn!(part = %id, %part_type, "dynamic web part could not be created");
                            let placeholder =
                                PlaceholderPart::new(id.clone(), PlaceholderKind::Error, part_type);
                            PartSlot::new_dynamic(Box::new(placeholder), entry, is_shared)
                                .with_placeholder(PlaceholderKind::Error)
                        }
                    }
                };
                self.parts.insert(id, slot);
            }
        }
    }

    fn load_part_states(&mut self) {
        for scope in [PersonalizationScope::Shared, PersonalizationScope::User] {
            let decoded = self.root.part_states(scope);
            let mut stale = decoded.malformed;
            for state in decoded.items {
                let Some(slot) = self.parts.get_mut(&state.id) else {
                    debug!(part = %state.id, "stored zone placement for a missing web part");
                    stale = true;
                    continue;
                };
                slot.zone_id = (!state.zone.is_empty()).then_some(state.zone);
                slot.zone_index = state.index;
                slot.is_closed = state.closed;
            }
            if stale {
                self.mark_changed();
            }
        }
    }

    fn apply_parts(&mut self) -> Result<(), WebPartsError> {
        let scope = self.personalization.scope();
        for (id, slot) in &mut self.parts {
            if slot.placeholder.is_some() {
                continue;
            }
            let options = ApplyOptions::part(extraction_scope(scope, slot.is_shared));
            let flags = self
                .personalization
                .apply_part(slot.part.as_mut(), id, options)?;
            slot.flags.merge(flags);
        }
        Ok(())
    }

    fn close_orphans(&mut self) -> Result<(), WebPartsError> {
        let orphans: Vec<SmolStr> = self
            .parts
            .iter()
            .filter(|(_, slot)| {
                !slot.is_closed
                    && slot
                        .zone_id
                        .as_ref()
                        .is_none_or(|zone| !self.zones.contains_key(zone))
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in orphans {
            debug!(part = %id, "closing web part without a zone");
            self.close_part_internal(&id, true)?;
        }
        Ok(())
    }

    /// Custom entries describing the page structure for the current scope.
    fn custom_state(&self) -> PersonalizationDictionary {
        let scope = self.personalization.scope();
        let mut writer = StateWriter::new(scope);

        let states: Vec<PartState> = self
            .parts
            .iter()
            .filter(|(_, slot)| scope.is_user() || slot.is_shared)
            .map(|(id, slot)| PartState {
                id: id.clone(),
                zone: slot.zone_id.clone().unwrap_or_default(),
                index: slot.zone_index,
                closed: slot.is_closed,
            })
            .collect();
        writer.part_states(&states);

        writer.dynamic_parts(
            self.parts
                .values()
                .filter(|slot| slot.is_shared == scope.is_shared())
                .filter_map(|slot| slot.entry.as_ref()),
        );

        let deleted: Vec<SmolStr> = self
            .static_connections
            .iter()
            .chain(self.dynamic_connections.iter())
            .filter(|connection| connection.deleted_in() == Some(scope))
            .filter(|connection| {
                connection.is_static() || (scope.is_user() && connection.is_shared())
            })
            .map(|connection| SmolStr::new(connection.id()))
            .collect();
        writer.deleted_connections(&deleted);

        let dynamic: Vec<ConnectionEntry> = self
            .dynamic_connections
            .iter()
            .filter(|connection| !connection.is_deleted())
            .filter(|connection| connection.is_shared() == scope.is_shared())
            .map(|connection| ConnectionEntry {
                id: connection.id().into(),
                consumer: connection.consumer_id().into(),
                consumer_point: connection.consumer_point_id().into(),
                provider: connection.provider_id().into(),
                provider_point: connection.provider_point_id().into(),
                transformer: connection.transformer().map(|t| SmolStr::new(t.name())),
                configuration: connection.transformer().and_then(|t| t.save_configuration()),
            })
            .collect();
        writer.dynamic_connections(&dynamic);

        writer.finish()
    }
}

/// Scope under which a part's properties are applied and extracted.
///
/// A part the current user added owns all its properties, so shared-scoped
/// values are personalized too.
fn extraction_scope(scope: PersonalizationScope, part_is_shared: bool) -> PersonalizationScope {
    if scope.is_user() && !part_is_shared {
        PersonalizationScope::Shared
    } else {
        scope
    }
}

fn random_id(prefix: &str) -> SmolStr {
    format!("{prefix}{}", rand::random::<u32>()).into()
}
