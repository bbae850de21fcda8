//! Per-request personalization service.
//!
//! Owns the state engine for one request and decides, from configuration
//! and the request, whether personalization is enabled, which scope applies
//! and whether the current visitor may change anything.

#![allow(missing_docs)]

use std::sync::Arc;

use tracing::debug;
use webparts_core::{Part, PersonalizationScope};

use crate::config::PersonalizationConfig;
use crate::error::WebPartsError;
use crate::metadata::PropertyMetadataCache;
use crate::request::RequestContext;
use crate::state::{ApplyOptions, ExtractOptions, PersonalizationFlags, PersonalizationState};
use crate::store::PersonalizationStore;

/// What [`Personalization::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed, or the visitor may not modify personalization.
    Skipped,
    Saved { bytes: usize },
    /// The extracted state was empty and the stored blob was removed.
    Reset,
}

pub struct Personalization {
    enabled: bool,
    scope: PersonalizationScope,
    can_enter_shared_scope: bool,
    request: RequestContext,
    store: Arc<dyn PersonalizationStore>,
    state: PersonalizationState,
}

impl std::fmt::Debug for Personalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Personalization")
            .field("enabled", &self.enabled)
            .field("scope", &self.scope)
            .field("can_enter_shared_scope", &self.can_enter_shared_scope)
            .field("path", &self.request.path)
            .field("loaded", &self.state.is_loaded())
            .finish_non_exhaustive()
    }
}

impl Personalization {
    /// A shared initial scope is only honoured when shared scope may be entered.
    #[must_use]
    pub fn new(
        config: &PersonalizationConfig,
        request: RequestContext,
        store: Arc<dyn PersonalizationStore>,
        metadata: Arc<PropertyMetadataCache>,
    ) -> Self {
        let scope = if config.initial_scope.is_shared() && config.can_enter_shared_scope {
            PersonalizationScope::Shared
        } else {
            PersonalizationScope::User
        };
        let state = PersonalizationState::new(scope, request.is_post(), metadata);
        Self {
            enabled: config.enabled,
            scope,
            can_enter_shared_scope: config.can_enter_shared_scope,
            request,
            store,
            state,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn scope(&self) -> PersonalizationScope {
        self.scope
    }

    #[must_use]
    pub fn can_enter_shared_scope(&self) -> bool {
        self.can_enter_shared_scope
    }

    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Whether the current visitor may change personalization in the current scope.
    #[must_use]
    pub fn is_modifiable(&self) -> bool {
        self.enabled
            && match self.scope {
                PersonalizationScope::Shared => self.can_enter_shared_scope,
                PersonalizationScope::User => self.request.is_authenticated(),
            }
    }

    pub fn ensure_enabled(&self, ensure_modifiable: bool) -> Result<(), WebPartsError> {
        if !self.enabled {
            return Err(WebPartsError::PersonalizationDisabled);
        }
        if ensure_modifiable && !self.is_modifiable() {
            return Err(WebPartsError::NotModifiable(self.scope));
        }
        Ok(())
    }

    /// Fetches the shared blob and, in user scope, the visitor's raw blob.
    pub fn load(&mut self) -> Result<(), WebPartsError> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.request.path.clone();
        let shared = self.store.load_blob(&path, None)?;
        let user = match (&self.scope, &self.request.user) {
            (PersonalizationScope::User, Some(user)) if self.request.is_authenticated() => {
                self.store.load_blob(&path, Some(user))?
            }
            _ => None,
        };
        debug!(
            path = %path,
            scope = %self.scope,
            shared_len = shared.as_ref().map_or(0, Vec::len),
            user_len = user.as_ref().map_or(0, Vec::len),
            "loading personalization"
        );
        self.state.load_data_blobs(shared.as_deref(), user)
    }

    pub fn apply_part(
        &mut self,
        part: &mut dyn Part,
        id: &str,
        options: ApplyOptions,
    ) -> Result<PersonalizationFlags, WebPartsError> {
        if !self.enabled {
            return Ok(PersonalizationFlags::default());
        }
        self.state.apply(part, id, options)
    }

    pub fn extract_part(
        &mut self,
        part: &mut dyn Part,
        id: &str,
        options: ExtractOptions,
    ) -> Result<PersonalizationFlags, WebPartsError> {
        if !self.enabled {
            return Ok(PersonalizationFlags::default());
        }
        self.state.extract(part, id, options)
    }

    pub fn round_trip(&mut self, id: &str) -> Result<(), WebPartsError> {
        if !self.enabled {
            return Ok(());
        }
        self.state.round_trip(id)
    }

    pub fn copy_personalization_state(
        &self,
        source: &mut dyn Part,
        target: &mut dyn Part,
    ) -> Result<(), WebPartsError> {
        if !self.enabled {
            return Ok(());
        }
        self.state.copy_personalization_state(source, target)
    }

    /// Part-initiated dirty mark; ignored while the engine writes into the part.
    pub fn set_part_dirty(&mut self, id: &str) -> bool {
        self.enabled && self.state.set_part_dirty(id)
    }

    pub fn force_part_dirty(&mut self, id: &str) {
        if self.enabled {
            self.state.force_part_dirty(id);
        }
    }

    pub fn set_dirty(&mut self) {
        self.state.set_dirty();
    }

    #[must_use]
    pub fn state(&self) -> &PersonalizationState {
        &self.state
    }

    /// Persists the extracted state when something changed.
    pub fn save(&mut self) -> Result<SaveOutcome, WebPartsError> {
        if !self.is_modifiable() || !self.state.is_dirty() {
            return Ok(SaveOutcome::Skipped);
        }
        let path = self.request.path.clone();
        let user = match self.scope {
            PersonalizationScope::User => self.request.user.clone(),
            PersonalizationScope::Shared => None,
        };
        match self.state.save_data_blob() {
            Some(blob) => {
                self.store.save_blob(&path, user.as_deref(), &blob)?;
                debug!(
                    path = %path,
                    scope = %self.scope,
                    bytes = blob.len(),
                    "saved personalization"
                );
                Ok(SaveOutcome::Saved { bytes: blob.len() })
            }
            None => {
                self.store.reset_blob(&path, user.as_deref())?;
                debug!(path = %path, scope = %self.scope, "reset personalization");
                Ok(SaveOutcome::Reset)
            }
        }
    }
}
