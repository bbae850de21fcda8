//! Harness for driving page request lifecycles.

#![allow(missing_docs)]

use std::sync::Arc;

use smol_str::SmolStr;

use crate::config::PersonalizationConfig;
use crate::connection::TransformerRegistry;
use crate::error::WebPartsError;
use crate::manager::{ManagerServices, PartCatalog, WebPartManager};
use crate::metadata::PropertyMetadataCache;
use crate::personalization::{Personalization, SaveOutcome};
use crate::request::RequestContext;
use crate::store::MemoryStore;

const DEFAULT_MANAGER_ID: &str = "WebPartManager1";

/// Result of one simulated request.
#[derive(Debug)]
pub struct PageRun {
    pub manager: WebPartManager,
    pub saved: SaveOutcome,
}

/// Runs requests for one page against a shared in-memory store.
pub struct PageHarness {
    config: PersonalizationConfig,
    store: MemoryStore,
    metadata: Arc<PropertyMetadataCache>,
    services: ManagerServices,
    manager_id: SmolStr,
}

impl PageHarness {
    /// Creates a harness; transformers are limited by the config's allow list.
    #[must_use]
    pub fn new(config: PersonalizationConfig, catalog: Arc<dyn PartCatalog>) -> Self {
        let services = ManagerServices::new(catalog)
            .with_transformers(TransformerRegistry::from_allowed(&config.allowed_transformers));
        Self {
            config,
            store: MemoryStore::new(),
            metadata: Arc::new(PropertyMetadataCache::new()),
            services,
            manager_id: SmolStr::new_inline(DEFAULT_MANAGER_ID),
        }
    }

    /// The store every request of this harness reads and writes.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    #[must_use]
    pub fn services(&self) -> &ManagerServices {
        &self.services
    }

    #[must_use]
    pub fn config(&self) -> &PersonalizationConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PersonalizationConfig {
        &mut self.config
    }

    /// A fresh manager for `request`, before any lifecycle step.
    #[must_use]
    pub fn manager(&self, request: RequestContext) -> WebPartManager {
        let personalization = Personalization::new(
            &self.config,
            request,
            Arc::new(self.store.clone()),
            Arc::clone(&self.metadata),
        );
        WebPartManager::new(self.manager_id.clone(), personalization, self.services.clone())
    }

    /// Runs a full lifecycle: `page` declares structure, `actions` runs between
    /// init complete and load complete.
    pub fn run<P, A>(
        &self,
        request: RequestContext,
        page: P,
        actions: A,
    ) -> Result<PageRun, WebPartsError>
    where
        P: FnOnce(&mut WebPartManager) -> Result<(), WebPartsError>,
        A: FnOnce(&mut WebPartManager) -> Result<(), WebPartsError>,
    {
        let mut manager = self.manager(request);
        page(&mut manager)?;
        manager.on_init()?;
        manager.on_init_complete()?;
        actions(&mut manager)?;
        manager.on_load_complete()?;
        let saved = manager.on_save_state_complete()?;
        Ok(PageRun { manager, saved })
    }

    pub fn get<P>(&self, path: &str, user: Option<&str>, page: P) -> Result<PageRun, WebPartsError>
    where
        P: FnOnce(&mut WebPartManager) -> Result<(), WebPartsError>,
    {
        self.run(with_user(RequestContext::get(path), user), page, |_| Ok(()))
    }

    pub fn post<P, A>(
        &self,
        path: &str,
        user: Option<&str>,
        page: P,
        actions: A,
    ) -> Result<PageRun, WebPartsError>
    where
        P: FnOnce(&mut WebPartManager) -> Result<(), WebPartsError>,
        A: FnOnce(&mut WebPartManager) -> Result<(), WebPartsError>,
    {
        self.run(with_user(RequestContext::post(path), user), page, actions)
    }
}

fn with_user(request: RequestContext, user: Option<&str>) -> RequestContext {
    match user {
        Some(user) => request.with_user(user),
        None => request,
    }
}
