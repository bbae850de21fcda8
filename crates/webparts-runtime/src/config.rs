//! Personalization configuration loading.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use smol_str::SmolStr;
use webparts_core::PersonalizationScope;

use crate::error::WebPartsError;
use crate::store::{FileStore, MemoryStore, PersonalizationStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalizationConfig {
    pub enabled: bool,
    pub initial_scope: PersonalizationScope,
    pub can_enter_shared_scope: bool,
    pub store: StoreConfig,
    /// Transformer names connections may use. Empty allows every registered one.
    pub allowed_transformers: Vec<SmolStr>,
    pub log_level: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    File { root: PathBuf },
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_scope: PersonalizationScope::User,
            can_enter_shared_scope: false,
            store: StoreConfig::Memory,
            allowed_transformers: Vec::new(),
            log_level: SmolStr::new_inline("info"),
        }
    }
}

impl PersonalizationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WebPartsError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            WebPartsError::InvalidConfig(format!("personalization.toml: {err}").into())
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, WebPartsError> {
        let raw: PersonalizationToml = toml::from_str(text).map_err(|err| {
            WebPartsError::InvalidConfig(format!("personalization.toml: {err}").into())
        })?;
        raw.into_config()
    }

    /// Opens the configured store.
    #[must_use]
    pub fn open_store(&self) -> Arc<dyn PersonalizationStore> {
        match &self.store {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::File { root } => Arc::new(FileStore::new(root.clone())),
        }
    }
}

fn parse_scope(text: &str) -> Result<PersonalizationScope, WebPartsError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "user" => Ok(PersonalizationScope::User),
        "shared" => Ok(PersonalizationScope::Shared),
        _ => Err(WebPartsError::InvalidConfig(
            format!("invalid personalization.initial_scope '{text}'").into(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct PersonalizationToml {
    personalization: Option<PersonalizationSection>,
    store: Option<StoreSection>,
    transformers: Option<TransformersSection>,
    log: Option<LogSection>,
}

#[derive(Debug, Deserialize)]
struct PersonalizationSection {
    enabled: Option<bool>,
    initial_scope: Option<String>,
    can_enter_shared_scope: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    kind: String,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransformersSection {
    allowed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    level: String,
}

impl PersonalizationToml {
    fn into_config(self) -> Result<PersonalizationConfig, WebPartsError> {
        let defaults = PersonalizationConfig::default();
        let section = self.personalization.unwrap_or(PersonalizationSection {
            enabled: None,
            initial_scope: None,
            can_enter_shared_scope: None,
        });
        let initial_scope = match section.initial_scope.as_deref() {
            Some(text) => parse_scope(text)?,
            None => defaults.initial_scope,
        };

        let store = match self.store {
            None => StoreConfig::Memory,
            Some(store) => match store.kind.trim().to_ascii_lowercase().as_str() {
                "memory" => StoreConfig::Memory,
                "file" => {
                    let Some(path) = store.path.filter(|path| !path.trim().is_empty()) else {
                        return Err(WebPartsError::InvalidConfig(
                            "store.path required when kind=file".into(),
                        ));
                    };
                    StoreConfig::File {
                        root: PathBuf::from(path),
                    }
                }
                _ => {
                    return Err(WebPartsError::InvalidConfig(
                        format!("invalid store.kind '{}'", store.kind).into(),
                    ))
                }
            },
        };

        let mut allowed_transformers = Vec::new();
        for name in self.transformers.map(|t| t.allowed).unwrap_or_default() {
            let name = name.trim();
            if name.is_empty() {
                return Err(WebPartsError::InvalidConfig(
                    "transformers.allowed entries must not be empty".into(),
                ));
            }
            allowed_transformers.push(SmolStr::new(name));
        }

        let log_level = match self.log {
            Some(log) => {
                if log.level.trim().parse::<tracing::Level>().is_err() {
                    return Err(WebPartsError::InvalidConfig(
                        format!("invalid log.level '{}'", log.level).into(),
                    ));
                }
                SmolStr::new(log.level.trim())
            }
            None => defaults.log_level,
        };

        Ok(PersonalizationConfig {
            enabled: section.enabled.unwrap_or(defaults.enabled),
            initial_scope,
            can_enter_shared_scope: section
                .can_enter_shared_scope
                .unwrap_or(defaults.can_enter_shared_scope),
            store,
            allowed_transformers,
            log_level,
        })
    }
}
