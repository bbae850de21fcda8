//! Transformers adapt a provider interface to a different consumer interface.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::debug;
use webparts_core::{InterfaceType, PropertyValue};

/// Interface of a provider exposing a whole row of named fields.
pub const ROW_INTERFACE: &str = "IWebPartRow";
/// Interface of a consumer taking a single field value.
pub const FIELD_INTERFACE: &str = "IWebPartField";
/// Registered name of [`RowToFieldTransformer`].
pub const ROW_TO_FIELD_TRANSFORMER: &str = "row-to-field";

pub trait Transformer: fmt::Debug + Send {
    /// Registered name; persisted with dynamic connections.
    fn name(&self) -> &str;

    /// Interface the transformer consumes from the provider.
    fn consumer_interface(&self) -> InterfaceType;

    /// Interface the transformer provides to the consumer.
    fn provider_interface(&self) -> InterfaceType;

    fn transform(&self, value: Option<PropertyValue>) -> Option<PropertyValue>;

    fn save_configuration(&self) -> Option<PropertyValue> {
        None
    }

    fn load_configuration(&mut self, _configuration: Option<&PropertyValue>) {}
}

pub type TransformerFactory = Arc<dyn Fn() -> Box<dyn Transformer> + Send + Sync>;

/// Picks one named field out of a provided row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowToFieldTransformer {
    field: Option<SmolStr>,
}

impl RowToFieldTransformer {
    #[must_use]
    pub fn new(field: impl Into<SmolStr>) -> Self {
        Self {
            field: Some(field.into()),
        }
    }

    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl Transformer for RowToFieldTransformer {
    fn name(&self) -> &str {
        ROW_TO_FIELD_TRANSFORMER
    }

    fn consumer_interface(&self) -> InterfaceType {
        InterfaceType::new(ROW_INTERFACE)
    }

    fn provider_interface(&self) -> InterfaceType {
        InterfaceType::new(FIELD_INTERFACE)
    }

    fn transform(&self, value: Option<PropertyValue>) -> Option<PropertyValue> {
        let field = self.field.as_ref()?;
        match value? {
            PropertyValue::Composite(row) => row.fields.get(field).cloned(),
            other => {
                debug!(field = %field, kind = other.kind(), "row-to-field expects a composite row");
                None
            }
        }
    }

    fn save_configuration(&self) -> Option<PropertyValue> {
        self.field.clone().map(PropertyValue::String)
    }

    fn load_configuration(&mut self, configuration: Option<&PropertyValue>) {
        self.field = configuration.and_then(PropertyValue::as_str).map(SmolStr::new);
    }
}

/// Known transformer types and the subset the site allows.
#[derive(Clone)]
pub struct TransformerRegistry {
    factories: IndexMap<SmolStr, TransformerFactory>,
    allowed: Option<FxHashSet<SmolStr>>,
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("registered", &self.factories.keys().collect::<Vec<_>>())
            .field("allowed", &self.allowed)
            .finish()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformerRegistry {
    /// Empty registry with no transformers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: IndexMap::new(),
            allowed: None,
        }
    }

    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(
            ROW_TO_FIELD_TRANSFORMER,
            Arc::new(|| Box::new(RowToFieldTransformer::default()) as Box<dyn Transformer>),
        );
        registry
    }

    /// Built-ins restricted to `allowed`; an empty list allows everything registered.
    #[must_use]
    pub fn from_allowed(allowed: &[SmolStr]) -> Self {
        let mut registry = Self::with_builtins();
        registry.set_allowed(allowed);
        registry
    }

    pub fn register(&mut self, name: impl Into<SmolStr>, factory: TransformerFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn set_allowed(&mut self, allowed: &[SmolStr]) {
        self.allowed = (!allowed.is_empty()).then(|| allowed.iter().cloned().collect());
    }

    #[must_use]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.factories.contains_key(name)
            && self
                .allowed
                .as_ref()
                .is_none_or(|allowed| allowed.contains(name))
    }

    /// Fresh instance of an allowed transformer.
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Box<dyn Transformer>> {
        if !self.is_allowed(name) {
            return None;
        }
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories
            .keys()
            .map(SmolStr::as_str)
            .filter(|name| self.is_allowed(name))
    }
}
