//! Connections between provider and consumer web parts.

#![allow(missing_docs)]

mod activation;
mod points;
mod transformer;

use std::fmt;

use smol_str::SmolStr;
use webparts_core::PersonalizationScope;

use crate::error::WebPartsError;

pub(crate) use activation::{resolve_conflicts, ActivationCandidate};
pub use activation::{ActivationConflict, ActivationPlan};
pub use points::ConnectionPointCache;
pub use transformer::{
    RowToFieldTransformer, Transformer, TransformerFactory, TransformerRegistry, FIELD_INTERFACE,
    ROW_INTERFACE, ROW_TO_FIELD_TRANSFORMER,
};

/// A typed data link from a provider point to a consumer point.
pub struct WebPartConnection {
    id: SmolStr,
    provider_id: SmolStr,
    provider_point_id: SmolStr,
    consumer_id: SmolStr,
    consumer_point_id: SmolStr,
    transformer: Option<Box<dyn Transformer>>,
    is_shared: bool,
    is_static: bool,
    /// Scope whose personalization tombstoned this connection.
    deleted_in: Option<PersonalizationScope>,
    is_active: bool,
}

impl fmt::Debug for WebPartConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebPartConnection")
            .field("id", &self.id)
            .field("provider", &self.provider_id)
            .field("provider_point", &self.provider_point_id)
            .field("consumer", &self.consumer_id)
            .field("consumer_point", &self.consumer_point_id)
            .field("transformer", &self.transformer.as_ref().map(|t| t.name().to_string()))
            .field("is_shared", &self.is_shared)
            .field("is_static", &self.is_static)
            .field("deleted_in", &self.deleted_in)
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl WebPartConnection {
    /// A page-declared connection. Static connections are always shared.
    #[must_use]
    pub fn new(
        id: impl Into<SmolStr>,
        provider_id: impl Into<SmolStr>,
        provider_point_id: impl Into<SmolStr>,
        consumer_id: impl Into<SmolStr>,
        consumer_point_id: impl Into<SmolStr>,
    ) -> Self {
        Self {
            id: id.into(),
            provider_id: provider_id.into(),
            provider_point_id: provider_point_id.into(),
            consumer_id: consumer_id.into(),
            consumer_point_id: consumer_point_id.into(),
            transformer: None,
            is_shared: true,
            is_static: true,
            deleted_in: None,
            is_active: false,
        }
    }

    pub(crate) fn dynamic(
        id: SmolStr,
        provider_id: SmolStr,
        provider_point_id: SmolStr,
        consumer_id: SmolStr,
        consumer_point_id: SmolStr,
        is_shared: bool,
    ) -> Self {
        Self {
            is_shared,
            is_static: false,
            ..Self::new(id, provider_id, provider_point_id, consumer_id, consumer_point_id)
        }
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub(crate) fn set_transformer(&mut self, transformer: Option<Box<dyn Transformer>>) {
        self.transformer = transformer;
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    #[must_use]
    pub fn provider_point_id(&self) -> &str {
        &self.provider_point_id
    }

    #[must_use]
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    #[must_use]
    pub fn consumer_point_id(&self) -> &str {
        &self.consumer_point_id
    }

    #[must_use]
    pub fn transformer(&self) -> Option<&dyn Transformer> {
        self.transformer.as_deref()
    }

    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Tombstoned: kept so the deletion can be persisted, never activated.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_in.is_some()
    }

    #[must_use]
    pub fn deleted_in(&self) -> Option<PersonalizationScope> {
        self.deleted_in
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub(crate) fn mark_deleted(&mut self, scope: PersonalizationScope) {
        self.deleted_in = Some(scope);
        self.is_active = false;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// True when either end is the given part.
    #[must_use]
    pub fn involves(&self, part_id: &str) -> bool {
        self.provider_id == part_id || self.consumer_id == part_id
    }

    #[must_use]
    pub fn uses_provider_point(&self, part_id: &str, point_id: &str) -> bool {
        self.provider_id == part_id && self.provider_point_id.eq_ignore_ascii_case(point_id)
    }

    #[must_use]
    pub fn uses_consumer_point(&self, part_id: &str, point_id: &str) -> bool {
        self.consumer_id == part_id && self.consumer_point_id.eq_ignore_ascii_case(point_id)
    }
}

/// Ordered connection list that can be frozen once connections are activated.
#[derive(Debug)]
pub struct ConnectionCollection {
    label: &'static str,
    items: Vec<WebPartConnection>,
    read_only: bool,
}

impl ConnectionCollection {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            items: Vec::new(),
            read_only: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WebPartConnection> {
        self.items.iter()
    }

    /// Case-insensitive lookup by connection id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WebPartConnection> {
        self.items
            .iter()
            .find(|connection| connection.id.eq_ignore_ascii_case(id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut WebPartConnection> {
        self.items
            .iter_mut()
            .find(|connection| connection.id.eq_ignore_ascii_case(id))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn push(&mut self, connection: WebPartConnection) -> Result<(), WebPartsError> {
        self.check_writable()?;
        self.items.push(connection);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Option<WebPartConnection>, WebPartsError> {
        self.check_writable()?;
        let Some(index) = self
            .items
            .iter()
            .position(|connection| connection.id.eq_ignore_ascii_case(id))
        else {
            return Ok(None);
        };
        Ok(Some(self.items.remove(index)))
    }

    pub(crate) fn set_read_only(&mut self) {
        self.read_only = true;
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn check_writable(&self) -> Result<(), WebPartsError> {
        if self.read_only {
            return Err(WebPartsError::ConnectionsReadOnly(self.label));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ConnectionCollection {
    type Item = &'a WebPartConnection;
    type IntoIter = std::slice::Iter<'a, WebPartConnection>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_collection_rejects_edits() {
        let mut connections = ConnectionCollection::new("static");
        connections
            .push(WebPartConnection::new("c1", "a", "out", "b", "in"))
            .unwrap();
        connections.set_read_only();

        let err = connections
            .push(WebPartConnection::new("c2", "a", "out", "c", "in"))
            .unwrap_err();
        assert_eq!(err, WebPartsError::ConnectionsReadOnly("static"));
        assert!(connections.remove("c1").is_err());
        assert!(connections.get("C1").is_some());
    }

    #[test]
    fn point_matching_ignores_point_case() {
        let connection = WebPartConnection::new("c1", "a", "Out", "b", "in");
        assert!(connection.uses_provider_point("a", "out"));
        assert!(!connection.uses_provider_point("A", "out"));
        assert!(connection.uses_consumer_point("b", "IN"));
        assert!(connection.involves("b"));
        assert!(connection.is_static() && connection.is_shared());
    }
}
