//! Provider and consumer connection point descriptors.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use crate::part::PartType;

/// Interface exchanged over a connection. Compared by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceType(SmolStr);

impl InterfaceType {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPointKind {
    Provider,
    Consumer,
}

/// A declared provider or consumer point of a part type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPoint {
    pub kind: ConnectionPointKind,
    pub id: SmolStr,
    pub display_name: SmolStr,
    pub interface: InterfaceType,
    pub allows_multiple: bool,
    /// Part type that declared the point.
    pub owner: PartType,
}

impl ConnectionPoint {
    /// Provider point; providers allow multiple connections unless told otherwise.
    #[must_use]
    pub fn provider(
        owner: &PartType,
        id: impl Into<SmolStr>,
        display_name: impl Into<SmolStr>,
        interface: InterfaceType,
    ) -> Self {
        Self {
            kind: ConnectionPointKind::Provider,
            id: id.into(),
            display_name: display_name.into(),
            interface,
            allows_multiple: true,
            owner: owner.clone(),
        }
    }

    /// Consumer point; consumers take a single connection unless told otherwise.
    #[must_use]
    pub fn consumer(
        owner: &PartType,
        id: impl Into<SmolStr>,
        display_name: impl Into<SmolStr>,
        interface: InterfaceType,
    ) -> Self {
        Self {
            kind: ConnectionPointKind::Consumer,
            id: id.into(),
            display_name: display_name.into(),
            interface,
            allows_multiple: false,
            owner: owner.clone(),
        }
    }

    #[must_use]
    pub fn allowing_multiple(mut self, allows_multiple: bool) -> Self {
        self.allows_multiple = allows_multiple;
        self
    }

    #[must_use]
    pub fn has_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

/// All points declared by one part type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPointSet {
    owner: PartType,
    providers: Vec<ConnectionPoint>,
    consumers: Vec<ConnectionPoint>,
}

impl ConnectionPointSet {
    #[must_use]
    pub fn new(owner: PartType) -> Self {
        Self {
            owner,
            providers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Adds a point, routing it by kind.
    #[must_use]
    pub fn with(mut self, point: ConnectionPoint) -> Self {
        self.push(point);
        self
    }

    pub fn push(&mut self, point: ConnectionPoint) {
        match point.kind {
            ConnectionPointKind::Provider => self.providers.push(point),
            ConnectionPointKind::Consumer => self.consumers.push(point),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &PartType {
        &self.owner
    }

    #[must_use]
    pub fn providers(&self) -> &[ConnectionPoint] {
        &self.providers
    }

    #[must_use]
    pub fn consumers(&self) -> &[ConnectionPoint] {
        &self.consumers
    }

    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&ConnectionPoint> {
        self.providers.iter().find(|point| point.has_id(id))
    }

    #[must_use]
    pub fn consumer(&self, id: &str) -> Option<&ConnectionPoint> {
        self.consumers.iter().find(|point| point.has_id(id))
    }

    #[must_use]
    pub fn point(&self, kind: ConnectionPointKind, id: &str) -> Option<&ConnectionPoint> {
        match kind {
            ConnectionPointKind::Provider => self.provider(id),
            ConnectionPointKind::Consumer => self.consumer(id),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.consumers.is_empty()
    }
}
