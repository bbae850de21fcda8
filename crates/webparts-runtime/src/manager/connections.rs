//! Connection operations and per-request activation.

#![allow(missing_docs)]

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::{debug, warn};
use webparts_core::{ConnectionPoint, ConnectionPointKind, PropertyValue};

use super::{random_id, LifecyclePhase, ManagerEvent, PartSlot, WebPartManager};
use crate::connection::{
    resolve_conflicts, ActivationCandidate, ConnectionCollection, Transformer, TransformerRegistry,
    WebPartConnection,
};
use crate::error::WebPartsError;

/// Raw values posted by a connection form.
///
/// Read straight from the submission so that a choice another request made
/// invalid ends as a rejection rather than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSubmission {
    pub provider: SmolStr,
    pub provider_point: SmolStr,
    pub consumer: SmolStr,
    pub consumer_point: SmolStr,
    pub transformer: Option<SmolStr>,
    pub transformer_configuration: Option<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(SmolStr),
    Cancelled,
    /// Message to show next to the connection form.
    Rejected(SmolStr),
}

impl WebPartManager {
    #[must_use]
    pub fn static_connections(&self) -> &ConnectionCollection {
        &self.static_connections
    }

    #[must_use]
    pub fn dynamic_connections(&self) -> &ConnectionCollection {
        &self.dynamic_connections
    }

    /// Static or dynamic connection by id, including tombstones.
    #[must_use]
    pub fn connection(&self, id: &str) -> Option<&WebPartConnection> {
        self.static_connections
            .get(id)
            .or_else(|| self.dynamic_connections.get(id))
    }

    /// Connections that are not tombstoned, static first.
    pub fn connections(&self) -> impl Iterator<Item = &WebPartConnection> {
        self.static_connections
            .iter()
            .chain(self.dynamic_connections.iter())
            .filter(|connection| !connection.is_deleted())
    }

    #[must_use]
    pub fn connection_for_consumer(
        &self,
        consumer: &str,
        point: &str,
    ) -> Option<&WebPartConnection> {
        self.connections()
            .find(|connection| connection.uses_consumer_point(consumer, point))
    }

    /// First live connection on a provider point.
    #[must_use]
    pub fn connection_for_provider(
        &self,
        provider: &str,
        point: &str,
    ) -> Option<&WebPartConnection> {
        self.connections()
            .find(|connection| connection.uses_provider_point(provider, point))
    }

    pub fn enabled_provider_points(
        &self,
        part_id: &str,
    ) -> Result<Vec<ConnectionPoint>, WebPartsError> {
        self.enabled_points(part_id, ConnectionPointKind::Provider)
    }

    pub fn enabled_consumer_points(
        &self,
        part_id: &str,
    ) -> Result<Vec<ConnectionPoint>, WebPartsError> {
        self.enabled_points(part_id, ConnectionPointKind::Consumer)
    }

    fn enabled_points(
        &self,
        part_id: &str,
        kind: ConnectionPointKind,
    ) -> Result<Vec<ConnectionPoint>, WebPartsError> {
        let slot = self.slot(part_id)?;
        let points = self.services.points.points_for(slot.part(), self.culture());
        let declared = match kind {
            ConnectionPointKind::Provider => points.providers(),
            ConnectionPointKind::Consumer => points.consumers(),
        };
        Ok(declared
            .iter()
            .filter(|point| slot.part().connection_point_enabled(kind, &point.id))
            .cloned()
            .collect())
    }

    fn culture(&self) -> &str {
        &self.personalization.request().culture
    }

    /// Page-declared connection; ids must be unique.
    pub fn add_static_connection(
        &mut self,
        connection: WebPartConnection,
    ) -> Result<(), WebPartsError> {
        self.ensure_not_past("add static connection", LifecyclePhase::Initialized)?;
        if connection.id().is_empty() {
            return Err(WebPartsError::MissingConnectionId);
        }
        if self.static_connections.contains(connection.id()) {
            return Err(WebPartsError::DuplicateConnectionId(connection.id().into()));
        }
        self.static_connections.push(connection)
    }

    #[must_use]
    pub fn can_connect(
        &self,
        provider: &str,
        provider_point: &str,
        consumer: &str,
        consumer_point: &str,
        transformer: Option<&dyn Transformer>,
    ) -> bool {
        self.check_connect(provider, provider_point, consumer, consumer_point, transformer)
            .is_ok()
    }

    /// Why a connection cannot be made, checked in a fixed order.
    pub fn check_connect(
        &self,
        provider: &str,
        provider_point: &str,
        consumer: &str,
        consumer_point: &str,
        transformer: Option<&dyn Transformer>,
    ) -> Result<(), WebPartsError> {
        self.personalization.ensure_enabled(true)?;
        let provider_slot = self.slot(provider)?;
        let consumer_slot = self.slot(consumer)?;
        let provider_points = self.services.points.points_for(provider_slot.part(), self.culture());
        let consumer_points = self.services.points.points_for(consumer_slot.part(), self.culture());
        let provider_decl = provider_points.provider(provider_point).ok_or_else(|| {
            WebPartsError::InvalidConnectionPoint {
                part: provider.into(),
                point: provider_point.into(),
            }
        })?;
        let consumer_decl = consumer_points.consumer(consumer_point).ok_or_else(|| {
            WebPartsError::InvalidConnectionPoint {
                part: consumer.into(),
                point: consumer_point.into(),
            }
        })?;
        if provider == consumer {
            return Err(WebPartsError::ConnectToSelf(provider.into()));
        }
        for (id, slot) in [(provider, provider_slot), (consumer, consumer_slot)] {
            if slot.is_closed {
                return Err(WebPartsError::PartClosed(id.into()));
            }
        }
        check_enabled(provider, provider_slot, provider_decl)?;
        check_enabled(consumer, consumer_slot, consumer_decl)?;
        if !provider_decl.allows_multiple
            && self
                .connections()
                .any(|connection| connection.uses_provider_point(provider, provider_point))
        {
            return Err(WebPartsError::DuplicateConnection {
                part: provider.into(),
                point: provider_point.into(),
            });
        }
        if !consumer_decl.allows_multiple
            && self
                .connections()
                .any(|connection| connection.uses_consumer_point(consumer, consumer_point))
        {
            return Err(WebPartsError::DuplicateConnection {
                part: consumer.into(),
                point: consumer_point.into(),
            });
        }
        check_compatibility(
            (provider_slot, provider_decl),
            (consumer, consumer_slot, consumer_decl),
            transformer,
            &self.services.transformers,
        )
    }

    /// Adds a dynamic connection. Returns `None` when a hook cancelled.
    pub fn connect(
        &mut self,
        provider: &str,
        provider_point: &str,
        consumer: &str,
        consumer_point: &str,
        transformer: Option<Box<dyn Transformer>>,
    ) -> Result<Option<SmolStr>, WebPartsError> {
        self.ensure_reached("connect", LifecyclePhase::InitComplete)?;
        self.dynamic_connections.check_writable()?;
        self.check_connect(
            provider,
            provider_point,
            consumer,
            consumer_point,
            transformer.as_deref(),
        )?;
        let event = ManagerEvent::Connecting {
            provider: provider.into(),
            provider_point: provider_point.into(),
            consumer: consumer.into(),
            consumer_point: consumer_point.into(),
        };
        if !self.before(&event, false) {
            return Ok(None);
        }
        let id = loop {
            let candidate = random_id("c");
            if self.connection(&candidate).is_none() {
                break candidate;
            }
        };
        let mut connection = WebPartConnection::dynamic(
            id.clone(),
            provider.into(),
            provider_point.into(),
            consumer.into(),
            consumer_point.into(),
            self.personalization.scope().is_shared(),
        );
        connection.set_transformer(transformer);
        self.dynamic_connections.push(connection)?;
        self.mark_changed();
        debug!(connection = %id, provider, consumer, "connected web parts");
        self.after(ManagerEvent::Connected {
            connection: id.clone(),
        });
        Ok(Some(id))
    }

    /// Connects from raw form values; never fails.
    pub fn connect_from_submission(&mut self, submission: &ConnectionSubmission) -> ConnectOutcome {
        if [
            &submission.provider,
            &submission.provider_point,
            &submission.consumer,
            &submission.consumer_point,
        ]
        .iter()
        .any(|value| value.is_empty())
        {
            return ConnectOutcome::Rejected("the connection request is incomplete".into());
        }
        let transformer = match &submission.transformer {
            Some(name) => match self.services.transformers.create(name) {
                Some(mut transformer) => {
                    transformer.load_configuration(submission.transformer_configuration.as_ref());
                    Some(transformer)
                }
                None => {
                    let err = WebPartsError::TransformerNotAvailable(name.clone());
                    return ConnectOutcome::Rejected(err.to_string().into());
                }
            },
            None => None,
        };
        match self.connect(
            &submission.provider,
            &submission.provider_point,
            &submission.consumer,
            &submission.consumer_point,
            transformer,
        ) {
            Ok(Some(id)) => ConnectOutcome::Connected(id),
            Ok(None) => ConnectOutcome::Cancelled,
            Err(err) => {
                debug!(%err, "rejected submitted connection");
                ConnectOutcome::Rejected(err.to_string().into())
            }
        }
    }

    /// Removes or tombstones a connection. Returns `false` when a hook cancelled.
    pub fn disconnect(&mut self, id: &str) -> Result<bool, WebPartsError> {
        self.ensure_reached("disconnect", LifecyclePhase::InitComplete)?;
        self.personalization.ensure_enabled(true)?;
        let connection = if let Some(connection) = self.static_connections.get(id) {
            self.static_connections.check_writable()?;
            connection
        } else if let Some(connection) = self.dynamic_connections.get(id) {
            self.dynamic_connections.check_writable()?;
            connection
        } else {
            return Err(WebPartsError::UnknownConnection(id.into()));
        };
        if connection.is_deleted() {
            return Err(WebPartsError::AlreadyDisconnected(id.into()));
        }
        self.disconnect_internal(id, false)
    }

    pub(super) fn disconnect_internal(
        &mut self,
        id: &str,
        cascade: bool,
    ) -> Result<bool, WebPartsError> {
        let event = ManagerEvent::Disconnecting {
            connection: id.into(),
        };
        if !self.before(&event, cascade) {
            return Ok(false);
        }
        let scope = self.personalization.scope();
        if let Some(connection) = self.static_connections.get_mut(id) {
            connection.mark_deleted(scope);
        } else if let Some(connection) = self.dynamic_connections.get_mut(id) {
            if connection.is_shared() && scope.is_user() {
                connection.mark_deleted(scope);
            } else {
                self.dynamic_connections.remove(id)?;
            }
        } else {
            return Err(WebPartsError::UnknownConnection(id.into()));
        }
        self.mark_changed();
        self.after(ManagerEvent::Disconnected {
            connection: id.into(),
        });
        Ok(true)
    }

    pub(super) fn disconnect_part_connections(
        &mut self,
        part_id: &str,
    ) -> Result<(), WebPartsError> {
        let ids: Vec<SmolStr> = self
            .connections()
            .filter(|connection| connection.involves(part_id))
            .map(|connection| connection.id().into())
            .collect();
        for id in ids {
            self.disconnect_internal(&id, true)?;
        }
        Ok(())
    }

    /// Resolves conflicts, freezes both collections and activates survivors.
    pub(super) fn activate_connections(&mut self) -> Result<(), WebPartsError> {
        self.before(&ManagerEvent::ActivatingConnections, true);

        let mut seen = FxHashSet::default();
        for connection in self.static_connections.iter().chain(self.dynamic_connections.iter()) {
            if !seen.insert(connection.id().to_ascii_lowercase()) {
                return Err(WebPartsError::DuplicateConnectionId(connection.id().into()));
            }
        }

        let mut dropped = Vec::new();
        for connection in self.connections() {
            let missing = if !self.parts.contains_key(connection.provider_id()) {
                Some(WebPartsError::MissingProvider {
                    connection: connection.id().into(),
                    provider: connection.provider_id().into(),
                })
            } else if !self.parts.contains_key(connection.consumer_id()) {
                Some(WebPartsError::MissingConsumer {
                    connection: connection.id().into(),
                    consumer: connection.consumer_id().into(),
                })
            } else {
                None
            };
            if let Some(err) = missing {
                if connection.is_static() {
                    return Err(err);
                }
                debug!(
                    connection = connection.id(),
                    %err,
                    "dropping connection to a missing web part"
                );
                dropped.push(SmolStr::new(connection.id()));
            }
        }
        for id in dropped {
            self.dynamic_connections.remove(&id)?;
            self.mark_changed();
        }

        let candidates: Vec<ActivationCandidate> = self
            .connections()
            .map(|connection| self.candidate(connection))
            .collect();
        let plan = resolve_conflicts(&candidates);
        for id in &plan.disconnect {
            debug!(connection = %id, "connection overridden by a more specific one");
            self.disconnect_internal(id, true)?;
        }
        for conflict in &plan.conflicts {
            let message = conflict.message();
            warn!(
                connection = %conflict.connection,
                other = %conflict.other,
                "connection conflict"
            );
            if let Some(slot) = self.parts.get_mut(&conflict.consumer) {
                slot.connect_error = Some(message);
            }
        }

        self.static_connections.set_read_only();
        self.dynamic_connections.set_read_only();

        let mut active = 0;
        for id in &plan.activate {
            match self.activate(id) {
                Ok(true) => active += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(connection = %id, %err, "connection not activated");
                    let consumer = self.connection(id).map(|c| SmolStr::new(c.consumer_id()));
                    let slot = consumer.and_then(|consumer| self.parts.get_mut(&consumer));
                    if let Some(slot) = slot {
                        slot.connect_error = Some(err.to_string().into());
                    }
                }
            }
        }
        self.after(ManagerEvent::ActivatedConnections { active });
        Ok(())
    }

    fn candidate(&self, connection: &WebPartConnection) -> ActivationCandidate {
        let allows_multiple = |part_id: &str, kind: ConnectionPointKind, point_id: &str| {
            self.parts.get(part_id).is_none_or(|slot| {
                self.services
                    .points
                    .points_for(slot.part(), self.culture())
                    .point(kind, point_id)
                    .is_none_or(|point| point.allows_multiple)
            })
        };
        ActivationCandidate {
            id: connection.id().into(),
            provider: connection.provider_id().into(),
            provider_point: connection.provider_point_id().into(),
            provider_allows_multiple: allows_multiple(
                connection.provider_id(),
                ConnectionPointKind::Provider,
                connection.provider_point_id(),
            ),
            consumer: connection.consumer_id().into(),
            consumer_point: connection.consumer_point_id().into(),
            consumer_allows_multiple: allows_multiple(
                connection.consumer_id(),
                ConnectionPointKind::Consumer,
                connection.consumer_point_id(),
            ),
            is_shared: connection.is_shared(),
            is_static: connection.is_static(),
        }
    }

    /// Moves the provider's value to the consumer. `Ok(false)` skips closed parts.
    fn activate(&mut self, id: &str) -> Result<bool, WebPartsError> {
        let (consumer_id, consumer_point, value) = {
            let connection = self
                .connection(id)
                .ok_or_else(|| WebPartsError::UnknownConnection(id.into()))?;
            let provider = self.slot(connection.provider_id())?;
            let consumer = self.slot(connection.consumer_id())?;
            if provider.is_closed || consumer.is_closed {
                debug!(connection = id, "not activating connection to a closed web part");
                return Ok(false);
            }
            let provider_points = self.services.points.points_for(provider.part(), self.culture());
            let consumer_points = self.services.points.points_for(consumer.part(), self.culture());
            let provider_decl = provider_points
                .provider(connection.provider_point_id())
                .ok_or_else(|| WebPartsError::InvalidConnectionPoint {
                    part: connection.provider_id().into(),
                    point: connection.provider_point_id().into(),
                })?;
            let consumer_decl = consumer_points
                .consumer(connection.consumer_point_id())
                .ok_or_else(|| WebPartsError::InvalidConnectionPoint {
                    part: connection.consumer_id().into(),
                    point: connection.consumer_point_id().into(),
                })?;
            check_enabled(connection.provider_id(), provider, provider_decl)?;
            check_enabled(connection.consumer_id(), consumer, consumer_decl)?;
            check_compatibility(
                (provider, provider_decl),
                (connection.consumer_id(), consumer, consumer_decl),
                connection.transformer(),
                &self.services.transformers,
            )?;
            let value = provider.part().provide(&provider_decl.id);
            let value = match connection.transformer() {
                Some(transformer) => transformer.transform(value),
                None => value,
            };
            (
                SmolStr::new(connection.consumer_id()),
                consumer_decl.id.clone(),
                value,
            )
        };
        if let Some(slot) = self.parts.get_mut(&consumer_id) {
            slot.part.consume(&consumer_point, value);
        }
        if let Some(connection) = self.static_connections.get_mut(id) {
            connection.set_active(true);
        } else if let Some(connection) = self.dynamic_connections.get_mut(id) {
            connection.set_active(true);
        }
        Ok(true)
    }
}

fn check_enabled(
    part_id: &str,
    slot: &PartSlot,
    point: &ConnectionPoint,
) -> Result<(), WebPartsError> {
    if slot.part().connection_point_enabled(point.kind, &point.id) {
        return Ok(());
    }
    Err(WebPartsError::DisabledConnectionPoint {
        part: part_id.into(),
        point: point.id.clone(),
    })
}

/// Interface rules: exact primary match plus accepted secondary interfaces,
/// or an allowed transformer bridging the two exactly.
fn check_compatibility(
    (provider, provider_point): (&PartSlot, &ConnectionPoint),
    (consumer_id, consumer, consumer_point): (&str, &PartSlot, &ConnectionPoint),
    transformer: Option<&dyn Transformer>,
    transformers: &TransformerRegistry,
) -> Result<(), WebPartsError> {
    match transformer {
        None => {
            if provider_point.interface != consumer_point.interface {
                return Err(WebPartsError::NoCommonInterface {
                    provider: provider_point.interface.name().into(),
                    consumer: consumer_point.interface.name().into(),
                });
            }
            let secondary = provider.part().secondary_interfaces(&provider_point.id);
            if !consumer
                .part()
                .accepts_secondary_interfaces(&consumer_point.id, &secondary)
            {
                return Err(WebPartsError::IncompatibleSecondaryInterfaces {
                    part: consumer_id.into(),
                    point: consumer_point.id.clone(),
                });
            }
        }
        Some(transformer) => {
            if !transformers.is_allowed(transformer.name()) {
                return Err(WebPartsError::TransformerNotAvailable(transformer.name().into()));
            }
            if transformer.consumer_interface() != provider_point.interface {
                return Err(WebPartsError::IncompatibleProviderTransformer {
                    transformer: transformer.name().into(),
                    interface: provider_point.interface.name().into(),
                });
            }
            if transformer.provider_interface() != consumer_point.interface {
                return Err(WebPartsError::IncompatibleConsumerTransformer {
                    transformer: transformer.name().into(),
                    interface: consumer_point.interface.name().into(),
                });
            }
            if !consumer.part().accepts_secondary_interfaces(&consumer_point.id, &[]) {
                return Err(WebPartsError::ConsumerRequiresSecondaryInterfaces {
                    part: consumer_id.into(),
                    point: consumer_point.id.clone(),
                });
            }
        }
    }
    Ok(())
}
