//! Zone and web part operations.

use smol_str::SmolStr;
use tracing::debug;
use webparts_core::Part;

use super::{
    extraction_scope, random_id, AuthorizationRequest, DynamicPartEntry, LifecyclePhase,
    ManagerEvent, PartSlot, PlaceholderKind, PlaceholderPart, WebPartManager, Zone,
};
use crate::error::WebPartsError;
use crate::state::ApplyOptions;

impl WebPartManager {
    pub fn register_zone(&mut self, zone: Zone) -> Result<(), WebPartsError> {
        self.ensure_not_past("register zone", LifecyclePhase::Initialized)?;
        if self.zones.contains_key(&zone.id) {
            return Err(WebPartsError::DuplicateZone(zone.id));
        }
        self.zones.insert(zone.id.clone(), zone);
        Ok(())
    }

    #[must_use]
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// Adds a page-declared part at the end of `zone_id`.
    ///
    /// A part whose type the hooks refuse is kept as an unauthorized placeholder.
    pub fn add_static_part(
        &mut self,
        zone_id: &str,
        part: Box<dyn Part>,
    ) -> Result<(), WebPartsError> {
        self.ensure_not_past("add static web part", LifecyclePhase::Initialized)?;
        let zone = self.web_part_zone(zone_id)?.id.clone();
        let id = SmolStr::new(part.id());
        if self.parts.contains_key(&id) {
            return Err(WebPartsError::DuplicatePart(id));
        }
        let part_type = part.part_type();
        let request = AuthorizationRequest {
            part_type: part_type.clone(),
            part_id: id.clone(),
            is_shared: true,
        };
        let index = self.zone_order(&zone, None).len();
        let slot = if self.hooks.authorize(&request) {
            PartSlot::new_static(part, zone, index)
        } else {
            debug!(part = %id, %part_type, "static web part is not authorized");
            let placeholder =
                PlaceholderPart::new(id.clone(), PlaceholderKind::Unauthorized, part_type);
            PartSlot::new_static(Box::new(placeholder), zone, index)
                .with_placeholder(PlaceholderKind::Unauthorized)
        };
        self.parts.insert(id, slot);
        Ok(())
    }

    #[must_use]
    pub fn part(&self, id: &str) -> Option<&PartSlot> {
        self.parts.get(id)
    }

    /// Mutable access to a live part, e.g. to apply a postback.
    pub fn part_mut(&mut self, id: &str) -> Option<&mut dyn Part> {
        match self.parts.get_mut(id) {
            Some(slot) => Some(slot.part.as_mut()),
            None => None,
        }
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, &PartSlot)> {
        self.parts.iter().map(|(id, slot)| (id.as_str(), slot))
    }

    /// Open parts of a zone in display order.
    #[must_use]
    pub fn zone_parts(&self, zone_id: &str) -> Vec<SmolStr> {
        self.zone_order(zone_id, None)
    }

    /// Part-initiated dirty mark for `id`.
    pub fn set_part_dirty(&mut self, id: &str) -> bool {
        self.personalization.set_part_dirty(id)
    }

    /// Creates a dynamic part from a catalog template and places it in a zone.
    ///
    /// Returns `None` when a hook cancelled the addition.
    pub fn add_web_part(
        &mut self,
        template: &mut dyn Part,
        zone_id: &str,
        zone_index: usize,
    ) -> Result<Option<SmolStr>, WebPartsError> {
        self.ensure_editable("add web part")?;
        self.personalization.ensure_enabled(true)?;
        let zone = self.web_part_zone(zone_id)?.id.clone();
        let part_type = template.part_type();
        let scope = self.personalization.scope();
        let is_shared = scope.is_shared();

        let id = loop {
            let candidate = random_id("wp");
            if !self.parts.contains_key(&candidate) {
                break candidate;
            }
        };
        let request = AuthorizationRequest {
            part_type: part_type.clone(),
            part_id: id.clone(),
            is_shared,
        };
        if !self.hooks.authorize(&request) {
            return Err(WebPartsError::Unauthorized(part_type.to_string().into()));
        }
        let event = ManagerEvent::AddingWebPart {
            part_type: part_type.clone(),
            zone: zone.clone(),
        };
        if !self.before(&event, false) {
            return Ok(None);
        }

        let part = self
            .services
            .catalog
            .create(&part_type, &id)
            .ok_or_else(|| WebPartsError::UnknownPartType(part_type.to_string().into()))?;
        let entry = DynamicPartEntry::for_type(id.clone(), &part_type);
        let mut slot = PartSlot::new_dynamic(part, entry, is_shared);
        let options = ApplyOptions::part(extraction_scope(scope, is_shared));
        slot.flags = self
            .personalization
            .apply_part(slot.part.as_mut(), &id, options)?;
        self.personalization
            .copy_personalization_state(template, slot.part.as_mut())?;
        self.personalization.force_part_dirty(&id);

        self.parts.insert(id.clone(), slot);
        self.place_in_zone(&id, &zone, zone_index);
        self.mark_changed();
        debug!(part = %id, %part_type, zone = %zone, "added web part");
        self.after(ManagerEvent::AddedWebPart { part: id.clone() });
        Ok(Some(id))
    }

    /// Brings a closed part back into a zone.
    pub fn reopen_web_part(
        &mut self,
        id: &str,
        zone_id: &str,
        zone_index: usize,
    ) -> Result<bool, WebPartsError> {
        self.ensure_editable("reopen web part")?;
        self.personalization.ensure_enabled(true)?;
        let zone = self.web_part_zone(zone_id)?.id.clone();
        let slot = self.slot(id)?;
        if !slot.is_closed {
            return Err(WebPartsError::AlreadyInZone(id.into()));
        }
        let event = ManagerEvent::AddingWebPart {
            part_type: slot.part.part_type(),
            zone: zone.clone(),
        };
        if !self.before(&event, false) {
            return Ok(false);
        }
        if let Some(slot) = self.parts.get_mut(id) {
            slot.is_closed = false;
        }
        self.place_in_zone(id, &zone, zone_index);
        self.mark_changed();
        self.after(ManagerEvent::AddedWebPart { part: id.into() });
        Ok(true)
    }

    /// Closes a part and disconnects it. Returns `false` when a hook cancelled.
    pub fn close_web_part(&mut self, id: &str) -> Result<bool, WebPartsError> {
        self.ensure_editable("close web part")?;
        self.personalization.ensure_enabled(true)?;
        if self.slot(id)?.is_closed {
            return Err(WebPartsError::AlreadyClosed(id.into()));
        }
        self.close_part_internal(id, false)
    }

    pub(super) fn close_part_internal(
        &mut self,
        id: &str,
        cascade: bool,
    ) -> Result<bool, WebPartsError> {
        let event = ManagerEvent::ClosingWebPart { part: id.into() };
        if !self.before(&event, cascade) {
            return Ok(false);
        }
        self.disconnect_part_connections(id)?;
        let zone = match self.parts.get_mut(id) {
            Some(slot) => {
                slot.is_closed = true;
                slot.zone_id.clone()
            }
            None => return Err(WebPartsError::UnknownPart(id.into())),
        };
        if let Some(zone) = zone {
            self.renumber_zone(&zone);
        }
        self.clear_selection_of(id);
        self.mark_changed();
        self.after(ManagerEvent::ClosedWebPart { part: id.into() });
        Ok(true)
    }

    /// Removes a dynamic part from the page.
    pub fn delete_web_part(&mut self, id: &str) -> Result<bool, WebPartsError> {
        self.ensure_editable("delete web part")?;
        self.personalization.ensure_enabled(true)?;
        let slot = self.slot(id)?;
        if slot.is_static {
            return Err(WebPartsError::CantDeleteStatic(id.into()));
        }
        if slot.is_shared && self.personalization.scope().is_user() {
            return Err(WebPartsError::CantDeleteSharedInUserScope(id.into()));
        }
        let event = ManagerEvent::DeletingWebPart { part: id.into() };
        if !self.before(&event, false) {
            return Ok(false);
        }
        self.disconnect_part_connections(id)?;
        let removed = self.parts.shift_remove(id);
        if let Some(zone) = removed.and_then(|slot| slot.zone_id) {
            self.renumber_zone(&zone);
        }
        self.clear_selection_of(id);
        self.mark_changed();
        self.after(ManagerEvent::DeletedWebPart { part: id.into() });
        Ok(true)
    }

    pub fn move_web_part(
        &mut self,
        id: &str,
        zone_id: &str,
        zone_index: usize,
    ) -> Result<bool, WebPartsError> {
        self.ensure_editable("move web part")?;
        self.personalization.ensure_enabled(true)?;
        let zone = self.web_part_zone(zone_id)?.id.clone();
        if self.slot(id)?.is_closed {
            return Err(WebPartsError::PartClosed(id.into()));
        }
        let event = ManagerEvent::MovingWebPart {
            part: id.into(),
            zone: zone.clone(),
            index: zone_index,
        };
        if !self.before(&event, false) {
            return Ok(false);
        }
        self.place_in_zone(id, &zone, zone_index);
        self.mark_changed();
        self.after(ManagerEvent::MovedWebPart { part: id.into() });
        Ok(true)
    }

    pub(super) fn slot(&self, id: &str) -> Result<&PartSlot, WebPartsError> {
        self.parts
            .get(id)
            .ok_or_else(|| WebPartsError::UnknownPart(id.into()))
    }

    fn web_part_zone(&self, zone_id: &str) -> Result<&Zone, WebPartsError> {
        let zone = self
            .zones
            .get(zone_id)
            .ok_or_else(|| WebPartsError::UnknownZone(zone_id.into()))?;
        if !zone.hosts_parts() {
            return Err(WebPartsError::NotAWebPartZone(zone_id.into()));
        }
        Ok(zone)
    }

    fn zone_order(&self, zone_id: &str, excluding: Option<&str>) -> Vec<SmolStr> {
        let mut members: Vec<(usize, usize, &SmolStr)> = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, (id, slot))| {
                !slot.is_closed
                    && slot.zone_id.as_deref() == Some(zone_id)
                    && excluding != Some(id.as_str())
            })
            .map(|(position, (id, slot))| (slot.zone_index, position, id))
            .collect();
        members.sort();
        members.into_iter().map(|(_, _, id)| id.clone()).collect()
    }

    fn place_in_zone(&mut self, id: &str, zone: &SmolStr, index: usize) {
        let previous = self.parts.get(id).and_then(|slot| slot.zone_id.clone());
        let mut order = self.zone_order(zone, Some(id));
        order.insert(index.min(order.len()), id.into());
        for (position, member) in order.iter().enumerate() {
            if let Some(slot) = self.parts.get_mut(member) {
                slot.zone_id = Some(zone.clone());
                slot.zone_index = position;
            }
        }
        if let Some(previous) = previous.filter(|previous| previous != zone) {
            self.renumber_zone(&previous);
        }
    }

    fn renumber_zone(&mut self, zone: &str) {
        let order = self.zone_order(zone, None);
        for (position, member) in order.iter().enumerate() {
            if let Some(slot) = self.parts.get_mut(member) {
                slot.zone_index = position;
            }
        }
    }
}
