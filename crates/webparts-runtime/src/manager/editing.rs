//! Display modes and the edit/connect selection.

use smol_str::SmolStr;

use super::{DisplayMode, LifecyclePhase, ManagerEvent, WebPartManager};
use crate::error::WebPartsError;

impl WebPartManager {
    #[must_use]
    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Part currently being edited or connected.
    #[must_use]
    pub fn selected_part(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Browse and design are always supported; other modes need a tool zone.
    #[must_use]
    pub fn supports_display_mode(&self, mode: DisplayMode) -> bool {
        !mode.requires_tool_zone() || self.zones.values().any(|zone| zone.enables(mode))
    }

    #[must_use]
    pub fn supported_display_modes(&self) -> Vec<DisplayMode> {
        DisplayMode::ALL
            .into_iter()
            .filter(|mode| self.supports_display_mode(*mode))
            .collect()
    }

    /// Returns `false` when a hook cancelled the change.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<bool, WebPartsError> {
        self.ensure_reached("set display mode", LifecyclePhase::InitComplete)?;
        self.ensure_not_past("set display mode", LifecyclePhase::LoadComplete)?;
        if !self.supports_display_mode(mode) {
            return Err(WebPartsError::UnsupportedDisplayMode(mode));
        }
        if mode.requires_personalization() && !self.personalization.is_modifiable() {
            return Err(WebPartsError::DisabledDisplayMode(mode));
        }
        let from = self.display_mode;
        if from == mode {
            return Ok(true);
        }
        if !self.before(&ManagerEvent::DisplayModeChanging { from, to: mode }, false) {
            return Ok(false);
        }
        if self.selected.is_some() && matches!(from, DisplayMode::Edit | DisplayMode::Connect) {
            self.change_selection(None, from, true);
        }
        self.display_mode = mode;
        self.after(ManagerEvent::DisplayModeChanged { from, to: mode });
        Ok(true)
    }

    pub fn begin_web_part_editing(&mut self, id: &str) -> Result<bool, WebPartsError> {
        self.begin_selection(id, DisplayMode::Edit)
    }

    pub fn end_web_part_editing(&mut self) -> Result<bool, WebPartsError> {
        self.end_selection(DisplayMode::Edit)
    }

    pub fn begin_web_part_connecting(&mut self, id: &str) -> Result<bool, WebPartsError> {
        self.personalization.ensure_enabled(true)?;
        self.begin_selection(id, DisplayMode::Connect)
    }

    pub fn end_web_part_connecting(&mut self) -> Result<bool, WebPartsError> {
        self.end_selection(DisplayMode::Connect)
    }

    fn begin_selection(&mut self, id: &str, mode: DisplayMode) -> Result<bool, WebPartsError> {
        if self.display_mode != mode {
            return Err(WebPartsError::WrongDisplayMode(mode));
        }
        if self.slot(id)?.is_closed {
            return Err(WebPartsError::PartClosed(id.into()));
        }
        if self.selected.as_deref() == Some(id) {
            return Ok(true);
        }
        Ok(self.change_selection(Some(id.into()), mode, false))
    }

    fn end_selection(&mut self, mode: DisplayMode) -> Result<bool, WebPartsError> {
        if self.display_mode != mode {
            return Err(WebPartsError::WrongDisplayMode(mode));
        }
        if self.selected.is_none() {
            return Err(WebPartsError::NoSelectedPart);
        }
        Ok(self.change_selection(None, mode, false))
    }

    fn change_selection(
        &mut self,
        part: Option<SmolStr>,
        mode: DisplayMode,
        cascade: bool,
    ) -> bool {
        let event = ManagerEvent::SelectionChanging {
            part: part.clone(),
            mode,
        };
        if !self.before(&event, cascade) {
            return false;
        }
        if part.is_some() {
            self.mark_changed();
        }
        self.selected = part.clone();
        self.after(ManagerEvent::SelectionChanged { part, mode });
        true
    }

    /// Drops the selection when its part leaves the page.
    pub(super) fn clear_selection_of(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            let mode = self.display_mode;
            self.change_selection(None, mode, true);
        }
    }
}
