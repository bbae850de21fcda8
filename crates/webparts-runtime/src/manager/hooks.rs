//! Before/after hook points raised by manager operations.

#![allow(missing_docs)]

use smol_str::SmolStr;
use webparts_core::PartType;

use super::display::DisplayMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    AddingWebPart { part_type: PartType, zone: SmolStr },
    AddedWebPart { part: SmolStr },
    ClosingWebPart { part: SmolStr },
    ClosedWebPart { part: SmolStr },
    DeletingWebPart { part: SmolStr },
    DeletedWebPart { part: SmolStr },
    MovingWebPart { part: SmolStr, zone: SmolStr, index: usize },
    MovedWebPart { part: SmolStr },
    Connecting {
        provider: SmolStr,
        provider_point: SmolStr,
        consumer: SmolStr,
        consumer_point: SmolStr,
    },
    Connected { connection: SmolStr },
    Disconnecting { connection: SmolStr },
    Disconnected { connection: SmolStr },
    DisplayModeChanging { from: DisplayMode, to: DisplayMode },
    DisplayModeChanged { from: DisplayMode, to: DisplayMode },
    SelectionChanging { part: Option<SmolStr>, mode: DisplayMode },
    SelectionChanged { part: Option<SmolStr>, mode: DisplayMode },
    ActivatingConnections,
    ActivatedConnections { active: usize },
}

/// Passed to [`ManagerHooks::before`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookContext {
    /// The action is part of an internal cascade; a cancel is ignored.
    pub cascade: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookDecision {
    #[default]
    Proceed,
    Cancel,
}

/// Asked before a part type is placed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub part_type: PartType,
    pub part_id: SmolStr,
    pub is_shared: bool,
}

pub trait ManagerHooks {
    fn before(&mut self, _event: &ManagerEvent, _cx: HookContext) -> HookDecision {
        HookDecision::Proceed
    }

    fn after(&mut self, _event: &ManagerEvent) {}

    fn authorize(&mut self, _request: &AuthorizationRequest) -> bool {
        true
    }
}

/// Hooks that allow everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ManagerHooks for NoHooks {}
