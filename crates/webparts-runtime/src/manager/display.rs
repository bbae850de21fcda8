//! Display modes and zones.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    #[default]
    Browse,
    Design,
    Catalog,
    Edit,
    Connect,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Browse,
        DisplayMode::Design,
        DisplayMode::Catalog,
        DisplayMode::Edit,
        DisplayMode::Connect,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Browse => "browse",
            Self::Design => "design",
            Self::Catalog => "catalog",
            Self::Edit => "edit",
            Self::Connect => "connect",
        }
    }

    /// Browse and design need no tool zone.
    #[must_use]
    pub fn requires_tool_zone(self) -> bool {
        !matches!(self, Self::Browse | Self::Design)
    }

    /// Every mode except browse changes personalization.
    #[must_use]
    pub fn requires_personalization(self) -> bool {
        !matches!(self, Self::Browse)
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "browse" => Some(Self::Browse),
            "design" => Some(Self::Design),
            "catalog" => Some(Self::Catalog),
            "edit" => Some(Self::Edit),
            "connect" => Some(Self::Connect),
            _ => None,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneKind {
    /// Hosts web parts.
    WebParts,
    /// Editor, catalog or connections zone; enables the listed display modes.
    Tool { display_modes: Vec<DisplayMode> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: SmolStr,
    pub kind: ZoneKind,
}

impl Zone {
    #[must_use]
    pub fn web_parts(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            kind: ZoneKind::WebParts,
        }
    }

    #[must_use]
    pub fn tool(
        id: impl Into<SmolStr>,
        display_modes: impl IntoIterator<Item = DisplayMode>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ZoneKind::Tool {
                display_modes: display_modes.into_iter().collect(),
            },
        }
    }

    #[must_use]
    pub fn hosts_parts(&self) -> bool {
        matches!(self.kind, ZoneKind::WebParts)
    }

    #[must_use]
    pub fn enables(&self, mode: DisplayMode) -> bool {
        match &self.kind {
            ZoneKind::WebParts => false,
            ZoneKind::Tool { display_modes } => display_modes.contains(&mode),
        }
    }
}
