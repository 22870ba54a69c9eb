//! Tool palette and single-key shortcuts.

use crate::shapes::ShapeKind;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Rectangle,
    Ellipse,
    Diamond,
    Text,
    Connector,
    Pen,
    Laser,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Select,
        ToolKind::Pan,
        ToolKind::Rectangle,
        ToolKind::Ellipse,
        ToolKind::Diamond,
        ToolKind::Text,
        ToolKind::Connector,
        ToolKind::Pen,
        ToolKind::Laser,
    ];

    /// Single-key shortcut that selects this tool.
    pub fn shortcut(self) -> char {
        match self {
            ToolKind::Select => 'v',
            ToolKind::Pan => 'h',
            ToolKind::Rectangle => 'r',
            ToolKind::Ellipse => 'o',
            ToolKind::Diamond => 'd',
            ToolKind::Text => 't',
            ToolKind::Connector => 'c',
            ToolKind::Pen => 'p',
            ToolKind::Laser => 'l',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        Self::ALL.into_iter().find(|tool| tool.shortcut() == key)
    }

    /// The shape a create drag with this tool produces.
    pub fn creates(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Ellipse => Some(ShapeKind::Ellipse),
            ToolKind::Diamond => Some(ShapeKind::Diamond),
            ToolKind::Text => Some(ShapeKind::Text),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Pan => "Pan",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Ellipse => "Ellipse",
            ToolKind::Diamond => "Diamond",
            ToolKind::Text => "Text",
            ToolKind::Connector => "Connector",
            ToolKind::Pen => "Pen",
            ToolKind::Laser => "Laser",
        }
    }
}
