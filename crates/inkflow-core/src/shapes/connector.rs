//! Connectors between shapes or free canvas points.

use super::{ElementId, ElementStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// One end of a connector.
///
/// On the wire this is `{shape_id, port_id, x, y}`: a non-null `shape_id`
/// means bound (coordinates ignored), null means free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEnd", into = "WireEnd")]
pub enum ConnectorEnd {
    /// Attached to a port; follows the shape when it moves.
    Bound { shape_id: ElementId, port_id: ElementId },
    /// Fixed canvas coordinate.
    Free(Point),
}

impl ConnectorEnd {
    pub fn bound(shape_id: impl Into<ElementId>, port_id: impl Into<ElementId>) -> Self {
        ConnectorEnd::Bound {
            shape_id: shape_id.into(),
            port_id: port_id.into(),
        }
    }

    pub fn shape_id(&self) -> Option<&str> {
        match self {
            ConnectorEnd::Bound { shape_id, .. } => Some(shape_id),
            ConnectorEnd::Free(_) => None,
        }
    }

    pub fn is_bound_to(&self, id: &str) -> bool {
        self.shape_id() == Some(id)
    }
}

#[derive(Serialize, Deserialize)]
struct WireEnd {
    #[serde(default)]
    shape_id: Option<ElementId>,
    #[serde(default)]
    port_id: Option<ElementId>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

impl From<WireEnd> for ConnectorEnd {
    fn from(wire: WireEnd) -> Self {
        match wire.shape_id {
            Some(shape_id) => ConnectorEnd::Bound {
                shape_id,
                port_id: wire.port_id.unwrap_or_default(),
            },
            None => ConnectorEnd::Free(Point::new(wire.x, wire.y)),
        }
    }
}

impl From<ConnectorEnd> for WireEnd {
    fn from(end: ConnectorEnd) -> Self {
        match end {
            ConnectorEnd::Bound { shape_id, port_id } => WireEnd {
                shape_id: Some(shape_id),
                port_id: Some(port_id),
                x: 0.0,
                y: 0.0,
            },
            ConnectorEnd::Free(p) => WireEnd {
                shape_id: None,
                port_id: None,
                x: p.x,
                y: p.y,
            },
        }
    }
}

/// Which ends carry an arrowhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowType {
    #[default]
    Forward,
    Back,
    Both,
}

/// How the connector path is drawn between its ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
    #[default]
    Ortho,
    Smooth,
    Straight,
}

/// A directed link between two ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ElementId,
    pub source: ConnectorEnd,
    pub target: ConnectorEnd,
    #[serde(default)]
    pub arrow_type: ArrowType,
    #[serde(default)]
    pub routing: Routing,
    /// Explicit bezier control points for smooth routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_points: Option<[Point; 2]>,
    #[serde(default)]
    pub style: ElementStyle,
    #[serde(default)]
    pub z_index: i64,
}

impl Connector {
    pub fn new(id: ElementId, source: ConnectorEnd, target: ConnectorEnd) -> Self {
        Self {
            id,
            source,
            target,
            arrow_type: ArrowType::default(),
            routing: Routing::default(),
            control_points: None,
            style: ElementStyle::default(),
            z_index: 0,
        }
    }

    /// Whether either end is bound to `shape_id`.
    pub fn touches(&self, shape_id: &str) -> bool {
        self.source.is_bound_to(shape_id) || self.target.is_bound_to(shape_id)
    }
}
