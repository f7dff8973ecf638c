//! Node shape and label styles.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use super::{ConfigValue, Precedence, Variants};
use crate::model::{attribute_text, Node};

/// A node style field.
pub type NodeValue<T> = ConfigValue<Node, T>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Circle,
    Rect,
}

/// Shape declaration for one variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeConfig {
    #[serde(rename = "type")]
    pub kind: NodeValue<ShapeKind>,
    pub radius: NodeValue<f64>,
    pub width: NodeValue<f64>,
    pub height: NodeValue<f64>,
    pub border_radius: NodeValue<f64>,
    pub color: NodeValue<String>,
    pub stroke_width: NodeValue<f64>,
    pub stroke_color: NodeValue<Option<String>>,
    pub stroke_dasharray: NodeValue<Option<String>>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Circle.into(),
            radius: 16.0.into(),
            width: 32.0.into(),
            height: 32.0.into(),
            border_radius: 0.0.into(),
            color: "#4466cc".into(),
            stroke_width: 0.0.into(),
            stroke_color: ConfigValue::Fixed(None),
            stroke_dasharray: ConfigValue::Fixed(None),
        }
    }
}

impl ShapeConfig {
    pub fn resolve(&self, node: &Node) -> ShapeStyle {
        ShapeStyle {
            kind: self.kind.resolve(node),
            radius: self.radius.resolve(node),
            width: self.width.resolve(node),
            height: self.height.resolve(node),
            border_radius: self.border_radius.resolve(node),
            color: self.color.resolve(node),
            stroke_width: self.stroke_width.resolve(node),
            stroke_color: self.stroke_color.resolve(node),
            stroke_dasharray: self.stroke_dasharray.resolve(node),
        }
    }
}

/// A resolved node shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub radius: f64,
    pub width: f64,
    pub height: f64,
    pub border_radius: f64,
    pub color: String,
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
}

impl ShapeStyle {
    /// The shape's smallest span across its center.
    pub fn extent(&self) -> f64 {
        match self.kind {
            ShapeKind::Circle => self.radius * 2.0,
            ShapeKind::Rect => self.width.min(self.height),
        }
    }
}

/// Where the label sits relative to its node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelDirection {
    North,
    #[default]
    South,
    East,
    West,
    Center,
}

/// How a node's label text is produced.
#[derive(Clone)]
pub enum LabelText {
    /// Read the named attribute.
    Attribute(String),
    /// Format the node.
    Format(Arc<dyn Fn(&Node) -> String + Send + Sync>),
}

impl LabelText {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    pub fn format(f: impl Fn(&Node) -> String + Send + Sync + 'static) -> Self {
        Self::Format(Arc::new(f))
    }

    pub fn resolve(&self, node: &Node) -> String {
        match self {
            Self::Attribute(name) => attribute_text(node.get(name)),
            Self::Format(f) => f(node),
        }
    }
}

impl Default for LabelText {
    fn default() -> Self {
        Self::Attribute("name".to_owned())
    }
}

impl fmt::Debug for LabelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Self::Format(_) => f.write_str("Format(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for LabelText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::Attribute)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelConfig {
    pub font_family: NodeValue<Option<String>>,
    pub font_size: NodeValue<f64>,
    pub line_height: NodeValue<f64>,
    pub color: NodeValue<String>,
    pub margin: NodeValue<f64>,
    pub direction: NodeValue<LabelDirection>,
    pub text: LabelText,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_family: ConfigValue::Fixed(None),
            font_size: 11.0.into(),
            line_height: 1.1.into(),
            color: "#000000".into(),
            margin: 4.0.into(),
            direction: LabelDirection::South.into(),
            text: LabelText::default(),
        }
    }
}

impl LabelConfig {
    pub fn resolve(&self, node: &Node) -> NodeLabelStyle {
        NodeLabelStyle {
            font_family: self.font_family.resolve(node),
            font_size: self.font_size.resolve(node),
            line_height: self.line_height.resolve(node),
            color: self.color.resolve(node),
            margin: self.margin.resolve(node),
            direction: self.direction.resolve(node),
        }
    }
}

/// A resolved label style. The text itself is resolved separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLabelStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    pub font_size: f64,
    pub line_height: f64,
    pub color: String,
    pub margin: f64,
    pub direction: LabelDirection,
}

/// Everything that styles a node.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub shape: Variants<ShapeConfig>,
    pub label: LabelConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let hover = ShapeConfig {
            color: "#3355bb".into(),
            ..ShapeConfig::default()
        };
        let selected = ShapeConfig {
            stroke_width: 2.0.into(),
            stroke_color: "#ff8800".into(),
            ..ShapeConfig::default()
        };

        Self {
            shape: Variants::new(ShapeConfig::default())
                .with_hover(hover)
                .with_selected(selected),
            label: LabelConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn resolve_shape(&self, node: &Node, selected: bool, hovered: bool) -> ShapeStyle {
        self.shape
            .pick(selected, hovered, Precedence::HoverFirst)
            .resolve(node)
    }

    pub fn resolve_label(&self, node: &Node) -> NodeLabelStyle {
        self.label.resolve(node)
    }

    pub fn resolve_label_text(&self, node: &Node) -> String {
        self.label.text.resolve(node)
    }

    /// Extent of the node's normal shape, used when deciding whether an edge
    /// group fits between two nodes.
    pub fn extent(&self, node: &Node) -> f64 {
        self.shape.normal.resolve(node).extent()
    }
}
