//! Style Resolution
//!
//! Style configuration is declarative: for every entity kind there is a
//! `normal` variant and optional `hover` and `selected` variants. Each field
//! of a variant is either a constant or a function of the entity.
//!
//! Resolution picks the applicable variant from the entity's interaction
//! flags and evaluates every field against the entity's current data,
//! producing a plain style value the renderer can consume.
//!
//! Variant precedence differs by entity kind:
//!
//! - nodes: hover > selected > normal
//! - edges: selected > hover > normal
//!
//! A variant that is not configured falls back to `normal`.

mod edge;
mod node;

pub use edge::{EdgeConfig, EdgeKind, EdgeValue, StrokeConfig, StrokeStyle, SummarizePolicy};
pub use node::{
    LabelConfig, LabelDirection, LabelText, NodeConfig, NodeLabelStyle, NodeValue, ShapeConfig,
    ShapeKind, ShapeStyle,
};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

/// A style field: a constant, or computed from the entity it styles.
pub enum ConfigValue<E, T> {
    Fixed(T),
    Computed(Arc<dyn Fn(&E) -> T + Send + Sync>),
}

impl<E, T> ConfigValue<E, T> {
    pub fn computed(f: impl Fn(&E) -> T + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }
}

impl<E, T: Clone> ConfigValue<E, T> {
    /// Evaluate the field for `entity`.
    pub fn resolve(&self, entity: &E) -> T {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Computed(f) => f(entity),
        }
    }
}

impl<E, T: Clone> Clone for ConfigValue<E, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(value) => Self::Fixed(value.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<E, T: fmt::Debug> fmt::Debug for ConfigValue<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<E, T: Default> Default for ConfigValue<E, T> {
    fn default() -> Self {
        Self::Fixed(T::default())
    }
}

impl<E, T> From<T> for ConfigValue<E, T> {
    fn from(value: T) -> Self {
        Self::Fixed(value)
    }
}

impl<E> From<&str> for ConfigValue<E, String> {
    fn from(value: &str) -> Self {
        Self::Fixed(value.to_owned())
    }
}

impl<E> From<&str> for ConfigValue<E, Option<String>> {
    fn from(value: &str) -> Self {
        Self::Fixed(Some(value.to_owned()))
    }
}

/// Configuration files can only carry constants.
impl<'de, E, T: Deserialize<'de>> Deserialize<'de> for ConfigValue<E, T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::Fixed)
    }
}

/// Which interaction flag wins when both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Nodes: a hovered node shows its hover style even while selected.
    HoverFirst,
    /// Edges: a selected edge keeps its selected style while hovered.
    SelectionFirst,
}

/// The `normal` / `hover` / `selected` declarations for one entity kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, bound(deserialize = "C: Deserialize<'de> + Default"))]
pub struct Variants<C> {
    pub normal: C,
    pub hover: Option<C>,
    pub selected: Option<C>,
}

impl<C> Variants<C> {
    pub fn new(normal: C) -> Self {
        Self {
            normal,
            hover: None,
            selected: None,
        }
    }

    pub fn with_hover(mut self, hover: C) -> Self {
        self.hover = Some(hover);
        self
    }

    pub fn with_selected(mut self, selected: C) -> Self {
        self.selected = Some(selected);
        self
    }

    /// The variant that applies to an entity with the given flags.
    pub fn pick(&self, selected: bool, hovered: bool, precedence: Precedence) -> &C {
        let hover = self.hover.as_ref().filter(|_| hovered);
        let select = self.selected.as_ref().filter(|_| selected);

        let chosen = match precedence {
            Precedence::HoverFirst => hover.or(select),
            Precedence::SelectionFirst => select.or(hover),
        };
        chosen.unwrap_or(&self.normal)
    }
}

/// Style configuration for every entity kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configs {
    pub node: NodeConfig,
    pub edge: EdgeConfig,
}

impl Configs {
    /// Parse a (possibly partial) configuration object; omitted fields take
    /// their defaults.
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn validate(&self) -> Result<()> {
        self.edge.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};
    use serde_json::json;

    fn colored(color: &str) -> ShapeConfig {
        ShapeConfig {
            color: color.into(),
            ..ShapeConfig::default()
        }
    }

    fn stroke(color: &str) -> StrokeConfig {
        StrokeConfig {
            color: color.into(),
            ..StrokeConfig::default()
        }
    }

    #[test]
    fn node_hover_beats_selection() {
        let config = NodeConfig {
            shape: Variants::new(colored("blue"))
                .with_hover(colored("green"))
                .with_selected(colored("red")),
            ..NodeConfig::default()
        };
        let node = Node::new();

        assert_eq!(config.resolve_shape(&node, true, true).color, "green");
        assert_eq!(config.resolve_shape(&node, true, false).color, "red");
        assert_eq!(config.resolve_shape(&node, false, true).color, "green");
        assert_eq!(config.resolve_shape(&node, false, false).color, "blue");
    }

    #[test]
    fn edge_selection_beats_hover() {
        let config = EdgeConfig {
            stroke: Variants::new(stroke("blue"))
                .with_hover(stroke("green"))
                .with_selected(stroke("red")),
            ..EdgeConfig::default()
        };
        let edge = Edge::new("a", "b");

        assert_eq!(config.resolve_stroke(&edge, true, true).color, "red");
        assert_eq!(config.resolve_stroke(&edge, false, true).color, "green");
        assert_eq!(config.resolve_stroke(&edge, false, false).color, "blue");
    }

    #[test]
    fn missing_variants_fall_back_to_normal() {
        let variants = Variants::new("normal");
        assert_eq!(*variants.pick(true, true, Precedence::HoverFirst), "normal");
        assert_eq!(*variants.pick(true, true, Precedence::SelectionFirst), "normal");
    }

    #[test]
    fn computed_fields_read_entity_data() {
        let value: ConfigValue<Node, f64> = ConfigValue::computed(|node: &Node| {
            node.get("size").and_then(|v| v.as_f64()).unwrap_or(8.0)
        });

        assert_eq!(value.resolve(&Node::new().with("size", 20)), 20.0);
        assert_eq!(value.resolve(&Node::new()), 8.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let configs = Configs::from_json(json!({
            "node": { "shape": { "normal": { "color": "#ff0000" } } },
            "edge": { "gap": 6.0 }
        }))
        .unwrap();

        let shape = configs.node.resolve_shape(&Node::new(), false, false);
        assert_eq!(shape.color, "#ff0000");
        assert_eq!(shape.radius, 16.0);
        assert_eq!(configs.edge.gap, 6.0);
        assert!(configs.node.shape.hover.is_none());
        assert!(configs.validate().is_ok());
    }
}
