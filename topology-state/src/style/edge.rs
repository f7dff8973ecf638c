//! Edge stroke styles and grouping parameters.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ConfigValue, Precedence, Variants};
use crate::error::{Error, Result};
use crate::model::Edge;

/// An edge style field.
pub type EdgeValue<T> = ConfigValue<Edge, T>;

/// Stroke declaration for one variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    pub width: EdgeValue<f64>,
    pub color: EdgeValue<String>,
    pub dasharray: EdgeValue<Option<String>>,
    pub linecap: EdgeValue<Option<String>>,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            width: 2.0.into(),
            color: "#4466cc".into(),
            dasharray: ConfigValue::Fixed(None),
            linecap: ConfigValue::Fixed(None),
        }
    }
}

impl StrokeConfig {
    pub fn resolve(&self, edge: &Edge) -> StrokeStyle {
        StrokeStyle {
            width: self.width.resolve(edge),
            color: self.color.resolve(edge),
            dasharray: self.dasharray.resolve(edge),
            linecap: self.linecap.resolve(edge),
        }
    }
}

/// A resolved edge stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub width: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dasharray: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linecap: Option<String>,
}

/// How parallel edges are drawn apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Both ends shifted sideways by the edge's offset.
    #[default]
    Straight,
    /// Ends at the node centers, bent through a control point.
    Curve,
}

/// Decides whether a group of parallel edges is drawn as a single line.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizePolicy {
    Never,
    Always,
    /// Summarize once the fanned-out group is wider than the smaller of its
    /// two endpoint nodes.
    #[default]
    WiderThanNodes,
    /// Called with the edge count and the group width in screen units.
    #[serde(skip)]
    Custom(Arc<dyn Fn(usize, f64) -> bool + Send + Sync>),
}

impl SummarizePolicy {
    pub fn custom(f: impl Fn(usize, f64) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// `node_extent` is the smaller endpoint extent, `None` when neither
    /// endpoint exists.
    pub fn should_summarize(&self, count: usize, width: f64, node_extent: Option<f64>) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::WiderThanNodes => node_extent.is_some_and(|extent| width > extent),
            Self::Custom(f) => f(count, width),
        }
    }
}

impl fmt::Debug for SummarizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::Always => f.write_str("Always"),
            Self::WiderThanNodes => f.write_str("WiderThanNodes"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Everything that styles an edge and lays out its group.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeConfig {
    pub stroke: Variants<StrokeConfig>,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    /// Screen-space spacing between parallel edges.
    pub gap: f64,
    /// Screen-space height of the innermost self-loop.
    pub self_loop_radius: f64,
    pub summarize: SummarizePolicy,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        let hover = StrokeConfig {
            width: 3.0.into(),
            color: "#3355bb".into(),
            ..StrokeConfig::default()
        };
        let selected = StrokeConfig {
            width: 3.0.into(),
            color: "#dd8800".into(),
            dasharray: "6".into(),
            ..StrokeConfig::default()
        };

        Self {
            stroke: Variants::new(StrokeConfig::default())
                .with_hover(hover)
                .with_selected(selected),
            kind: EdgeKind::Straight,
            gap: 3.0,
            self_loop_radius: 12.0,
            summarize: SummarizePolicy::default(),
        }
    }
}

impl EdgeConfig {
    pub fn resolve_stroke(&self, edge: &Edge, selected: bool, hovered: bool) -> StrokeStyle {
        self.stroke
            .pick(selected, hovered, Precedence::SelectionFirst)
            .resolve(edge)
    }

    /// Stroke width of the edge at rest; groups are laid out from this.
    pub fn base_width(&self, edge: &Edge) -> f64 {
        self.stroke.normal.width.resolve(edge)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("gap", self.gap), ("selfLoopRadius", self.self_loop_radius)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidEdgeConfig { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_variants() {
        let config = EdgeConfig::default();
        let edge = Edge::new("a", "b");

        let normal = config.resolve_stroke(&edge, false, false);
        assert_eq!((normal.width, normal.color.as_str()), (2.0, "#4466cc"));

        let hover = config.resolve_stroke(&edge, false, true);
        assert_eq!((hover.width, hover.color.as_str()), (3.0, "#3355bb"));

        let selected = config.resolve_stroke(&edge, true, true);
        assert_eq!(selected.color, "#dd8800");
        assert_eq!(selected.dasharray.as_deref(), Some("6"));
    }

    #[test]
    fn base_width_ignores_interaction() {
        let config = EdgeConfig {
            stroke: Variants::new(StrokeConfig {
                width: ConfigValue::computed(|edge: &Edge| {
                    edge.get("weight").and_then(|w| w.as_f64()).unwrap_or(1.0)
                }),
                ..StrokeConfig::default()
            }),
            ..EdgeConfig::default()
        };

        assert_eq!(config.base_width(&Edge::new("a", "b").with("weight", 5)), 5.0);
        assert_eq!(config.base_width(&Edge::new("a", "b")), 1.0);
    }

    #[test]
    fn summarize_policies() {
        assert!(!SummarizePolicy::Never.should_summarize(10, 100.0, Some(1.0)));
        assert!(SummarizePolicy::Always.should_summarize(1, 0.0, None));

        let default = SummarizePolicy::default();
        assert!(default.should_summarize(3, 40.0, Some(32.0)));
        assert!(!default.should_summarize(3, 20.0, Some(32.0)));
        assert!(!default.should_summarize(3, 40.0, None));

        let custom = SummarizePolicy::custom(|count, _| count > 2);
        assert!(custom.should_summarize(3, 0.0, None));
        assert!(!custom.should_summarize(2, 0.0, None));
    }

    #[test]
    fn validate_rejects_bad_geometry() {
        let negative = EdgeConfig {
            gap: -1.0,
            ..EdgeConfig::default()
        };
        assert_eq!(
            negative.validate(),
            Err(Error::InvalidEdgeConfig {
                field: "gap",
                value: -1.0
            })
        );

        let infinite = EdgeConfig {
            self_loop_radius: f64::INFINITY,
            ..EdgeConfig::default()
        };
        assert!(infinite.validate().is_err());
        assert!(EdgeConfig::default().validate().is_ok());
    }

    #[test]
    fn deserializes_kind_and_policy() {
        let config: EdgeConfig = serde_json::from_value(json!({
            "type": "curve",
            "summarize": "never",
            "selfLoopRadius": 20.0
        }))
        .unwrap();

        assert_eq!(config.kind, EdgeKind::Curve);
        assert!(matches!(config.summarize, SummarizePolicy::Never));
        assert_eq!(config.self_loop_radius, 20.0);
        assert_eq!(config.gap, 3.0);
    }
}
