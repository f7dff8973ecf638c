//! Domain Data
//!
//! The graph data handed in by the embedding application: nodes and edges
//! with open-ended attribute records, node positions, and the plain geometry
//! types the derived state is expressed in.

use std::ops::{Add, Mul, Sub};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form attributes of a node or edge.
pub type Attributes = serde_json::Map<String, Value>;

/// Node collection, keyed by node id, in insertion order.
pub type Nodes = IndexMap<String, Node>;

/// Edge collection, keyed by edge id, in insertion order.
pub type Edges = IndexMap<String, Edge>;

/// Node id → position, maintained by the active layout.
pub type NodePositions = IndexMap<String, Point>;

/// A set of entity ids, such as the selected nodes.
pub type IdSet = IndexSet<String>;

/// A node: nothing but its attributes. Identity lives in the collection key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node {
    attributes: Attributes,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

impl From<Attributes> for Node {
    fn from(attributes: Attributes) -> Self {
        Self { attributes }
    }
}

/// An edge between two node ids, plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// A point in the diagram plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (other - self).length()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Unit vector rotated 90° counter-clockwise, or `None` for a zero vector.
    pub fn unit_normal(self) -> Option<Point> {
        let len = self.length();
        if len <= f64::EPSILON {
            return None;
        }
        Some(Point::new(-self.y / len, self.x / len))
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Where a rendered edge line starts and ends.
///
/// `control` is set for curved edges and self-loops: a quadratic control
/// point the renderer bends the line through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinePosition {
    pub source: Point,
    pub target: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Point>,
}

impl LinePosition {
    pub fn straight(source: Point, target: Point) -> Self {
        Self {
            source,
            target,
            control: None,
        }
    }
}

/// Render a JSON attribute as label text.
///
/// Strings are used verbatim, other scalars are formatted, and absent or
/// null values become the empty string.
pub fn attribute_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
