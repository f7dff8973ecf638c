//! Layout activation interface.
//!
//! Layout strategies decide where nodes go. They are not part of this crate;
//! they plug in through [`LayoutHandler`] and receive everything they need
//! to read the graph and write node positions in a
//! [`LayoutActivateParameters`].

use std::fmt;
use std::sync::Arc;

use crate::events::Emitter;
use crate::model::{Edges, NodePositions, Nodes, Point};
use crate::reactive::Signal;
use crate::style::Configs;

/// Pan and zoom of the host view, owned by the renderer.
pub trait ViewportController: Send + Sync {
    fn zoom(&self) -> f64;
    fn set_zoom(&self, zoom: f64);
    fn pan(&self) -> Point;
    fn set_pan(&self, pan: Point);
}

/// What a layout gets on activation.
///
/// `layouts` is the only signal a layout is expected to write.
#[derive(Clone)]
pub struct LayoutActivateParameters {
    pub layouts: Signal<NodePositions>,
    pub nodes: Signal<Nodes>,
    pub links: Signal<Edges>,
    pub styles: Arc<Configs>,
    pub emitter: Emitter,
    pub scale: Signal<f64>,
    pub viewport: Arc<dyn ViewportController>,
}

impl fmt::Debug for LayoutActivateParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutActivateParameters")
            .field("layouts", &self.layouts)
            .field("nodes", &self.nodes)
            .field("links", &self.links)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// A pluggable layout strategy.
pub trait LayoutHandler {
    /// Start positioning nodes. Called once before any other call.
    fn activate(&mut self, parameters: LayoutActivateParameters);

    /// Stop positioning nodes and release whatever `activate` set up.
    fn deactivate(&mut self);
}
