//! Host visualization interface (what the history core needs from the tree widget).
//!
//! The host owns the tree, the render mode, the drawing surface and the
//! node registries. The history core never renders anything itself: it only
//! calls into these traits and listens to host events.
//!
//! - HostVisualization: synchronous calls into the host.
//! - NodeRegistry     : lookup of nodes in the host's original structure.
//! - HostEventSource  : typed listener registration (RAII handles).
//! - Extensions       : extension point the host dispatches resize to.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::key::{NodeId, RenderMode};
use crate::panel::PanelLayout;
use crate::store::Thumbnail;
use crate::subs::{Callback, EventBus, SubscriptionHandle, Topic};

mod extensions;

pub use extensions::{Extensions, HostExtension};

/// Container size in px.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Opaque reference to a node resolved through a registry.
/// `slot` is host-private (index into its own storage).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub slot: usize,
}

pub trait NodeRegistry: Send + Sync {
    fn lookup(&self, id: &NodeId) -> Option<NodeRef>;
}

/// Synchronous host API consumed by the history controller.
pub trait HostVisualization: Send + Sync {
    /// Root of the currently loaded tree (None before the first load).
    fn root_id(&self) -> Option<NodeId>;

    fn current_render_mode(&self) -> RenderMode;

    /// Rasterize the current view.
    fn render_thumbnail(&self) -> Result<Thumbnail>;

    /// `suppress_feedback = true`: the change comes from a history restore.
    fn set_render_mode(&self, mode: &RenderMode, suppress_feedback: bool);

    fn redraw_from(&self, node: &NodeRef);

    /// Immutable record of the tree as initially loaded.
    fn original_structure(&self) -> Arc<dyn NodeRegistry>;

    fn container_dimensions(&self) -> Dimensions;

    /// Resize the rendering surface and offset it next to the panel.
    fn apply_layout(&self, layout: &PanelLayout);

    fn draw(&self);
}

/// Lifecycle events raised by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// A tree was loaded (root becomes the snapshot node).
    Loaded,
    /// The view was redrawn from a subtree.
    Subtree { node_id: NodeId },
    /// Render mode changed (root becomes the snapshot node).
    TypeChanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    Loaded,
    Subtree,
    TypeChanged,
}

impl HostEventKind {
    pub const ALL: [HostEventKind; 3] = [
        HostEventKind::Loaded,
        HostEventKind::Subtree,
        HostEventKind::TypeChanged,
    ];

    /// Listener name as the widget spells it.
    pub fn name(self) -> &'static str {
        match self {
            HostEventKind::Loaded => "loaded",
            HostEventKind::Subtree => "subtree",
            HostEventKind::TypeChanged => "typechanged",
        }
    }
}

impl Topic for HostEvent {
    type Kind = HostEventKind;

    fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::Loaded => HostEventKind::Loaded,
            HostEvent::Subtree { .. } => HostEventKind::Subtree,
            HostEvent::TypeChanged => HostEventKind::TypeChanged,
        }
    }
}

/// Typed event source handed to the controller at construction.
pub trait HostEventSource {
    fn add_listener(&self, kind: HostEventKind, cb: Callback<HostEvent>) -> SubscriptionHandle;
}

impl HostEventSource for Arc<EventBus<HostEvent>> {
    fn add_listener(&self, kind: HostEventKind, cb: Callback<HostEvent>) -> SubscriptionHandle {
        self.subscribe(Some(kind), cb)
    }
}
