//! In-memory tree widget used by the CLI replayer and the tests.
//!
//! MemoryHost implements HostVisualization over a parsed Newick tree. It keeps
//! the tree exactly as loaded (the "original structure") next to a working
//! copy that user actions mutate (collapse/expand of nodes). Thumbnails are
//! small deterministic SVG documents describing what is on screen, so two
//! captures of the same view compare equal byte for byte.
//!
//! Events are always published after the host lock is released: listeners
//! (the history controller) call back into the host synchronously.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::host::{
    Dimensions, Extensions, HostEvent, HostVisualization, NodeRef, NodeRegistry,
};
use crate::key::{NodeId, RenderMode};
use crate::panel::{PanelLayout, SurfaceMargin};
use crate::store::Thumbnail;
use crate::subs::EventBus;

pub mod tree;

pub use tree::Tree;

/// Render mode a fresh host starts in.
pub const DEFAULT_RENDER_MODE: &str = "rectangular";

/// Render modes the demo host knows how to draw.
pub const RENDER_MODES: [&str; 5] = ["rectangular", "circular", "radial", "diagonal", "hierarchical"];

struct HostState {
    original: Option<Arc<Tree>>,
    current: Option<Tree>,
    render_mode: RenderMode,
    view_root: Option<NodeId>,
    container: Dimensions,
    layout: Option<PanelLayout>,
    draws: usize,
    redraws: Vec<NodeId>,
    mode_log: Vec<(RenderMode, bool)>,
    fail_thumbnails: bool,
}

pub struct MemoryHost {
    state: Mutex<HostState>,
    events: Arc<EventBus<HostEvent>>,
    extensions: Extensions,
}

impl MemoryHost {
    pub fn new(container: Dimensions) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HostState {
                original: None,
                current: None,
                render_mode: RenderMode::from(DEFAULT_RENDER_MODE),
                view_root: None,
                container,
                layout: None,
                draws: 0,
                redraws: Vec::new(),
                mode_log: Vec::new(),
                fail_thumbnails: false,
            }),
            events: EventBus::new(),
            extensions: Extensions::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, ev: HostEvent) {
        let n = self.events.publish(&ev);
        debug!("host: {:?} delivered to {} listener(s)", ev, n);
    }

    // ----- user actions -----

    /// Load a new tree (replaces the original structure) and raise `loaded`.
    pub fn load(&self, newick: &str) -> Result<()> {
        let tree = Tree::parse_newick(newick).context("load tree")?;
        let root = tree
            .root()
            .map(|n| n.id.clone())
            .ok_or_else(|| anyhow!("load tree: empty tree"))?;
        {
            let mut st = self.lock();
            st.original = Some(Arc::new(tree.clone()));
            st.current = Some(tree);
            st.view_root = Some(root);
        }
        self.emit(HostEvent::Loaded);
        Ok(())
    }

    /// User picked another render mode. Raises `typechanged` if it differs.
    pub fn change_render_mode(&self, mode: impl Into<RenderMode>) -> Result<()> {
        let mode = mode.into();
        if !RENDER_MODES.contains(&mode.as_str()) {
            bail!("unknown render mode '{}'", mode);
        }
        self.switch_mode(mode, false);
        Ok(())
    }

    fn switch_mode(&self, mode: RenderMode, suppress_feedback: bool) {
        let changed = {
            let mut st = self.lock();
            st.mode_log.push((mode.clone(), suppress_feedback));
            let changed = st.render_mode != mode;
            st.render_mode = mode;
            changed
        };
        if changed && !suppress_feedback {
            self.emit(HostEvent::TypeChanged);
        }
    }

    /// User redraws the view from a node of the working tree; raises `subtree`.
    pub fn view_subtree(&self, id: &NodeId) -> Result<()> {
        {
            let mut st = self.lock();
            let cur = st.current.as_ref().ok_or_else(|| anyhow!("no tree loaded"))?;
            if cur.get(id).is_none() {
                bail!("no node '{}' in the current tree", id);
            }
            st.view_root = Some(id.clone());
        }
        self.emit(HostEvent::Subtree {
            node_id: id.clone(),
        });
        Ok(())
    }

    /// Collapse or expand a node of the working tree. No event is raised;
    /// the original structure is not affected.
    pub fn toggle_node_collapsed(&self, id: &NodeId) -> Result<bool> {
        let mut st = self.lock();
        let cur = st.current.as_mut().ok_or_else(|| anyhow!("no tree loaded"))?;
        cur.toggle_collapsed(id)
            .ok_or_else(|| anyhow!("no node '{}' in the current tree", id))
    }

    pub fn set_container(&self, dims: Dimensions) {
        self.lock().container = dims;
    }

    /// Fit the container. Extensions get the first chance; without one the
    /// surface takes the whole container.
    pub fn resize_to_container(&self) {
        if !self.extensions.dispatch_resize() {
            let dims = self.container_dimensions();
            self.apply_layout(&PanelLayout {
                panel_width: 0,
                content_width: dims.width,
                content_height: dims.height,
                margin: SurfaceMargin::Pixels(0),
            });
        }
        self.draw();
    }

    /// Make render_thumbnail() fail (simulates a surface that cannot be read back).
    pub fn set_thumbnail_failure(&self, on: bool) {
        self.lock().fail_thumbnails = on;
    }

    // ----- inspection -----

    pub fn events(&self) -> &Arc<EventBus<HostEvent>> {
        &self.events
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn last_layout(&self) -> Option<PanelLayout> {
        self.lock().layout
    }

    pub fn draw_count(&self) -> usize {
        self.lock().draws
    }

    /// Nodes passed to redraw_from(), oldest first.
    pub fn redraw_log(&self) -> Vec<NodeId> {
        self.lock().redraws.clone()
    }

    /// Every set_render_mode / change_render_mode call with its suppress flag.
    pub fn mode_log(&self) -> Vec<(RenderMode, bool)> {
        self.lock().mode_log.clone()
    }

    pub fn view_root(&self) -> Option<NodeId> {
        self.lock().view_root.clone()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.lock().render_mode.clone()
    }

    pub fn is_node_collapsed(&self, id: &NodeId) -> Option<bool> {
        self.lock().current.as_ref()?.get(id).map(|n| n.collapsed)
    }
}

fn render_svg(tree: &Tree, from: usize, mode: &RenderMode) -> String {
    let (leaves, collapsed) = tree.visible_summary(from);
    let root = tree.node_at(from).map(|n| n.id.as_str()).unwrap_or("");
    let collapsed: Vec<&str> = collapsed.iter().map(NodeId::as_str).collect();
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" data-mode=\"{}\" data-root=\"{}\" \
         data-leaves=\"{}\" data-collapsed=\"{}\"><text>{} @ {}</text></svg>",
        mode,
        root,
        leaves,
        collapsed.join(","),
        root,
        mode
    )
}

impl HostVisualization for MemoryHost {
    fn root_id(&self) -> Option<NodeId> {
        self.lock().view_root.clone()
    }

    fn current_render_mode(&self) -> RenderMode {
        self.lock().render_mode.clone()
    }

    fn render_thumbnail(&self) -> Result<Thumbnail> {
        let st = self.lock();
        if st.fail_thumbnails {
            bail!("surface is not readable");
        }
        let tree = st.current.as_ref().ok_or_else(|| anyhow!("nothing drawn yet"))?;
        let root = st
            .view_root
            .as_ref()
            .ok_or_else(|| anyhow!("nothing drawn yet"))?;
        let from = tree
            .index_of(root)
            .ok_or_else(|| anyhow!("view root '{}' is not in the tree", root))?;
        Ok(Thumbnail::svg(render_svg(tree, from, &st.render_mode)))
    }

    fn set_render_mode(&self, mode: &RenderMode, suppress_feedback: bool) {
        self.switch_mode(mode.clone(), suppress_feedback);
    }

    fn redraw_from(&self, node: &NodeRef) {
        {
            let mut st = self.lock();
            let Some(original) = st.original.clone() else {
                warn!("host: redraw_from({}) with no tree loaded", node.id);
                return;
            };
            match original.node_at(node.slot) {
                Some(n) if n.id == node.id => {}
                _ => {
                    warn!("host: redraw_from({}): reference does not belong to this tree", node.id);
                    return;
                }
            }
            // рабочая копия заново строится из исходной структуры
            st.current = Some((*original).clone());
            st.view_root = Some(node.id.clone());
            st.redraws.push(node.id.clone());
        }
        self.emit(HostEvent::Subtree {
            node_id: node.id.clone(),
        });
    }

    fn original_structure(&self) -> Arc<dyn NodeRegistry> {
        let tree = self.lock().original.clone();
        let tree: Arc<Tree> = tree.unwrap_or_else(|| Arc::new(Tree::empty()));
        tree
    }

    fn container_dimensions(&self) -> Dimensions {
        self.lock().container
    }

    fn apply_layout(&self, layout: &PanelLayout) {
        self.lock().layout = Some(*layout);
    }

    fn draw(&self) {
        self.lock().draws += 1;
    }
}
