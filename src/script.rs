//! Scripted sessions: drive a MemoryHost with an installed history panel
//! through a list of user actions and report what the panel ended up with.
//!
//! Script (JSON):
//! {
//!   "container": { "width": 1000, "height": 600 },   // optional
//!   "options":   { "history": { "collapsed": false } }, // widget options, optional
//!   "actions": [
//!     { "op": "load", "tree": "((a,b)n1,(c,d)n5)root;" },
//!     { "op": "subtree", "node": "n5" },
//!     { "op": "mode", "mode": "circular" },
//!     { "op": "collapse-node", "node": "n1" },
//!     { "op": "restore", "node": "n5", "mode": "rectangular" },
//!     { "op": "select", "position": 0 },
//!     { "op": "toggle" },
//!     { "op": "clear" },
//!     { "op": "resize", "width": 1200, "height": 700 },
//!     { "op": "fail-thumbnails", "on": true }
//!   ]
//! }
//!
//! A failing step is recorded in the report and the run goes on.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::HistoryConfig;
use crate::controller::{install_with_config, HistoryController, HistoryEvent};
use crate::demo::MemoryHost;
use crate::host::Dimensions;
use crate::key::{NodeId, RenderMode, SnapshotKey};
use crate::metrics::{self, MetricsSnapshot};
use crate::panel::PanelLayout;
use crate::store::Snapshot;
use crate::subs::callback;

fn default_container() -> Dimensions {
    Dimensions::new(1000, 600)
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default = "default_container")]
    pub container: Dimensions,
    #[serde(default)]
    pub options: Value,
    pub actions: Vec<Action>,
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parse replay script")
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Action {
    Load { tree: String },
    Subtree { node: NodeId },
    Mode { mode: RenderMode },
    CollapseNode { node: NodeId },
    Restore { node: NodeId, mode: RenderMode },
    Select { position: usize },
    Toggle,
    Clear,
    Resize { width: u32, height: u32 },
    FailThumbnails { on: bool },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Load { .. } => "load",
            Action::Subtree { .. } => "subtree",
            Action::Mode { .. } => "mode",
            Action::CollapseNode { .. } => "collapse-node",
            Action::Restore { .. } => "restore",
            Action::Select { .. } => "select",
            Action::Toggle => "toggle",
            Action::Clear => "clear",
            Action::Resize { .. } => "resize",
            Action::FailThumbnails { .. } => "fail-thumbnails",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StepResult {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// False when the options disabled the history panel.
    pub enabled: bool,
    pub panel_open: Option<bool>,
    pub layout: Option<PanelLayout>,
    pub view_root: Option<NodeId>,
    pub render_mode: RenderMode,
    pub snapshots: Vec<Snapshot>,
    pub events: Vec<HistoryEvent>,
    pub steps: Vec<StepResult>,
    /// Counters accumulated during this run.
    pub metrics: MetricsSnapshot,
}

impl Report {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_ok()).count()
    }
}

/// Replay `script` with panel settings layered over `base`
/// (options in the script win). Invalid options abort the run.
pub fn run_script(script: &Script, base: HistoryConfig) -> Result<Report> {
    let before = metrics::snapshot();

    let host = MemoryHost::new(script.container);
    let cfg = base
        .merge_options(&script.options)
        .context("script options")?;
    let ctrl = cfg.map(|c| install_with_config(host.clone(), host.events(), host.extensions(), &c));

    let events = Arc::new(Mutex::new(Vec::new()));
    let _sub = ctrl.as_ref().map(|c| {
        let sink = events.clone();
        c.subscribe(
            None,
            callback(move |ev: &HistoryEvent| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(ev.clone())
            }),
        )
    });

    let mut steps = Vec::with_capacity(script.actions.len());
    for (index, action) in script.actions.iter().enumerate() {
        let error = match apply(&host, ctrl.as_ref(), action) {
            Ok(()) => None,
            Err(e) => {
                warn!("replay: step {} ({}) failed: {:#}", index, action.name(), e);
                Some(format!("{:#}", e))
            }
        };
        steps.push(StepResult {
            index,
            op: action.name(),
            error,
        });
    }

    let report = Report {
        enabled: ctrl.is_some(),
        panel_open: ctrl.as_ref().map(|c| c.panel().is_open()),
        layout: host.last_layout(),
        view_root: host.view_root(),
        render_mode: host.render_mode(),
        snapshots: ctrl.as_ref().map(|c| c.snapshots()).unwrap_or_default(),
        events: std::mem::take(&mut *events.lock().unwrap_or_else(PoisonError::into_inner)),
        steps,
        metrics: metrics::snapshot().delta(&before),
    };
    info!(
        "replay: {} step(s), {} failed, {} snapshot(s)",
        report.steps.len(),
        report.failed_steps(),
        report.snapshots.len()
    );
    Ok(report)
}

fn panel(ctrl: Option<&Arc<HistoryController>>) -> Result<&Arc<HistoryController>> {
    ctrl.ok_or_else(|| anyhow!("history panel is disabled"))
}

fn apply(host: &Arc<MemoryHost>, ctrl: Option<&Arc<HistoryController>>, action: &Action) -> Result<()> {
    match action {
        Action::Load { tree } => host.load(tree),
        Action::Subtree { node } => host.view_subtree(node),
        Action::Mode { mode } => host.change_render_mode(mode.clone()),
        Action::CollapseNode { node } => host.toggle_node_collapsed(node).map(|_| ()),
        Action::Restore { node, mode } => {
            panel(ctrl)?.restore(&SnapshotKey::new(node.clone(), mode.clone()))
        }
        Action::Select { position } => panel(ctrl)?.select(*position),
        Action::Toggle => panel(ctrl).map(|c| {
            c.toggle();
        }),
        Action::Clear => panel(ctrl).map(|c| c.clear()),
        Action::Resize { width, height } => {
            host.set_container(Dimensions::new(*width, *height));
            host.resize_to_container();
            Ok(())
        }
        Action::FailThumbnails { on } => {
            host.set_thumbnail_failure(*on);
            Ok(())
        }
    }
}
