//! HistoryController: bridges host lifecycle events to the SnapshotStore and
//! handles user-initiated restoration.
//!
//! Event routing:
//! - loaded / typechanged -> capture (host root id, host render mode)
//! - subtree(node)        -> capture (node, host render mode)
//!
//! Restore:
//! - resolve node id through the host's ORIGINAL structure (not the current,
//!   possibly collapsed/edited one); missing -> StaleReference, host untouched;
//! - set_render_mode(mode, suppress_feedback = true), then redraw_from(node);
//! - host events raised while restoring are suppressed (no capture), after
//!   that the restored key is re-highlighted without fetching a thumbnail.
//!
//! Locking: the state mutex is never held across a call into the host, so the
//! host may raise events synchronously from any of its methods.

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::host::{HostEvent, HostEventKind, HostEventSource, HostExtension, HostVisualization};
use crate::key::SnapshotKey;
use crate::metrics;
use crate::panel::{PanelLayout, PanelState};
use crate::store::{Snapshot, SnapshotStore, StoreChange};
use crate::subs::{callback, Callback, EventBus, SubscriptionHandle, Topic};

mod plugin;

pub use plugin::{install, install_with_config};

/// Notifications emitted by the controller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// Store mutated (insert / highlight / clear).
    Store(StoreChange),
    /// `historytoggle`: panel opened or closed by a user toggle.
    Toggled { is_open: bool },
    /// Host was restored to `key`.
    Restored { key: SnapshotKey },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryEventKind {
    Store,
    Toggle,
    Restore,
}

impl Topic for HistoryEvent {
    type Kind = HistoryEventKind;

    fn kind(&self) -> HistoryEventKind {
        match self {
            HistoryEvent::Store(_) => HistoryEventKind::Store,
            HistoryEvent::Toggled { .. } => HistoryEventKind::Toggle,
            HistoryEvent::Restored { .. } => HistoryEventKind::Restore,
        }
    }
}

/// What a host event did to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Inserted(SnapshotKey),
    Highlighted(SnapshotKey),
    /// Event arrived while a restore was in flight.
    Suppressed,
}

struct HistoryState {
    store: SnapshotStore,
    panel: PanelState,
}

/// RAII-гард: поднимает флаг "restoring" на время restore() и
/// возвращает прежнее значение при выходе (в т.ч. по панике хоста).
struct RestoreGuard<'a> {
    flag: &'a AtomicBool,
    prev: bool,
}

impl<'a> RestoreGuard<'a> {
    fn begin(flag: &'a AtomicBool) -> Self {
        let prev = flag.swap(true, Ordering::SeqCst);
        Self { flag, prev }
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.prev, Ordering::SeqCst);
    }
}

pub struct HistoryController {
    host: Arc<dyn HostVisualization>,
    state: Mutex<HistoryState>,
    restoring: AtomicBool,
    bus: Arc<EventBus<HistoryEvent>>,
    listeners: Mutex<Vec<SubscriptionHandle>>,
}

impl std::fmt::Debug for HistoryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryController").finish_non_exhaustive()
    }
}

impl HistoryController {
    /// Build a detached controller. Use attach() (or install()) to start
    /// listening to host events.
    pub fn new(host: Arc<dyn HostVisualization>, config: &HistoryConfig) -> Arc<Self> {
        Arc::new(Self {
            host,
            state: Mutex::new(HistoryState {
                store: SnapshotStore::new(),
                panel: PanelState::new(config.collapsed, config.geometry()),
            }),
            restoring: AtomicBool::new(false),
            bus: EventBus::new(),
            listeners: Mutex::new(Vec::new()),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<SubscriptionHandle>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to loaded / subtree / typechanged on `events`.
    /// Callbacks hold a weak reference: the controller is not kept alive by
    /// the host, and its listeners go away when it is dropped.
    pub fn attach(self: &Arc<Self>, events: &dyn HostEventSource) {
        let mut handles = Vec::with_capacity(HostEventKind::ALL.len());
        for kind in HostEventKind::ALL {
            let weak: Weak<Self> = Arc::downgrade(self);
            let cb = callback(move |ev: &HostEvent| {
                if let Some(ctrl) = weak.upgrade() {
                    if let Err(e) = ctrl.on_host_event(ev) {
                        warn!("history: '{}' not captured: {:#}", ev.kind().name(), e);
                    }
                }
            });
            handles.push(events.add_listener(kind, cb));
        }
        self.lock_listeners().extend(handles);
        debug!("history: attached to host events");
    }

    /// Drop all host listeners. Returns how many were released.
    pub fn detach(&self) -> usize {
        let handles = std::mem::take(&mut *self.lock_listeners());
        handles.len()
    }

    pub fn is_attached(&self) -> bool {
        !self.lock_listeners().is_empty()
    }

    /// Entry point for host lifecycle events.
    pub fn on_host_event(&self, ev: &HostEvent) -> Result<CaptureOutcome> {
        if self.restoring.load(Ordering::SeqCst) {
            metrics::record_event_suppressed();
            debug!("history: '{}' suppressed during restore", ev.kind().name());
            return Ok(CaptureOutcome::Suppressed);
        }
        let node_id = match ev {
            HostEvent::Subtree { node_id } => node_id.clone(),
            HostEvent::Loaded | HostEvent::TypeChanged => {
                self.host.root_id().ok_or(HistoryError::NoTree)?
            }
        };
        let key = SnapshotKey::new(node_id, self.host.current_render_mode());
        self.capture(key)
    }

    /// Insert-or-highlight `key`. The host thumbnail is fetched only for a
    /// new key; on fetch failure nothing changes.
    pub fn capture(&self, key: SnapshotKey) -> Result<CaptureOutcome> {
        let width = {
            let mut st = self.lock_state();
            let hit = st.store.highlight(&key);
            if let Some(position) = hit {
                drop(st);
                metrics::record_highlight();
                self.bus.publish(&HistoryEvent::Store(StoreChange::Highlighted {
                    key: key.clone(),
                    position,
                }));
                return Ok(CaptureOutcome::Highlighted(key));
            }
            st.panel.width_px()
        };

        // Хост рисует миниатюру вне лока состояния.
        let thumbnail = match self.host.render_thumbnail() {
            Ok(t) => t,
            Err(e) => {
                metrics::record_capture_failure();
                return Err(HistoryError::CaptureFailed {
                    key,
                    source: e.into(),
                }
                .into());
            }
        };
        let bytes = thumbnail.len();

        let change = {
            let mut st = self.lock_state();
            let cap = st
                .store
                .capture_or_highlight(key.clone(), width, move || Ok(thumbnail))?;
            cap.change()
        };

        let outcome = match &change {
            StoreChange::Inserted { .. } => {
                metrics::record_capture(bytes);
                CaptureOutcome::Inserted(key)
            }
            _ => {
                metrics::record_highlight();
                CaptureOutcome::Highlighted(key)
            }
        };
        self.bus.publish(&HistoryEvent::Store(change));
        Ok(outcome)
    }

    /// Restore the host to the state captured under `key`.
    pub fn restore(&self, key: &SnapshotKey) -> Result<()> {
        let node = match self.host.original_structure().lookup(key.node_id()) {
            Some(n) => n,
            None => {
                metrics::record_restore_stale();
                warn!("history: cannot restore {}: node is gone from the original structure", key);
                return Err(HistoryError::StaleReference {
                    node_id: key.node_id().clone(),
                }
                .into());
            }
        };

        {
            let _guard = RestoreGuard::begin(&self.restoring);
            self.host.set_render_mode(key.render_mode(), true);
            self.host.redraw_from(&node);
        }
        metrics::record_restore();
        info!("history: restored {}", key);

        let hit = self.lock_state().store.highlight(key);
        if let Some(position) = hit {
            self.bus.publish(&HistoryEvent::Store(StoreChange::Highlighted {
                key: key.clone(),
                position,
            }));
        }
        self.bus.publish(&HistoryEvent::Restored { key: key.clone() });
        Ok(())
    }

    /// Restore by list position (what a click on a thumbnail resolves to).
    pub fn select(&self, position: usize) -> Result<()> {
        let key = self
            .lock_state()
            .store
            .as_slice()
            .get(position)
            .map(|s| s.key().clone())
            .ok_or_else(|| anyhow!("no snapshot at position {}", position))?;
        self.restore(&key)
    }

    /// Recompute the panel layout for the host container and apply it.
    pub fn request_resize(&self) -> PanelLayout {
        let dims = self.host.container_dimensions();
        let layout = {
            let mut st = self.lock_state();
            let l = st.panel.resize(dims.width, dims.height);
            st.panel = st.panel.with_width(l.panel_width);
            l
        };
        self.host.apply_layout(&layout);
        debug!(
            "history: layout panel={}px content={}x{} margin={}",
            layout.panel_width, layout.content_width, layout.content_height, layout.margin
        );
        layout
    }

    fn set_collapsed(&self, collapsed: bool) -> PanelLayout {
        {
            let mut st = self.lock_state();
            st.panel = st.panel.with_collapsed(collapsed);
        }
        let layout = self.request_resize();
        self.host.draw();
        layout
    }

    pub fn collapse(&self) -> PanelLayout {
        self.set_collapsed(true)
    }

    pub fn expand(&self) -> PanelLayout {
        self.set_collapsed(false)
    }

    /// User toggle: flips the panel and emits exactly one Toggled event.
    pub fn toggle(&self) -> PanelState {
        if self.is_collapsed() {
            self.expand();
        } else {
            self.collapse();
        }
        let panel = self.panel();
        metrics::record_toggle();
        info!("history: panel {}", if panel.is_open() { "opened" } else { "closed" });
        self.bus.publish(&HistoryEvent::Toggled {
            is_open: panel.is_open(),
        });
        panel
    }

    pub fn is_collapsed(&self) -> bool {
        self.lock_state().panel.is_collapsed()
    }

    pub fn panel(&self) -> PanelState {
        self.lock_state().panel
    }

    /// Drop every snapshot (e.g. unrelated tree reloaded).
    pub fn clear(&self) {
        let removed = {
            let mut st = self.lock_state();
            let n = st.store.len();
            st.store.clear();
            n
        };
        metrics::record_clear();
        debug!("history: cleared {} snapshot(s)", removed);
        self.bus.publish(&HistoryEvent::Store(StoreChange::Cleared { removed }));
    }

    /// Ordered copy of the list for rendering.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.lock_state().store.as_slice().to_vec()
    }

    /// Read access to the store without copying.
    pub fn with_store<R>(&self, f: impl FnOnce(&SnapshotStore) -> R) -> R {
        f(&self.lock_state().store)
    }

    pub fn current(&self) -> Option<SnapshotKey> {
        self.lock_state().store.current().map(|s| s.key().clone())
    }

    pub fn len(&self) -> usize {
        self.lock_state().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to history events (None = all kinds).
    pub fn subscribe(
        &self,
        kind: Option<HistoryEventKind>,
        cb: Callback<HistoryEvent>,
    ) -> SubscriptionHandle {
        self.bus.subscribe(kind, cb)
    }
}

impl HostExtension for HistoryController {
    fn name(&self) -> &str {
        "history"
    }

    fn on_resize_to_container(&self) -> bool {
        self.request_resize();
        true
    }
}

impl Drop for HistoryController {
    fn drop(&mut self) {
        let n = self.detach();
        if n > 0 {
            debug!("history: controller dropped, released {} listener(s)", n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{MemoryHost, DEFAULT_RENDER_MODE};
    use crate::host::Dimensions;
    use crate::key::NodeId;
    use crate::subs::callback;

    const TREE: &str = "((a,b)n1,(c,d)n5)root;";

    fn setup(collapsed: bool) -> (Arc<MemoryHost>, Arc<HistoryController>) {
        let host = MemoryHost::new(Dimensions::new(1000, 600));
        let cfg = HistoryConfig::default().with_collapsed(collapsed);
        let ctrl = HistoryController::new(host.clone(), &cfg);
        ctrl.attach(host.events());
        (host, ctrl)
    }

    #[test]
    fn restore_guard_restores_previous_flag() {
        let flag = AtomicBool::new(false);
        {
            let _g = RestoreGuard::begin(&flag);
            assert!(flag.load(Ordering::SeqCst));
            {
                let _inner = RestoreGuard::begin(&flag);
            }
            assert!(flag.load(Ordering::SeqCst), "inner guard must not clear outer");
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn events_suppressed_while_restoring() -> Result<()> {
        let (host, ctrl) = setup(true);
        host.load(TREE)?;
        {
            let _g = RestoreGuard::begin(&ctrl.restoring);
            let out = ctrl.on_host_event(&HostEvent::Subtree {
                node_id: NodeId::from("n1"),
            })?;
            assert_eq!(out, CaptureOutcome::Suppressed);
        }
        assert_eq!(ctrl.len(), 1);
        Ok(())
    }

    #[test]
    fn loaded_without_tree_is_no_tree_error() {
        let (_host, ctrl) = setup(true);
        let err = ctrl.on_host_event(&HostEvent::Loaded).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::NoTree)
        ));
        assert!(ctrl.is_empty());
    }

    #[test]
    fn capture_width_follows_panel() -> Result<()> {
        let (host, ctrl) = setup(false);
        ctrl.expand();
        host.load(TREE)?;
        let snaps = ctrl.snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].display_width_px(), 200);
        assert_eq!(
            snaps[0].key(),
            &SnapshotKey::new("root", DEFAULT_RENDER_MODE)
        );
        Ok(())
    }

    #[test]
    fn select_out_of_range_errors() -> Result<()> {
        let (host, ctrl) = setup(true);
        host.load(TREE)?;
        assert!(ctrl.select(7).is_err());
        ctrl.select(0)?;
        Ok(())
    }

    #[test]
    fn drop_releases_host_listeners() {
        let (host, ctrl) = setup(true);
        assert_eq!(host.events().len(), 3);
        drop(ctrl);
        assert!(host.events().is_empty());
    }

    #[test]
    fn subscribe_filters_kinds() -> Result<()> {
        let (host, ctrl) = setup(true);
        let toggles = Arc::new(Mutex::new(Vec::new()));
        let t2 = toggles.clone();
        let _h = ctrl.subscribe(
            Some(HistoryEventKind::Toggle),
            callback(move |ev: &HistoryEvent| t2.lock().unwrap().push(ev.clone())),
        );
        host.load(TREE)?;
        ctrl.toggle();
        assert_eq!(
            *toggles.lock().unwrap(),
            vec![HistoryEvent::Toggled { is_open: true }]
        );
        Ok(())
    }
}
