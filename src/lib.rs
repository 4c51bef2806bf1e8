#![allow(non_snake_case)]

// Ядро истории
pub mod key;
pub mod error;
pub mod store;      // src/store/{mod,snapshot}.rs
pub mod panel;
pub mod controller; // src/controller/{mod,plugin}.rs

// Граница с хостом (виджет дерева)
pub mod host;       // src/host/{mod,extensions}.rs
pub mod subs;

// Окружение
pub mod config;
pub mod metrics;

// In-memory host + replay of scripted sessions (CLI, tests)
pub mod demo;       // src/demo/{mod,tree}.rs
pub mod script;

// Удобные реэкспорты
pub use config::HistoryConfig;
pub use controller::{
    install, install_with_config, CaptureOutcome, HistoryController, HistoryEvent, HistoryEventKind,
};
pub use error::{history_error, HistoryError};
pub use host::{
    Dimensions, Extensions, HostEvent, HostEventKind, HostEventSource, HostExtension,
    HostVisualization, NodeRef, NodeRegistry,
};
pub use key::{NodeId, RenderMode, SnapshotKey};
pub use panel::{PanelLayout, PanelState, SurfaceMargin};
pub use store::{Snapshot, SnapshotStore, StoreChange, Thumbnail};
