//! Plugin entry point: create a history panel for a freshly built host.
//!
//! Порядок:
//! 1) разобрать опцию "history" (false => плагин выключен, None);
//! 2) создать контроллер и подписать его на события хоста;
//! 3) зарегистрировать его как расширение (resize-to-container);
//! 4) применить начальное состояние панели (collapse/expand, без historytoggle).

use anyhow::{Context, Result};
use log::info;
use serde_json::Value;
use std::sync::Arc;

use crate::config::HistoryConfig;
use crate::host::{Extensions, HostEventSource, HostExtension, HostVisualization};

use super::HistoryController;

/// Install from the widget options object. Ok(None) if the panel is disabled.
pub fn install(
    host: Arc<dyn HostVisualization>,
    events: &dyn HostEventSource,
    extensions: &Extensions,
    options: &Value,
) -> Result<Option<Arc<HistoryController>>> {
    let cfg = match HistoryConfig::from_options(options).context("history plugin options")? {
        Some(c) => c,
        None => {
            info!("history: disabled by options");
            return Ok(None);
        }
    };
    Ok(Some(install_with_config(host, events, extensions, &cfg)))
}

/// Install with an already validated configuration.
pub fn install_with_config(
    host: Arc<dyn HostVisualization>,
    events: &dyn HostEventSource,
    extensions: &Extensions,
    cfg: &HistoryConfig,
) -> Arc<HistoryController> {
    let ctrl = HistoryController::new(host, cfg);
    ctrl.attach(events);

    let ext: Arc<dyn HostExtension> = ctrl.clone();
    extensions.register(&ext);

    if cfg.collapsed {
        ctrl.collapse();
    } else {
        ctrl.expand();
    }
    info!("history: installed ({})", cfg);
    ctrl
}
