use anyhow::{bail, Result};

use PhyloHistory::config::HistoryConfig;
use PhyloHistory::script::{run_script, Script};

use crate::util::read_text_arg;

pub fn exec(script_arg: &str, json: bool, strict: bool) -> Result<()> {
    let text = read_text_arg(script_arg)?;
    let script = Script::from_json(&text)?;
    let report = run_script(&script, HistoryConfig::from_env())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("history panel: {}", match report.panel_open {
            None => "disabled",
            Some(true) => "open",
            Some(false) => "collapsed",
        });
        if let Some(l) = &report.layout {
            println!(
                "layout: panel={}px content={}x{} margin={}",
                l.panel_width, l.content_width, l.content_height, l.margin
            );
        }
        println!(
            "view: root={} mode={}",
            report
                .view_root
                .as_ref()
                .map(|n| n.as_str())
                .unwrap_or("-"),
            report.render_mode
        );
        println!("snapshots: {}", report.snapshots.len());
        for (i, s) in report.snapshots.iter().enumerate() {
            println!(
                "  [{}]{} {} ({} B, {}px)",
                i,
                if s.is_current() { "*" } else { " " },
                s.key(),
                s.thumbnail().len(),
                s.display_width_px()
            );
        }
        for st in report.steps.iter().filter(|s| !s.is_ok()) {
            println!(
                "step {} ({}) failed: {}",
                st.index,
                st.op,
                st.error.as_deref().unwrap_or("")
            );
        }
        let m = &report.metrics;
        println!(
            "metrics: captures={} highlights={} failures={} restores={} stale={} suppressed={} dedup={:.2}",
            m.captures_total,
            m.highlights_total,
            m.capture_failures,
            m.restores_total,
            m.restores_stale,
            m.events_suppressed,
            m.dedup_ratio()
        );
    }

    if strict && report.failed_steps() > 0 {
        bail!("{} step(s) failed", report.failed_steps());
    }
    Ok(())
}
