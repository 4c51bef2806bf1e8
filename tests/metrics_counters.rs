// Global counters: this binary holds a single test so the exact counts
// are not disturbed by other tests running in parallel.

use anyhow::Result;
use serde_json::json;

use PhyloHistory::demo::{MemoryHost, DEFAULT_RENDER_MODE};
use PhyloHistory::metrics::{self, MetricsSnapshot};
use PhyloHistory::{install, Dimensions, NodeId, SnapshotKey};

fn counts(m: &MetricsSnapshot) -> [u64; 8] {
    [
        m.captures_total,
        m.highlights_total,
        m.capture_failures,
        m.restores_total,
        m.restores_stale,
        m.events_suppressed,
        m.toggles_total,
        m.clears_total,
    ]
}

#[test]
fn session_counts_from_zero_and_reset_clears() -> Result<()> {
    metrics::reset();
    let zero = metrics::snapshot();
    assert_eq!(counts(&zero), [0; 8]);
    assert_eq!(zero.thumbnail_bytes, 0);

    let host = MemoryHost::new(Dimensions::new(1000, 600));
    let ctrl = install(host.clone(), host.events(), host.extensions(), &json!({}))?
        .expect("history enabled");

    host.load("((a,b)A,(c,d)B)root;")?;
    host.view_subtree(&NodeId::from("A"))?;
    host.view_subtree(&NodeId::from("A"))?;
    // restore: the host's own subtree event is swallowed
    ctrl.select(0)?;
    assert!(ctrl
        .restore(&SnapshotKey::new("gone", DEFAULT_RENDER_MODE))
        .is_err());
    host.set_thumbnail_failure(true);
    host.view_subtree(&NodeId::from("B"))?;
    ctrl.toggle();
    ctrl.clear();

    let m = metrics::snapshot();
    assert_eq!(counts(&m), [2, 1, 1, 1, 1, 1, 1, 1]);
    assert!(m.thumbnail_bytes > 0);
    assert!((m.dedup_ratio() - 1.0 / 3.0).abs() < 1e-9);

    metrics::reset();
    let after = metrics::snapshot();
    assert_eq!(counts(&after), [0; 8]);
    assert_eq!(after.thumbnail_bytes, 0);
    Ok(())
}
