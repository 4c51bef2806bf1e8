use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::json;

use PhyloHistory::demo::MemoryHost;
use PhyloHistory::subs::callback;
use PhyloHistory::{install, Dimensions, HistoryEvent, HistoryEventKind, SurfaceMargin};

#[test]
fn toggle_twice_round_trips_with_one_event_each() -> Result<()> {
    let host = MemoryHost::new(Dimensions::new(1000, 600));
    let ctrl = install(host.clone(), host.events(), host.extensions(), &json!({}))?
        .expect("enabled");

    let toggles = Arc::new(Mutex::new(Vec::new()));
    let t2 = toggles.clone();
    let _h = ctrl.subscribe(
        Some(HistoryEventKind::Toggle),
        callback(move |ev: &HistoryEvent| t2.lock().unwrap().push(ev.clone())),
    );

    let initial = ctrl.panel();
    assert!(initial.is_collapsed());

    let opened = ctrl.toggle();
    assert!(opened.is_open());
    assert_eq!(opened.width_px(), 200);
    assert_eq!(toggles.lock().unwrap().len(), 1);

    let closed = ctrl.toggle();
    assert_eq!(closed, initial);
    assert_eq!(
        *toggles.lock().unwrap(),
        vec![
            HistoryEvent::Toggled { is_open: true },
            HistoryEvent::Toggled { is_open: false },
        ]
    );
    Ok(())
}

#[test]
fn layout_follows_panel_state() -> Result<()> {
    let host = MemoryHost::new(Dimensions::new(1000, 600));
    let ctrl = install(host.clone(), host.events(), host.extensions(), &json!({"history": {}}))?
        .expect("enabled");

    // свернуто: полоска 25px, поверхность сдвинута ровно на неё
    let l = host.last_layout().expect("layout applied at install");
    assert_eq!(l.panel_width, 25);
    assert_eq!(l.content_width, 975);
    assert_eq!(l.content_height, 600);
    assert_eq!(l.margin, SurfaceMargin::Pixels(25));

    ctrl.toggle();
    let l = host.last_layout().expect("layout");
    assert_eq!((l.panel_width, l.content_width), (200, 800));
    assert_eq!(l.margin, SurfaceMargin::Percent(20.0));

    // контейнер изменился: хост отдаёт resize расширению
    host.set_container(Dimensions::new(1500, 900));
    host.resize_to_container();
    let l = host.last_layout().expect("layout");
    assert_eq!((l.panel_width, l.content_width, l.content_height), (300, 1200, 900));
    assert_eq!(ctrl.panel().width_px(), 300);
    Ok(())
}

#[test]
fn custom_geometry_from_options() -> Result<()> {
    let host = MemoryHost::new(Dimensions::new(800, 400));
    let ctrl = install(
        host.clone(),
        host.events(),
        host.extensions(),
        &json!({"history": {"collapsed": false, "width_fraction": 0.25, "collapsed_width": 40}}),
    )?
    .expect("enabled");

    assert_eq!(host.last_layout().map(|l| l.panel_width), Some(200));
    ctrl.collapse();
    assert_eq!(host.last_layout().map(|l| l.panel_width), Some(40));
    Ok(())
}

#[test]
fn dropped_controller_gives_resize_back_to_host() -> Result<()> {
    let host = MemoryHost::new(Dimensions::new(1000, 600));
    let ctrl = install(host.clone(), host.events(), host.extensions(), &json!({}))?
        .expect("enabled");
    assert_eq!(host.extensions().len(), 1);
    assert_eq!(host.events().len(), 3);

    drop(ctrl);
    assert!(host.extensions().is_empty());
    assert!(host.events().is_empty());

    host.resize_to_container();
    assert_eq!(host.last_layout().map(|l| l.panel_width), Some(0));
    Ok(())
}
