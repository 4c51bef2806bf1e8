use std::collections::HashSet;

use anyhow::Result;
use oorandom::Rand64;

use PhyloHistory::demo::MemoryHost;
use PhyloHistory::{Dimensions, HistoryConfig, HistoryController, NodeId, SnapshotKey, SnapshotStore, Thumbnail};

const NODES: [&str; 6] = ["root", "A", "B", "X", "Z", "n5"];
const MODES: [&str; 3] = ["rectangular", "circular", "radial"];

fn check_invariants(store: &SnapshotStore) {
    let current = store.iter().filter(|s| s.is_current()).count();
    assert!(current <= 1, "more than one current snapshot");
    let keys: HashSet<_> = store.iter().map(|s| s.key().clone()).collect();
    assert_eq!(keys.len(), store.len(), "duplicate key in store");
    assert!(store.iter().zip(store.iter().skip(1)).all(|(a, b)| a.seq() < b.seq()));
}

#[test]
fn random_captures_keep_store_invariants() -> Result<()> {
    let mut rng = Rand64::new(0x5EED_C0FFEE);
    let mut store = SnapshotStore::new();
    // модель: порядок первых появлений ключей
    let mut model: Vec<SnapshotKey> = Vec::new();

    for step in 0..2000 {
        let dice = rng.rand_u64() % 20;
        if dice == 0 {
            store.clear();
            model.clear();
        } else {
            let node = NODES[(rng.rand_u64() as usize) % NODES.len()];
            let mode = MODES[(rng.rand_u64() as usize) % MODES.len()];
            let key = SnapshotKey::new(node, mode);
            let fail = rng.rand_u64() % 10 == 0;
            let before_current = store.current().map(|s| s.key().clone());

            let res = store.capture_or_highlight(key.clone(), 200, || {
                if fail {
                    anyhow::bail!("step {}: no surface", step)
                }
                Ok(Thumbnail::svg(format!("<svg>{}</svg>", key)))
            });
            let known = model.contains(&key);
            match res {
                Ok(cap) => {
                    assert_eq!(cap.inserted, !known);
                    if !known {
                        model.push(key.clone());
                    }
                }
                Err(_) => {
                    // промах по кэшу + ошибка => ничего не изменилось
                    assert!(!known && fail);
                    assert_eq!(store.current().map(|s| s.key().clone()), before_current);
                }
            }
            if !(fail && !known) {
                assert_eq!(store.current().map(|s| s.key()), Some(&key));
            }
        }
        check_invariants(&store);
        let order: Vec<_> = store.iter().map(|s| s.key().clone()).collect();
        assert_eq!(order, model);
    }
    Ok(())
}

#[test]
fn random_host_session_keeps_single_current() -> Result<()> {
    let host = MemoryHost::new(Dimensions::new(1000, 600));
    let ctrl = HistoryController::new(host.clone(), &HistoryConfig::default());
    ctrl.attach(host.events());
    host.load("(((x1,x2)X,y)A,((z1,z2)Z,w)B,(c,d)n5)root;")?;

    let mut rng = Rand64::new(42);
    for _ in 0..500 {
        match rng.rand_u64() % 4 {
            0 => {
                let node = NODES[(rng.rand_u64() as usize) % NODES.len()];
                host.view_subtree(&NodeId::from(node))?;
            }
            1 => {
                let mode = MODES[(rng.rand_u64() as usize) % MODES.len()];
                host.change_render_mode(mode)?;
            }
            2 => {
                let n = ctrl.len();
                if n > 0 {
                    ctrl.select((rng.rand_u64() as usize) % n)?;
                }
            }
            _ => {
                let _ = host.toggle_node_collapsed(&NodeId::from("X"))?;
            }
        }
        ctrl.with_store(check_invariants);
        assert!(ctrl.len() <= NODES.len() * MODES.len());
    }
    Ok(())
}
