//! Post-route structural verification.
//!
//! Cheap enough to run after every benchmark route: cost locks must be
//! released, every demand unit must be explained by a live path, and
//! every path must be a contiguous Manhattan walk between its pins.

use crate::engine::RoutingEngine;
use gr_common::db::core::{Net, RPoint, TwoPin};
use rayon::prelude::*;
use std::collections::HashMap;

pub fn run(engine: &RoutingEngine) -> Result<(), String> {
    log::info!("Starting routing verification...");
    let mut msgs = Vec::new();

    match check_cost_locks(engine) {
        Ok(()) => log::info!("\x1b[32mPASS\x1b[0m: all cost locks released."),
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: {}", e);
            msgs.push(e);
        }
    }

    match check_demand(engine) {
        Ok(()) => log::info!("\x1b[32mPASS\x1b[0m: demand matches placed paths."),
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: {}", e);
            msgs.push(e);
        }
    }

    match check_continuity(&engine.nets) {
        Ok(()) => log::info!("\x1b[32mPASS\x1b[0m: all paths contiguous."),
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: {}", e);
            msgs.push(e);
        }
    }

    if msgs.is_empty() {
        log::info!("\x1b[32mPASS\x1b[0m: routing state is consistent.");
        Ok(())
    } else {
        Err(msgs.join("; "))
    }
}

fn check_cost_locks(engine: &RoutingEngine) -> Result<(), String> {
    let stuck = engine.grid.edges().iter().filter(|e| e.used != 0).count();
    if stuck > 0 {
        return Err(format!("{} edges still hold a cost lock", stuck));
    }
    Ok(())
}

fn check_demand(engine: &RoutingEngine) -> Result<(), String> {
    let mut expected: HashMap<RPoint, i32> = HashMap::new();
    for net in &engine.nets {
        for tp in &net.two_pins {
            if tp.ripped {
                continue;
            }
            for rp in &tp.path {
                *expected.entry(*rp).or_insert(0) += 1;
            }
        }
    }

    let w = engine.grid.width() as i32;
    let h = engine.grid.height() as i32;
    for y in 0..h {
        for x in 0..w {
            if y + 1 < h {
                let rp = RPoint::new(x, y, false);
                let want = expected.get(&rp).copied().unwrap_or(0);
                let got = engine.grid.at_rp(rp).demand;
                if got != want {
                    return Err(format!(
                        "vertical edge ({}, {}) demand {} but {} owning paths",
                        x, y, got, want
                    ));
                }
            }
            if x + 1 < w {
                let rp = RPoint::new(x, y, true);
                let want = expected.get(&rp).copied().unwrap_or(0);
                let got = engine.grid.at_rp(rp).demand;
                if got != want {
                    return Err(format!(
                        "horizontal edge ({}, {}) demand {} but {} owning paths",
                        x, y, got, want
                    ));
                }
            }
        }
    }
    Ok(())
}

fn check_continuity(nets: &[Net]) -> Result<(), String> {
    let bad = nets
        .par_iter()
        .flat_map(|net| {
            net.two_pins
                .par_iter()
                .filter_map(move |tp| twopin_gap(tp).map(|why| format!("{}: {}", net.name, why)))
        })
        .collect::<Vec<_>>();
    match bad.into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn endpoints(rp: &RPoint) -> [(i32, i32); 2] {
    if rp.hori {
        [(rp.x, rp.y), (rp.x + 1, rp.y)]
    } else {
        [(rp.x, rp.y), (rp.x, rp.y + 1)]
    }
}

fn twopin_gap(tp: &TwoPin) -> Option<String> {
    if tp.path.is_empty() {
        if (tp.from.x, tp.from.y) != (tp.to.x, tp.to.y) && !tp.ripped {
            return Some(format!(
                "unrouted two-pin ({},{}) -> ({},{})",
                tp.from.x, tp.from.y, tp.to.x, tp.to.y
            ));
        }
        return None;
    }

    for pair in tp.path.windows(2) {
        let a = endpoints(&pair[0]);
        let b = endpoints(&pair[1]);
        if !a.iter().any(|t| b.contains(t)) {
            return Some(format!(
                "path break between {:?} and {:?}",
                pair[0], pair[1]
            ));
        }
    }

    let touches = |p: (i32, i32)| tp.path.iter().any(|rp| endpoints(rp).contains(&p));
    if !touches((tp.from.x, tp.from.y)) || !touches((tp.to.x, tp.to.y)) {
        return Some(format!(
            "path misses a pin of ({},{}) -> ({},{})",
            tp.from.x, tp.from.y, tp.to.x, tp.to.y
        ));
    }
    None
}
