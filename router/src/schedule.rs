//! Multi-phase routing schedule.
//!
//! Cheap pattern passes legalize the easy nets first, monotonic adds
//! cost-aware local detours, and the history-driven window search is
//! saved for the stubborn minority. Wirelength refinement only runs
//! once overflow is gone, and is not allowed to bring any back.

use crate::engine::{OverflowReport, RoutingEngine};
use crate::grid::EdgeGrid;
use crate::{hum, patterns};
use gr_common::db::core::TwoPin;
use gr_common::util::config::RoutingConfig;
use gr_common::util::profiler::ScopedTimer;
use std::sync::atomic::{AtomicBool, Ordering};

/// How a phase ended. `Converged` short-circuits the remaining
/// congestion phases; `Cancelled` ends the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    Converged,
    Plateau,
    Exhausted,
    Cancelled,
}

/// Scheduler hint from the embedder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Balanced,
    /// Let the congestion phases run longer before giving up.
    Congestion,
    /// Spend extra refine iterations once overflow is zero.
    Wirelength,
}

fn cached(grid: &EdgeGrid) -> impl Fn(i32, i32, bool) -> f64 + '_ {
    |x, y, hori| grid.at(x, y, hori).cost
}

/// Runs the full schedule. Returns the final phase outcome and the
/// last overflow report.
pub fn run(
    engine: &mut RoutingEngine,
    cfg: &RoutingConfig,
    mode: Mode,
    adaptive: bool,
    use_hum: bool,
    cancel: &AtomicBool,
) -> (PhaseOutcome, OverflowReport) {
    let sel = |profile: usize| {
        if adaptive {
            profile
        } else {
            cfg.fixed_stiffness.min(2)
        }
    };

    let (plateau, refine_iters) = match mode {
        Mode::Balanced => (cfg.plateau_window, cfg.refine_iterations),
        Mode::Congestion => (cfg.plateau_window * 2, cfg.refine_iterations),
        Mode::Wirelength => (cfg.plateau_window, cfg.refine_iterations * 2),
    };

    let timer = ScopedTimer::new("pre-route");
    engine.set_selcost(sel(0));
    engine.preroute();
    let mut report = engine.check_overflow();
    timer.stop();
    log::info!(
        "pre-route: overflow {} (max {}), wirelength {}",
        report.total_overflow,
        report.max_overflow,
        report.wirelength
    );

    let mut outcome = if report.total_overflow == 0 {
        PhaseOutcome::Converged
    } else {
        PhaseOutcome::Exhausted
    };

    if outcome != PhaseOutcome::Converged {
        outcome = routing(
            engine,
            "l-shape",
            cfg.lshape_iterations,
            sel(0),
            plateau,
            cancel,
            &mut report,
            |tp, grid| patterns::lshape(tp, cached(grid)),
        );
    }
    if outcome != PhaseOutcome::Converged && outcome != PhaseOutcome::Cancelled {
        outcome = routing(
            engine,
            "z-shape",
            cfg.zshape_iterations,
            sel(0),
            plateau,
            cancel,
            &mut report,
            |tp, grid| patterns::zshape(tp, cached(grid)),
        );
    }
    if outcome != PhaseOutcome::Converged && outcome != PhaseOutcome::Cancelled {
        outcome = routing(
            engine,
            "monotonic",
            cfg.monotonic_iterations,
            sel(1),
            plateau,
            cancel,
            &mut report,
            |tp, grid| patterns::monotonic(tp, cached(grid)),
        );
    }
    if outcome != PhaseOutcome::Converged && outcome != PhaseOutcome::Cancelled && use_hum {
        outcome = routing(
            engine,
            "hum",
            cfg.hum_iterations,
            sel(2),
            plateau,
            cancel,
            &mut report,
            hum::route,
        );
    }
    if outcome == PhaseOutcome::Cancelled {
        return (outcome, report);
    }

    if report.total_overflow == 0 {
        let refines: [(&'static str, fn(&mut TwoPin, &EdgeGrid)); 3] = [
            ("refine-monotonic", |tp, grid| {
                patterns::monotonic(tp, cached(grid))
            }),
            ("refine-z", |tp, grid| patterns::zshape(tp, cached(grid))),
            ("refine-l", |tp, grid| patterns::lshape(tp, cached(grid))),
        ];
        for (name, router) in refines {
            let r = routing_wl(engine, name, refine_iters, sel(0), cancel, &mut report, router);
            if r == PhaseOutcome::Cancelled {
                return (r, report);
            }
        }
    } else {
        log::warn!(
            "skipping wirelength refinement: {} overflow remains",
            report.total_overflow
        );
    }

    (outcome, report)
}

/// One congestion phase: rip-up passes until overflow hits zero, the
/// phase stops improving, the iteration limit is reached, or the
/// embedder cancels.
fn routing<F>(
    engine: &mut RoutingEngine,
    name: &'static str,
    iters: usize,
    selcost: usize,
    plateau: usize,
    cancel: &AtomicBool,
    report: &mut OverflowReport,
    route: F,
) -> PhaseOutcome
where
    F: Fn(&mut TwoPin, &EdgeGrid),
{
    if iters == 0 {
        return PhaseOutcome::Exhausted;
    }
    let _timer = ScopedTimer::new(name);
    engine.set_selcost(selcost);
    engine.build_cost();

    let mut best = i64::MAX;
    let mut stall = 0usize;
    for it in 1..=iters {
        if cancel.load(Ordering::Relaxed) {
            return PhaseOutcome::Cancelled;
        }
        engine.ripup_place(&route);
        *report = engine.check_overflow();
        log::info!(
            "[{}] iter {}: overflow {} (max {}), wirelength {}",
            name,
            it,
            report.total_overflow,
            report.max_overflow,
            report.wirelength
        );
        if report.total_overflow == 0 {
            log::info!("[{}] converged after {} iterations", name, it);
            return PhaseOutcome::Converged;
        }
        if report.total_overflow < best {
            best = report.total_overflow;
            stall = 0;
        } else {
            stall += 1;
            if stall >= plateau {
                log::info!("[{}] plateau after {} iterations", name, it);
                return PhaseOutcome::Plateau;
            }
        }
        if cancel.load(Ordering::Relaxed) {
            return PhaseOutcome::Cancelled;
        }
    }
    PhaseOutcome::Exhausted
}

/// One refinement phase. Aborts outright if total overflow ever rises,
/// which the acceptance rule is supposed to make impossible.
fn routing_wl<F>(
    engine: &mut RoutingEngine,
    name: &'static str,
    iters: usize,
    selcost: usize,
    cancel: &AtomicBool,
    report: &mut OverflowReport,
    route: F,
) -> PhaseOutcome
where
    F: Fn(&mut TwoPin, &EdgeGrid),
{
    if iters == 0 {
        return PhaseOutcome::Exhausted;
    }
    let _timer = ScopedTimer::new(name);
    engine.set_selcost(selcost);
    engine.build_cost();

    let baseline = report.total_overflow;
    for it in 1..=iters {
        if cancel.load(Ordering::Relaxed) {
            return PhaseOutcome::Cancelled;
        }
        engine.ripup_place_wl(&route);
        *report = engine.check_overflow();
        log::info!(
            "[{}] iter {}: overflow {}, wirelength {}",
            name,
            it,
            report.total_overflow,
            report.wirelength
        );
        if report.total_overflow > baseline {
            log::error!("[{}] refinement regressed overflow, aborting", name);
            return PhaseOutcome::Exhausted;
        }
    }
    PhaseOutcome::Exhausted
}
