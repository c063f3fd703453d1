//! History-aware box-expanded DP search for stubborn two-pins.
//!
//! The search window is persistent per two-pin and grows between
//! reroutes, steered by where the current path overflows and by which
//! window sides have already proven useless. Inside the window, four
//! cost tables (last-move-vertical / last-move-horizontal, from each
//! endpoint) are filled by chained monotone sweeps over the cached
//! edge costs, and the path is stitched at the cheapest meeting tile.

use crate::grid::EdgeGrid;
use crate::patterns::{BoxCost, Bounds};
use gr_common::db::core::{RPoint, SearchBox, TwoPin};
use gr_common::util::rng;

/// Weight of the detour term in the boundary-learning estimate.
const ALPHA: f64 = 1.0;

/// Routes `tp` through the cached cost field of `grid`.
pub fn route(tp: &mut TwoPin, grid: &EdgeGrid) {
    let w = grid.width() as i32;
    let h = grid.height() as i32;

    let mut sbox = tp
        .bbox
        .take()
        .unwrap_or_else(|| SearchBox::new(tp.from, tp.to));
    expand(&mut sbox, tp, grid, w, h);

    let bounds = Bounds {
        l: sbox.l,
        r: sbox.r,
        b: sbox.b,
        u: sbox.u,
    };
    let fwd = populate(&bounds, (tp.from.x, tp.from.y), grid);
    let rev = populate(&bounds, (tp.to.x, tp.to.y), grid);

    let cf = |x: i32, y: i32| fwd.0.at(x, y).cost.min(fwd.1.at(x, y).cost);
    let ct = |x: i32, y: i32| rev.0.at(x, y).cost.min(rev.1.at(x, y).cost);

    // Cheapest meeting tile, first hit in (y, x) scan order on ties.
    let (mut mx, mut my) = (bounds.l, bounds.b);
    let mut mc = f64::INFINITY;
    for y in bounds.b..=bounds.u {
        for x in bounds.l..=bounds.r {
            let c = cf(x, y) + ct(x, y);
            if c < mc {
                mc = c;
                mx = x;
                my = y;
            }
        }
    }

    learn_boundaries(&mut sbox, tp, &bounds, mc, &cf, &ct);

    tp.path.clear();
    let mut to_source = Vec::new();
    trace_pair(&mut to_source, &fwd.0, &fwd.1, (mx, my));
    to_source.reverse();
    tp.path.append(&mut to_source);
    trace_pair(&mut tp.path, &rev.0, &rev.1, (mx, my));

    tp.bbox = Some(sbox);
}

/// Grows the window along the axis that needs it most. Overflow on
/// vertical edges asks for more horizontal room, and vice versa.
fn expand(sbox: &mut SearchBox, tp: &TwoPin, grid: &EdgeGrid, w: i32, h: i32) {
    let (mut cnt_v, mut cnt_h) = (0i32, 0i32);
    for rp in &tp.path {
        if grid.at_rp(*rp).overflow() {
            if rp.hori {
                cnt_h += 1;
            } else {
                cnt_v += 1;
            }
        }
    }

    let delta = if tp.reroute <= 2 {
        5
    } else if tp.reroute <= 6 {
        20
    } else {
        15
    };

    let mut expand_h = if cnt_v != cnt_h {
        cnt_v > cnt_h
    } else {
        rng::coin()
    };
    if sbox.width() >= w as usize {
        expand_h = false;
    }
    if sbox.height() >= h as usize {
        expand_h = true;
    }

    if expand_h {
        if sbox.exp_l {
            sbox.l = (sbox.l - delta).max(0);
        }
        if sbox.exp_r {
            sbox.r = (sbox.r + delta).min(w - 1);
        }
    } else {
        if sbox.exp_b {
            sbox.b = (sbox.b - delta).max(0);
        }
        if sbox.exp_u {
            sbox.u = (sbox.u + delta).min(h - 1);
        }
    }
}

/// Fills the last-move-vertical and last-move-horizontal tables from
/// `src`: first a row-by-row monotone extension away from the source
/// row, then a column-by-column extension away from the source column,
/// each line relaxed in both directions as it is reached.
fn populate(bounds: &Bounds, src: (i32, i32), grid: &EdgeGrid) -> (BoxCost, BoxCost) {
    let mut v = BoxCost::new(*bounds);
    let mut hb = BoxCost::new(*bounds);
    v.at_mut(src.0, src.1).cost = 0.0;
    hb.at_mut(src.0, src.1).cost = 0.0;

    relax_row(&v, &mut hb, src.1, bounds, grid);
    for y in (src.1 + 1)..=bounds.u {
        step_row(&mut v, &hb, y, y - 1, bounds, grid);
        relax_row(&v, &mut hb, y, bounds, grid);
    }
    for y in (bounds.b..src.1).rev() {
        step_row(&mut v, &hb, y, y + 1, bounds, grid);
        relax_row(&v, &mut hb, y, bounds, grid);
    }

    relax_col(&mut v, &hb, src.0, bounds, grid);
    for x in (src.0 + 1)..=bounds.r {
        step_col(&v, &mut hb, x, x - 1, bounds, grid);
        relax_col(&mut v, &hb, x, bounds, grid);
    }
    for x in (bounds.l..src.0).rev() {
        step_col(&v, &mut hb, x, x + 1, bounds, grid);
        relax_col(&mut v, &hb, x, bounds, grid);
    }

    (v, hb)
}

/// Enters row `y` vertically from row `py`.
fn step_row(v: &mut BoxCost, hb: &BoxCost, y: i32, py: i32, bounds: &Bounds, grid: &EdgeGrid) {
    let ey = y.min(py);
    for x in bounds.l..=bounds.r {
        let base = v.at(x, py).cost.min(hb.at(x, py).cost);
        let cand = base + grid.at(x, ey, false).cost;
        let d = v.at_mut(x, y);
        if cand < d.cost {
            d.cost = cand;
            d.from = Some((x, py));
        }
    }
}

/// Enters column `x` horizontally from column `px`.
fn step_col(v: &BoxCost, hb: &mut BoxCost, x: i32, px: i32, bounds: &Bounds, grid: &EdgeGrid) {
    let ex = x.min(px);
    for y in bounds.b..=bounds.u {
        let base = v.at(px, y).cost.min(hb.at(px, y).cost);
        let cand = base + grid.at(ex, y, true).cost;
        let d = hb.at_mut(x, y);
        if cand < d.cost {
            d.cost = cand;
            d.from = Some((px, y));
        }
    }
}

/// Relaxes horizontal moves within row `y`, left-to-right then
/// right-to-left.
fn relax_row(v: &BoxCost, hb: &mut BoxCost, y: i32, bounds: &Bounds, grid: &EdgeGrid) {
    if bounds.l == bounds.r {
        return;
    }
    for x in (bounds.l + 1)..=bounds.r {
        let px = x - 1;
        let base = v.at(px, y).cost.min(hb.at(px, y).cost);
        let cand = base + grid.at(px, y, true).cost;
        let d = hb.at_mut(x, y);
        if cand < d.cost {
            d.cost = cand;
            d.from = Some((px, y));
        }
    }
    for x in (bounds.l..bounds.r).rev() {
        let px = x + 1;
        let base = v.at(px, y).cost.min(hb.at(px, y).cost);
        let cand = base + grid.at(x, y, true).cost;
        let d = hb.at_mut(x, y);
        if cand < d.cost {
            d.cost = cand;
            d.from = Some((px, y));
        }
    }
}

/// Relaxes vertical moves within column `x`, bottom-up then top-down.
fn relax_col(v: &mut BoxCost, hb: &BoxCost, x: i32, bounds: &Bounds, grid: &EdgeGrid) {
    if bounds.b == bounds.u {
        return;
    }
    for y in (bounds.b + 1)..=bounds.u {
        let py = y - 1;
        let base = v.at(x, py).cost.min(hb.at(x, py).cost);
        let cand = base + grid.at(x, py, false).cost;
        let d = v.at_mut(x, y);
        if cand < d.cost {
            d.cost = cand;
            d.from = Some((x, py));
        }
    }
    for y in (bounds.b..bounds.u).rev() {
        let py = y + 1;
        let base = v.at(x, py).cost.min(hb.at(x, py).cost);
        let cand = base + grid.at(x, y, false).cost;
        let d = v.at_mut(x, y);
        if cand < d.cost {
            d.cost = cand;
            d.from = Some((x, py));
        }
    }
}

/// Disables expansion on sides that cannot beat the found minimum even
/// if the path were forced through them. The detour term keeps a
/// barely-worse boundary from holding the flag open forever.
fn learn_boundaries<CF, CT>(
    sbox: &mut SearchBox,
    tp: &TwoPin,
    bounds: &Bounds,
    mc: f64,
    cf: &CF,
    ct: &CT,
) where
    CF: Fn(i32, i32) -> f64,
    CT: Fn(i32, i32) -> f64,
{
    let direct = (tp.from.x - tp.to.x).abs() + (tp.from.y - tp.to.y).abs();
    let detour = |x: i32, y: i32| {
        let df = (x - tp.from.x).abs() + (y - tp.from.y).abs();
        let dt = (x - tp.to.x).abs() + (y - tp.to.y).abs();
        (df + dt - direct) as f64
    };
    let through = |x: i32, y: i32| cf(x, y) + ct(x, y) + ALPHA * detour(x, y);

    let mut best_l = f64::INFINITY;
    let mut best_r = f64::INFINITY;
    for y in bounds.b..=bounds.u {
        best_l = best_l.min(through(bounds.l, y));
        best_r = best_r.min(through(bounds.r, y));
    }
    let mut best_b = f64::INFINITY;
    let mut best_u = f64::INFINITY;
    for x in bounds.l..=bounds.r {
        best_b = best_b.min(through(x, bounds.b));
        best_u = best_u.min(through(x, bounds.u));
    }

    if best_l >= mc {
        sbox.exp_l = false;
    }
    if best_r >= mc {
        sbox.exp_r = false;
    }
    if best_b >= mc {
        sbox.exp_b = false;
    }
    if best_u >= mc {
        sbox.exp_u = false;
    }
}

/// Walks predecessor links from `start`, choosing at each tile the
/// cheaper of the two last-move tables. Costs strictly decrease along
/// the walk, so it ends at the zero-cost source.
fn trace_pair(path: &mut Vec<RPoint>, v: &BoxCost, hb: &BoxCost, start: (i32, i32)) {
    let limit = v.bounds.area();
    let mut p = start;
    for _ in 0..limit {
        let cv = v.at(p.0, p.1);
        let ch = hb.at(p.0, p.1);
        let cell = if cv.cost <= ch.cost { cv } else { ch };
        let Some(prev) = cell.from else {
            break;
        };
        let dx = (prev.0 - p.0).abs();
        let dy = (prev.1 - p.1).abs();
        if dx + dy != 1 {
            break;
        }
        if dx == 1 {
            path.push(RPoint::new(prev.0.min(p.0), p.1, true));
        } else {
            path.push(RPoint::new(p.0, prev.1.min(p.1), false));
        }
        p = prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostModel;
    use crate::grid::{Edge, EdgeGrid};
    use gr_common::db::core::Point;

    fn unit_grid(w: usize, h: usize) -> EdgeGrid {
        let mut g = EdgeGrid::new(w, h, Edge::new(100), Edge::new(100));
        for e in g.edges_mut() {
            e.cost = 1.0;
        }
        g
    }

    fn place(grid: &mut EdgeGrid, path: &[RPoint]) {
        for rp in path {
            grid.at_rp_mut(*rp).demand += 1;
        }
    }

    #[test]
    fn unit_costs_give_shortest_paths() {
        let mut g = unit_grid(8, 8);
        let mut tp = TwoPin::new(Point::new(1, 1, 0), Point::new(5, 4, 0));
        route(&mut tp, &mut g);
        assert_eq!(tp.path.len(), 7);
    }

    #[test]
    fn detours_around_blocked_corridor() {
        // 3x3 grid, capacity 1 everywhere, with the bottom row and
        // right column already fully loaded. The monotone corridor
        // overflows; the window search must find the clean one.
        let mut g = EdgeGrid::new(3, 3, Edge::new(1), Edge::new(1));
        let blocked = [
            RPoint::new(0, 0, true),
            RPoint::new(1, 0, true),
            RPoint::new(2, 0, false),
            RPoint::new(2, 1, false),
        ];
        place(&mut g, &blocked);
        let cm = CostModel::new(0);
        cm.build_cost(&mut g);

        let mut tp = TwoPin::new(Point::new(0, 0, 0), Point::new(2, 2, 0));
        route(&mut tp, &g);
        place(&mut g, &tp.path);

        assert!(!tp.path.is_empty());
        for rp in &tp.path {
            assert!(!g.at_rp(*rp).overflow(), "overflow at {:?}", rp);
        }
    }

    #[test]
    fn path_is_contiguous_from_source_to_target() {
        let mut g = unit_grid(6, 6);
        // make the direct corridor pricey so the path has to wiggle
        for y in 0..5 {
            g.at_mut(2, y, false).cost = 40.0;
        }
        let mut tp = TwoPin::new(Point::new(0, 0, 0), Point::new(4, 5, 0));
        route(&mut tp, &mut g);

        let (mut cx, mut cy) = (tp.from.x, tp.from.y);
        for e in &tp.path {
            if e.hori {
                cx = if cx == e.x { e.x + 1 } else { e.x };
            } else {
                cy = if cy == e.y { e.y + 1 } else { e.y };
            }
        }
        assert_eq!((cx, cy), (tp.to.x, tp.to.y));
    }

    #[test]
    fn window_grows_past_the_endpoint_box() {
        let mut g = unit_grid(40, 40);
        let mut tp = TwoPin::new(Point::new(15, 15, 0), Point::new(18, 18, 0));
        route(&mut tp, &mut g);
        // The endpoint bounding box is 4x4; the first call already
        // grows one axis by the base step on both sides.
        let b = tp.bbox.unwrap();
        assert!(b.width() * b.height() > 16);
        assert!(b.width() == 14 || b.height() == 14);
    }

    #[test]
    fn useless_boundaries_stop_expanding() {
        // On a uniform grid the optimum never sits on a grown border,
        // so after a few calls every flag should drop.
        let mut g = unit_grid(30, 30);
        let mut tp = TwoPin::new(Point::new(12, 12, 0), Point::new(15, 15, 0));
        for r in 0..6 {
            tp.reroute = r;
            route(&mut tp, &mut g);
        }
        let b = tp.bbox.unwrap();
        assert!(!b.exp_l && !b.exp_r && !b.exp_b && !b.exp_u);
    }
}
