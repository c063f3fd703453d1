//! Rip-up / re-place engine and overflow accounting.
//!
//! The cost-maintenance protocol is the heart of the pass: before a net
//! is touched, `del_cost` pins every edge it owns at cost 1.0, so the
//! net sees the environment without its own wires (and its own edges
//! read as nearly free, which encourages siblings to share track).
//! `add_cost` undoes one pin and recomputes the cached cost once the
//! last holder lets go. Every pass leaves all `used` counters at zero.

use crate::cost::CostModel;
use crate::decompose;
use crate::grid::{Edge, EdgeGrid};
use crate::patterns;
use gr_common::db::core::{IspdData, Net, RPoint, TwoPin};
use std::collections::HashSet;

/// Totals produced by one accounting pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverflowReport {
    pub total_overflow: i64,
    pub max_overflow: i32,
    pub wirelength: i64,
    pub overflow_nets: usize,
    pub overflow_twopins: usize,
}

pub struct RoutingEngine {
    pub grid: EdgeGrid,
    pub cost_model: CostModel,
    pub nets: Vec<Net>,
}

impl RoutingEngine {
    /// Aggregates the layered benchmark into the 2D grid, applies
    /// capacity adjustments, and decomposes the nets. Takes ownership
    /// of `data.nets`.
    pub fn new(data: &mut IspdData) -> Self {
        let w = data.num_x_grid as usize;
        let h = data.num_y_grid as usize;

        let avg = |v: &[i32]| {
            if v.is_empty() {
                0
            } else {
                v.iter().sum::<i32>() / v.len() as i32
            }
        };
        let min_net = (avg(&data.minimum_width) + avg(&data.minimum_spacing)).max(1);
        let vert_cap = data.vertical_capacity.iter().sum::<i32>() / min_net;
        let hori_cap = data.horizontal_capacity.iter().sum::<i32>() / min_net;
        let mut grid = EdgeGrid::new(w, h, Edge::new(vert_cap), Edge::new(hori_cap));

        for adj in &data.capacity_adjs {
            let (x1, y1, z1) = adj.grid1;
            let (x2, y2, z2) = adj.grid2;
            if z1 != z2 {
                continue;
            }
            let z = (z1 - 1) as usize;
            let (lx, rx) = (x1.min(x2), x1.max(x2));
            let (ly, ry) = (y1.min(y2), y1.max(y2));
            if (rx - lx) + (ry - ly) != 1 {
                continue;
            }
            let hori = rx - lx == 1;
            let caps = if hori {
                &data.horizontal_capacity
            } else {
                &data.vertical_capacity
            };
            let Some(&layer_cap) = caps.get(z) else {
                continue;
            };
            if lx < 0
                || ly < 0
                || (hori && (rx >= w as i32 || ly >= h as i32))
                || (!hori && (lx >= w as i32 || ry >= h as i32))
            {
                continue;
            }
            let reduce = (layer_cap - adj.reduced) / min_net;
            let e = grid.at_mut(lx, ly, hori);
            e.cap = (e.cap - reduce).max(0);
        }

        decompose::decompose(data);
        let nets = std::mem::take(&mut data.nets);

        log::info!(
            "grid {}x{} (v-cap {}, h-cap {}), {} nets after decomposition",
            w,
            h,
            vert_cap,
            hori_cap,
            nets.len()
        );

        Self {
            grid,
            cost_model: CostModel::new(0),
            nets,
        }
    }

    pub fn into_nets(self) -> Vec<Net> {
        self.nets
    }

    pub fn set_selcost(&mut self, selcost: usize) {
        self.cost_model.set_selcost(selcost);
    }

    pub fn build_cost(&mut self) {
        self.cost_model.build_cost(&mut self.grid);
    }

    /// Initial pass: route every two-pin with the L pattern under the
    /// running cost cache, cheapest-to-blame order.
    pub fn preroute(&mut self) {
        self.sort_for_ripup();
        self.build_cost();
        for net in self.nets.iter_mut() {
            for tp in net.two_pins.iter_mut() {
                patterns::lshape(tp, |x, y, hori| self.grid.at(x, y, hori).cost);
                Self::place(&mut self.grid, tp);
                Self::del_cost_path(&mut self.grid, &tp.path);
            }
            for tp in &net.two_pins {
                Self::add_cost_path(&mut self.grid, &self.cost_model, &tp.path);
            }
        }
    }

    /// One rip-up pass: overflowed two-pins are released and re-routed
    /// by `route` in score order, everything else stays put.
    pub fn ripup_place<F>(&mut self, route: F)
    where
        F: Fn(&mut TwoPin, &EdgeGrid),
    {
        self.mark_overflow();
        self.sort_for_ripup();
        for net in self.nets.iter_mut() {
            for tp in &net.two_pins {
                Self::del_cost_path(&mut self.grid, &tp.path);
            }
            for tp in net.two_pins.iter_mut() {
                if tp.overflow {
                    Self::rip(&mut self.grid, &self.cost_model, tp);
                }
            }
            for tp in net.two_pins.iter_mut() {
                if !tp.ripped {
                    continue;
                }
                route(tp, &self.grid);
                Self::place(&mut self.grid, tp);
                Self::del_cost_path(&mut self.grid, &tp.path);
            }
            for tp in &net.two_pins {
                Self::add_cost_path(&mut self.grid, &self.cost_model, &tp.path);
            }
        }
    }

    /// Wirelength-refine pass: every two-pin gets a speculative
    /// re-route; the candidate is adopted only if it is strictly
    /// shorter and every edge it newly touches still has slack.
    pub fn ripup_place_wl<F>(&mut self, route: F)
    where
        F: Fn(&mut TwoPin, &EdgeGrid),
    {
        self.mark_overflow();
        self.sort_for_ripup();
        for net in self.nets.iter_mut() {
            for tp in &net.two_pins {
                Self::del_cost_path(&mut self.grid, &tp.path);
            }
            for tp in net.two_pins.iter_mut() {
                if tp.path.len() < 2 {
                    continue;
                }
                let mut cand = TwoPin::new(tp.from, tp.to);
                route(&mut cand, &self.grid);
                if cand.path.len() >= tp.path.len() {
                    continue;
                }
                let old: HashSet<RPoint> = tp.path.iter().copied().collect();
                let would_overflow = cand.path.iter().any(|rp| {
                    if old.contains(rp) {
                        return false;
                    }
                    let e = self.grid.at_rp(*rp);
                    e.demand >= e.cap
                });
                if would_overflow {
                    continue;
                }
                Self::rip(&mut self.grid, &self.cost_model, tp);
                tp.path = cand.path;
                Self::place(&mut self.grid, tp);
                Self::del_cost_path(&mut self.grid, &tp.path);
            }
            for tp in &net.two_pins {
                Self::add_cost_path(&mut self.grid, &self.cost_model, &tp.path);
            }
        }
    }

    /// Flags every two-pin owning at least one overflowed edge.
    fn mark_overflow(&mut self) {
        for net in self.nets.iter_mut() {
            for tp in net.two_pins.iter_mut() {
                tp.overflow = tp.path.iter().any(|rp| self.grid.at_rp(*rp).overflow());
            }
        }
    }

    /// Nets by descending score; inside each net, two-pins by ascending
    /// score with the smaller half-perimeter first on ties. Order is
    /// fixed for the duration of the pass.
    fn sort_for_ripup(&mut self) {
        let sel = self.cost_model.selcost();
        self.nets
            .sort_by(|a, b| net_score(b).total_cmp(&net_score(a)));
        for net in self.nets.iter_mut() {
            net.two_pins.sort_by(|a, b| {
                twopin_score(a, sel)
                    .total_cmp(&twopin_score(b, sel))
                    .then_with(|| a.hpwl().cmp(&b.hpwl()))
            });
        }
    }

    /// Adds the path to the grid. Placing onto an edge that is already
    /// past capacity records one overflow event for the history term.
    fn place(grid: &mut EdgeGrid, tp: &mut TwoPin) {
        for rp in &tp.path {
            let e = grid.at_rp_mut(*rp);
            e.demand += 1;
            if e.demand > e.cap {
                e.of += 1;
            }
        }
        tp.ripped = false;
    }

    /// Removes the path's demand and unlocks its edges. The stale path
    /// is kept so the next router can see where it overflowed.
    fn rip(grid: &mut EdgeGrid, cm: &CostModel, tp: &mut TwoPin) {
        for rp in &tp.path {
            grid.at_rp_mut(*rp).demand -= 1;
        }
        Self::add_cost_path(grid, cm, &tp.path);
        tp.reroute += 1;
        tp.ripped = true;
    }

    fn del_cost_path(grid: &mut EdgeGrid, path: &[RPoint]) {
        for rp in path {
            let e = grid.at_rp_mut(*rp);
            e.used += 1;
            e.cost = 1.0;
        }
    }

    fn add_cost_path(grid: &mut EdgeGrid, cm: &CostModel, path: &[RPoint]) {
        for rp in path {
            let e = grid.at_rp_mut(*rp);
            e.used -= 1;
            if e.used == 0 {
                e.cost = cm.calc_cost(e);
            }
        }
    }

    /// Overflow accounting: folds accumulated overflow events into the
    /// history term, totals edge overflow, and refreshes the per-net
    /// and per-two-pin statistics that drive the next sort.
    pub fn check_overflow(&mut self) -> OverflowReport {
        let mut report = OverflowReport::default();

        for e in self.grid.edges_mut() {
            e.he += e.of;
            e.of = 0;
            let of = e.demand - e.cap;
            if of > 0 {
                report.total_overflow += of as i64;
                report.max_overflow = report.max_overflow.max(of);
            }
        }

        for net in self.nets.iter_mut() {
            net.overflow = 0;
            net.overflow_twopin = 0;
            net.wlen = 0;
            net.cost = 0.0;
            for tp in net.two_pins.iter_mut() {
                let mut tp_overflow = false;
                for rp in &tp.path {
                    let e = self.grid.at_rp_mut(*rp);
                    e.used += 1;
                    if e.used == 1 {
                        net.wlen += 1;
                        if e.overflow() {
                            net.overflow += 1;
                            net.cost += e.cost;
                        }
                    }
                    if e.overflow() {
                        tp_overflow = true;
                    }
                }
                tp.overflow = tp_overflow;
                if tp_overflow {
                    net.overflow_twopin += 1;
                    report.overflow_twopins += 1;
                }
            }
            for tp in &net.two_pins {
                for rp in &tp.path {
                    self.grid.at_rp_mut(*rp).used -= 1;
                }
            }
            report.wirelength += net.wlen as i64;
            if net.overflow > 0 {
                report.overflow_nets += 1;
            }
        }

        report
    }

    /// Per-edge demand / capacity ratios for the congestion map, one
    /// plane per direction in grid storage order.
    pub fn utilization(&self) -> (Vec<f32>, Vec<f32>) {
        let ratio = |e: &Edge| {
            if e.cap <= 0 {
                if e.demand > 0 { 2.0 } else { 0.0 }
            } else {
                e.demand as f32 / e.cap as f32
            }
        };
        let (v, h) = self.grid.planes();
        (
            v.iter().map(ratio).collect(),
            h.iter().map(ratio).collect(),
        )
    }
}

fn net_score(net: &Net) -> f64 {
    10.0 * net.overflow as f64 + net.overflow_twopin as f64 + 3.0 * net.cost.max(1.0).log2()
}

fn twopin_score(tp: &TwoPin, selcost: usize) -> f64 {
    let dx = (tp.from.x - tp.to.x).abs() as f64;
    let dy = (tp.from.y - tp.to.y).abs() as f64;
    let of = if tp.overflow { 60.0 } else { 0.0 };
    match selcost {
        2 => of + tp.path.len() as f64,
        1 => of + (1.0 + dx) * (1.0 + dy),
        _ => 100.0 / (1.0 + dx).max(1.0 + dy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns;
    use gr_common::db::core::Point;

    fn small_data() -> IspdData {
        IspdData {
            num_x_grid: 3,
            num_y_grid: 2,
            num_layer: 1,
            vertical_capacity: vec![10],
            horizontal_capacity: vec![20],
            minimum_width: vec![1],
            minimum_spacing: vec![1],
            via_spacing: vec![1],
            tile_width: 10,
            tile_height: 10,
            num_net: 1,
            nets: vec![Net {
                name: "net0".to_string(),
                num_pins: 2,
                pins: vec![Point::new(0, 0, 1), Point::new(20, 10, 1)],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn capacities_aggregate_into_planes() {
        // min_net = avg(width) + avg(spacing) = 2, so the summed layer
        // capacities are halved.
        let mut data = small_data();
        let engine = RoutingEngine::new(&mut data);
        assert_eq!(engine.grid.at(0, 0, false).cap, 5);
        assert_eq!(engine.grid.at(0, 0, true).cap, 10);
    }

    #[test]
    fn capacity_adjustments_reduce_edges() {
        let mut data = small_data();
        data.minimum_spacing = vec![0];
        // reduce the horizontal edge (0,0)-(1,0) down to level 4
        data.capacity_adjs.push(gr_common::db::core::CapacityAdj {
            grid1: (0, 0, 1),
            grid2: (1, 0, 1),
            reduced: 4,
        });
        let engine = RoutingEngine::new(&mut data);
        assert_eq!(engine.grid.at(0, 0, true).cap, 4);
        // cross-layer and diagonal entries are ignored
        let mut data = small_data();
        data.capacity_adjs.push(gr_common::db::core::CapacityAdj {
            grid1: (0, 0, 1),
            grid2: (1, 1, 1),
            reduced: 0,
        });
        let engine = RoutingEngine::new(&mut data);
        assert_eq!(engine.grid.at(0, 0, true).cap, 10);
    }

    #[test]
    fn preroute_places_full_demand() {
        let mut data = small_data();
        let mut engine = RoutingEngine::new(&mut data);
        engine.preroute();
        let report = engine.check_overflow();
        assert_eq!(report.total_overflow, 0);
        assert_eq!(report.wirelength, 3); // |dx| + |dy| for an L
        let tp = &engine.nets[0].two_pins[0];
        assert_eq!(tp.path.len(), 3);
        for rp in &tp.path {
            assert_eq!(engine.grid.at_rp(*rp).demand, 1);
        }
    }

    #[test]
    fn used_counters_balance_after_passes() {
        let mut data = small_data();
        let mut engine = RoutingEngine::new(&mut data);
        engine.preroute();
        engine.check_overflow();
        engine.ripup_place(|tp, grid| {
            patterns::monotonic(tp, |x, y, hori| grid.at(x, y, hori).cost)
        });
        engine.check_overflow();
        engine.ripup_place_wl(|tp, grid| {
            patterns::monotonic(tp, |x, y, hori| grid.at(x, y, hori).cost)
        });
        for e in engine.grid.edges() {
            assert_eq!(e.used, 0);
        }
    }

    #[test]
    fn demand_matches_placed_paths() {
        let mut data = small_data();
        let mut engine = RoutingEngine::new(&mut data);
        engine.preroute();
        engine.check_overflow();
        engine.ripup_place(|tp, grid| {
            patterns::zshape(tp, |x, y, hori| grid.at(x, y, hori).cost)
        });

        let mut expected: std::collections::HashMap<RPoint, i32> =
            std::collections::HashMap::new();
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
        for y in 0..engine.grid.height() as i32 {
            for x in 0..engine.grid.width() as i32 {
                if y + 1 < engine.grid.height() as i32 {
                    let rp = RPoint::new(x, y, false);
                    assert_eq!(
                        engine.grid.at_rp(rp).demand,
                        expected.get(&rp).copied().unwrap_or(0)
                    );
                }
                if x + 1 < engine.grid.width() as i32 {
                    let rp = RPoint::new(x, y, true);
                    assert_eq!(
                        engine.grid.at_rp(rp).demand,
                        expected.get(&rp).copied().unwrap_or(0)
                    );
                }
            }
        }
    }

    fn unit_lshape(tp: &mut TwoPin, _grid: &EdgeGrid) {
        patterns::lshape(tp, patterns::unit_cost);
    }

    #[test]
    fn ripup_is_idempotent_on_a_grid_with_slack() {
        // With slack nothing overflows, so no two-pin is ever ripped
        // and repeated passes must leave every path untouched.
        let mut data = small_data();
        let mut engine = RoutingEngine::new(&mut data);
        engine.preroute();
        engine.check_overflow();
        engine.ripup_place(unit_lshape);
        engine.check_overflow();
        let paths: Vec<Vec<RPoint>> = engine.nets[0]
            .two_pins
            .iter()
            .map(|tp| tp.path.clone())
            .collect();
        engine.ripup_place(unit_lshape);
        engine.check_overflow();
        let paths2: Vec<Vec<RPoint>> = engine.nets[0]
            .two_pins
            .iter()
            .map(|tp| tp.path.clone())
            .collect();
        assert_eq!(paths, paths2);
    }

    #[test]
    fn history_never_decreases() {
        let mut data = small_data();
        // Starve the grid so the single net overflows its edges.
        data.vertical_capacity = vec![0];
        data.horizontal_capacity = vec![0];
        data.minimum_spacing = vec![0];
        let mut engine = RoutingEngine::new(&mut data);
        engine.preroute();
        let mut before: Vec<i32> = engine.grid.edges().iter().map(|e| e.he).collect();
        engine.check_overflow();
        for _ in 0..3 {
            engine.ripup_place(|tp, grid| {
                patterns::monotonic(tp, |x, y, hori| grid.at(x, y, hori).cost)
            });
            engine.check_overflow();
            let after: Vec<i32> = engine.grid.edges().iter().map(|e| e.he).collect();
            for (b, a) in before.iter().zip(after.iter()) {
                assert!(a >= b);
            }
            assert!(after.iter().sum::<i32>() > before.iter().sum::<i32>());
            before = after;
        }
    }

    #[test]
    fn refine_never_creates_overflow() {
        // Tight grid: one horizontal track, so any refinement that
        // moved a wire onto a full edge would overflow it.
        let mut data = small_data();
        data.horizontal_capacity = vec![2];
        data.minimum_spacing = vec![0];
        let mut engine = RoutingEngine::new(&mut data);
        engine.preroute();
        let before = engine.check_overflow();
        engine.ripup_place_wl(|tp, grid| {
            patterns::monotonic(tp, |x, y, hori| grid.at(x, y, hori).cost)
        });
        let after = engine.check_overflow();
        assert!(after.total_overflow <= before.total_overflow);
        assert!(after.wirelength <= before.wirelength);
    }
}
