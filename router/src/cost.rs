//! Congestion cost model.
//!
//! Three stiffness profiles share one sigmoid penalty table; profile 2
//! additionally folds in per-edge history so chronically overflowed
//! edges keep getting more expensive across iterations.

use crate::grid::{Edge, EdgeGrid};
use rayon::prelude::*;

pub const COSTSZ: usize = 1024;
pub const COSTOFF: i32 = 256;

/// Cost of an edge with no remaining capacity.
pub const BLOCKED: f64 = 1e12;

pub struct CostModel {
    selcost: usize,
    pe: Vec<f64>,
}

impl CostModel {
    pub fn new(selcost: usize) -> Self {
        let mut cm = Self {
            selcost: selcost.min(2),
            pe: vec![0.0; COSTSZ],
        };
        cm.build_table();
        cm
    }

    pub fn selcost(&self) -> usize {
        self.selcost
    }

    pub fn set_selcost(&mut self, selcost: usize) {
        self.selcost = selcost.min(2);
        self.build_table();
    }

    fn build_table(&mut self) {
        let k = match self.selcost {
            0 => 0.3,
            1 => 0.5,
            _ => 0.7,
        };
        for (i, slot) in self.pe.iter_mut().enumerate() {
            let of = (i as i32 - COSTOFF) as f64;
            *slot = 1.0 + 200.0 / (1.0 + (-k * of).exp());
        }
    }

    #[inline]
    fn pe_at(&self, of: i32) -> f64 {
        let i = (of + COSTOFF).clamp(0, COSTSZ as i32 - 1);
        self.pe[i as usize]
    }

    /// Cost of placing one more wire on `e`. The `demand + 1` is the
    /// anticipated load, not the current overflow.
    pub fn calc_cost(&self, e: &Edge) -> f64 {
        if e.cap <= 0 {
            return BLOCKED;
        }
        let of = (e.demand + 1) - e.cap;
        let pe = self.pe_at(of);
        if self.selcost == 2 {
            let dah = (e.he as f64).powf(3.6) / 100.0;
            (1.0 + dah) * pe + 200.0
        } else {
            pe * 10.0 + 200.0
        }
    }

    /// Refreshes every cached edge cost. Must not run while any edge is
    /// cost-locked (`used > 0`) unless the caller means to flush locks.
    pub fn build_cost(&self, grid: &mut EdgeGrid) {
        grid.edges_mut()
            .par_iter_mut()
            .for_each(|e| e.cost = self.calc_cost(e));
    }
}
