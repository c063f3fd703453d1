//! L-shape, Z-shape, and monotonic pattern search.
//!
//! Each router rewrites `tp.path` with a Manhattan walk from `tp.from`
//! to `tp.to`, judged by a cost oracle `(x, y, hori) -> f64` over
//! canonical edges. Exact ties fall to a coin flip so parallel wires do
//! not all pile onto the same track.

use gr_common::db::core::{Point, RPoint, TwoPin};
use gr_common::util::rng;

/// Oracle for callers that just want shortest paths.
pub fn unit_cost(_x: i32, _y: i32, _hori: bool) -> f64 {
    1.0
}

/// Axis-aligned tile range `[l, r] x [b, u]`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Bounds {
    pub l: i32,
    pub r: i32,
    pub b: i32,
    pub u: i32,
}

impl Bounds {
    pub fn around(f: Point, t: Point) -> Self {
        Self {
            l: f.x.min(t.x),
            r: f.x.max(t.x),
            b: f.y.min(t.y),
            u: f.y.max(t.y),
        }
    }

    pub fn width(&self) -> usize {
        (self.r - self.l + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.u - self.b + 1) as usize
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct CellData {
    pub cost: f64,
    pub from: Option<(i32, i32)>,
}

impl Default for CellData {
    fn default() -> Self {
        Self {
            cost: f64::INFINITY,
            from: None,
        }
    }
}

/// Per-tile DP table over a bounding box, column-major like the grid.
#[derive(Clone)]
pub(crate) struct BoxCost {
    pub bounds: Bounds,
    cells: Vec<CellData>,
}

impl BoxCost {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            cells: vec![CellData::default(); bounds.area()],
        }
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> usize {
        debug_assert!(x >= self.bounds.l && x <= self.bounds.r);
        debug_assert!(y >= self.bounds.b && y <= self.bounds.u);
        (x - self.bounds.l) as usize * self.bounds.height() + (y - self.bounds.b) as usize
    }

    #[inline]
    pub fn at(&self, x: i32, y: i32) -> &CellData {
        &self.cells[self.idx(x, y)]
    }

    #[inline]
    pub fn at_mut(&mut self, x: i32, y: i32) -> &mut CellData {
        let i = self.idx(x, y);
        &mut self.cells[i]
    }

    /// Follows predecessor links from `p`, emitting canonical edges.
    /// The step ceiling (box area) guards against malformed links.
    pub fn trace(&self, path: &mut Vec<RPoint>, mut p: (i32, i32)) {
        for _ in 0..self.bounds.area() {
            let Some(prev) = self.at(p.0, p.1).from else {
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
}

/// Relaxes one row of the table along x, from `bx` toward `ex`.
pub(crate) fn calc_x<F>(bc: &mut BoxCost, y: i32, bx: i32, ex: i32, cost: &F)
where
    F: Fn(i32, i32, bool) -> f64,
{
    let dx = (ex - bx).signum();
    if dx == 0 {
        return;
    }
    let mut pc = bc.at(bx, y).cost;
    let mut px = bx;
    let mut x = bx + dx;
    loop {
        let cc = pc + cost(x.min(px), y, true);
        let d = bc.at_mut(x, y);
        if d.cost <= cc {
            pc = d.cost;
        } else {
            pc = cc;
            d.cost = cc;
            d.from = Some((px, y));
        }
        if x == ex {
            break;
        }
        px = x;
        x += dx;
    }
}

/// Relaxes one column of the table along y, from `by` toward `ey`.
pub(crate) fn calc_y<F>(bc: &mut BoxCost, x: i32, by: i32, ey: i32, cost: &F)
where
    F: Fn(i32, i32, bool) -> f64,
{
    let dy = (ey - by).signum();
    if dy == 0 {
        return;
    }
    let mut pc = bc.at(x, by).cost;
    let mut py = by;
    let mut y = by + dy;
    loop {
        let cc = pc + cost(x, y.min(py), false);
        let d = bc.at_mut(x, y);
        if d.cost <= cc {
            pc = d.cost;
        } else {
            pc = cc;
            d.cost = cc;
            d.from = Some((x, py));
        }
        if y == ey {
            break;
        }
        py = y;
        y += dy;
    }
}

fn sum_x<F: Fn(i32, i32, bool) -> f64>(cost: &F, y: i32, a: i32, b: i32) -> f64 {
    let (l, r) = (a.min(b), a.max(b));
    (l..r).map(|x| cost(x, y, true)).sum()
}

fn sum_y<F: Fn(i32, i32, bool) -> f64>(cost: &F, x: i32, a: i32, b: i32) -> f64 {
    let (b0, u) = (a.min(b), a.max(b));
    (b0..u).map(|y| cost(x, y, false)).sum()
}

fn push_x(path: &mut Vec<RPoint>, y: i32, a: i32, b: i32) {
    let (l, r) = (a.min(b), a.max(b));
    for x in l..r {
        path.push(RPoint::new(x, y, true));
    }
}

fn push_y(path: &mut Vec<RPoint>, x: i32, a: i32, b: i32) {
    let (b0, u) = (a.min(b), a.max(b));
    for y in b0..u {
        path.push(RPoint::new(x, y, false));
    }
}

/// Routes through the cheaper of the two L corners.
pub fn lshape<F>(tp: &mut TwoPin, cost: F)
where
    F: Fn(i32, i32, bool) -> f64,
{
    let f = tp.from;
    let t = tp.to;
    let m1 = Point::new(f.x, t.y, f.z);
    let m2 = Point::new(t.x, f.y, f.z);

    let eval = |m: Point| {
        sum_x(&cost, f.y, f.x, m.x)
            + sum_y(&cost, m.x, f.y, m.y)
            + sum_x(&cost, t.y, m.x, t.x)
            + sum_y(&cost, m.x, m.y, t.y)
    };
    let c1 = eval(m1);
    let c2 = eval(m2);
    let m = if c1 != c2 {
        if c1 < c2 { m1 } else { m2 }
    } else if rng::coin() {
        m1
    } else {
        m2
    };

    tp.path.clear();
    push_x(&mut tp.path, f.y, f.x, m.x);
    push_y(&mut tp.path, m.x, f.y, m.y);
    push_x(&mut tp.path, t.y, m.x, t.x);
    push_y(&mut tp.path, m.x, m.y, t.y);
}

/// DP over the bounding box restricted to single-jog (Z) shapes: one
/// table sweeps horizontal-first, the other vertical-first, and the
/// cheaper terminal wins.
pub fn zshape<F>(tp: &mut TwoPin, cost: F)
where
    F: Fn(i32, i32, bool) -> f64,
{
    let (mut f, mut t) = (tp.from, tp.to);
    if f.y > t.y {
        std::mem::swap(&mut f, &mut t);
    }
    if f.x > t.x {
        std::mem::swap(&mut f, &mut t);
    }

    let mut box_h = BoxCost::new(Bounds::around(f, t));
    box_h.at_mut(f.x, f.y).cost = 0.0;
    let mut box_v = box_h.clone();

    let dx = (t.x - f.x).signum();
    let dy = (t.y - f.y).signum();

    calc_x(&mut box_h, f.y, f.x, t.x, &cost);
    if dx != 0 {
        let mut x = f.x + dx;
        loop {
            calc_y(&mut box_h, x, f.y, t.y, &cost);
            if x == t.x {
                break;
            }
            x += dx;
        }
    }
    calc_x(&mut box_h, t.y, f.x, t.x, &cost);

    calc_y(&mut box_v, f.x, f.y, t.y, &cost);
    if dy != 0 {
        let mut y = f.y + dy;
        loop {
            calc_x(&mut box_v, y, f.x, t.x, &cost);
            if y == t.y {
                break;
            }
            y += dy;
        }
    }
    calc_y(&mut box_v, t.x, f.y, t.y, &cost);

    let bc = if box_v.at(t.x, t.y).cost < box_h.at(t.x, t.y).cost {
        &box_v
    } else {
        &box_h
    };
    tp.path.clear();
    bc.trace(&mut tp.path, (t.x, t.y));
}

/// DP over the bounding box with every move strictly toward the
/// target, so the result is always exactly `|dx| + |dy|` edges long.
pub fn monotonic<F>(tp: &mut TwoPin, cost: F)
where
    F: Fn(i32, i32, bool) -> f64,
{
    let (mut f, mut t) = (tp.from, tp.to);
    if f.y > t.y {
        std::mem::swap(&mut f, &mut t);
    }
    if f.x > t.x {
        std::mem::swap(&mut f, &mut t);
    }

    let mut bc = BoxCost::new(Bounds::around(f, t));
    bc.at_mut(f.x, f.y).cost = 0.0;
    calc_x(&mut bc, f.y, f.x, t.x, &cost);
    calc_y(&mut bc, f.x, f.y, t.y, &cost);

    let dy = (t.y - f.y).signum();
    if dy != 0 {
        let mut py = f.y;
        let mut y = f.y + dy;
        loop {
            for x in (f.x + 1)..=t.x {
                let px = x - 1;
                let cx = bc.at(x, py).cost + cost(x, y.min(py), false);
                let cy = bc.at(px, y).cost + cost(px, y, true);
                let pick_x = if cx != cy { cx < cy } else { rng::coin() };
                let d = bc.at_mut(x, y);
                if pick_x {
                    d.cost = cx;
                    d.from = Some((x, py));
                } else {
                    d.cost = cy;
                    d.from = Some((px, y));
                }
            }
            if y == t.y {
                break;
            }
            py = y;
            y += dy;
        }
    }

    tp.path.clear();
    bc.trace(&mut tp.path, (t.x, t.y));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twopin(fx: i32, fy: i32, tx: i32, ty: i32) -> TwoPin {
        TwoPin::new(Point::new(fx, fy, 0), Point::new(tx, ty, 0))
    }

    #[test]
    fn lshape_is_manhattan_length() {
        let mut tp = twopin(0, 0, 2, 1);
        lshape(&mut tp, unit_cost);
        assert_eq!(tp.path.len(), 3);
    }

    #[test]
    fn lshape_avoids_expensive_corner() {
        // Make the vertical edge at (1, 0) expensive; the cheap L must
        // turn at the other corner.
        let mut tp = twopin(0, 0, 2, 2);
        let cost = |x: i32, y: i32, hori: bool| {
            if !hori && x == 1 && y == 0 {
                100.0
            } else {
                1.0
            }
        };
        lshape(&mut tp, cost);
        assert_eq!(tp.path.len(), 4);
        assert!(
            !tp.path
                .iter()
                .any(|e| !e.hori && e.x == 1 && e.y == 0)
        );
    }

    #[test]
    fn coincident_endpoints_leave_an_empty_path() {
        let mut tp = twopin(3, 3, 3, 3);
        lshape(&mut tp, unit_cost);
        assert!(tp.path.is_empty());
        monotonic(&mut tp, unit_cost);
        assert!(tp.path.is_empty());
        zshape(&mut tp, unit_cost);
        assert!(tp.path.is_empty());
    }

    #[test]
    fn zshape_is_manhattan_length() {
        let mut tp = twopin(0, 0, 2, 2);
        zshape(&mut tp, unit_cost);
        assert_eq!(tp.path.len(), 4);
    }

    #[test]
    fn zshape_jogs_away_from_expensive_row() {
        let mut tp = twopin(0, 0, 2, 2);
        let cost = |_x: i32, y: i32, hori: bool| {
            if hori && y == 0 {
                50.0
            } else {
                1.0
            }
        };
        zshape(&mut tp, cost);
        assert_eq!(tp.path.len(), 4);
        assert!(!tp.path.iter().any(|e| e.hori && e.y == 0));
    }

    #[test]
    fn monotonic_length_is_exact() {
        let mut tp = twopin(1, 0, 3, 2);
        monotonic(&mut tp, unit_cost);
        assert_eq!(tp.path.len(), 4);

        let mut tp = twopin(3, 5, 0, 1);
        monotonic(&mut tp, unit_cost);
        assert_eq!(tp.path.len(), 7);
    }

    #[test]
    fn monotonic_path_is_contiguous() {
        let mut tp = twopin(0, 0, 3, 3);
        monotonic(&mut tp, unit_cost);
        assert_eq!(tp.path.len(), 6);

        // The trace runs target -> source; rebuild tile positions and
        // check every hop is a single Manhattan step.
        let (mut cx, mut cy) = (tp.to.x, tp.to.y);
        let mut nodes = vec![(cx, cy)];
        for e in &tp.path {
            if e.hori {
                cx = if cx == e.x { e.x + 1 } else { e.x };
            } else {
                cy = if cy == e.y { e.y + 1 } else { e.y };
            }
            nodes.push((cx, cy));
        }
        for w in nodes.windows(2) {
            let md = (w[0].0 - w[1].0).abs() + (w[0].1 - w[1].1).abs();
            assert_eq!(md, 1);
        }
        assert_eq!(*nodes.last().unwrap(), (tp.from.x, tp.from.y));
    }

    #[test]
    fn monotonic_prefers_cheap_interior() {
        // Penalize the bottom row; the path should climb early.
        let mut tp = twopin(0, 0, 3, 3);
        let cost = |_x: i32, y: i32, hori: bool| {
            if hori && y == 0 {
                20.0
            } else {
                1.0
            }
        };
        monotonic(&mut tp, cost);
        assert_eq!(tp.path.len(), 6);
        assert!(!tp.path.iter().any(|e| e.hori && e.y == 0));
    }
}
