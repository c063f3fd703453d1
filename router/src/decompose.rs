//! Net decomposition: layout pins to tiles, then a Prim spanning tree
//! over the distinct 2D pins, one two-pin per tree edge.

use gr_common::db::core::{IspdData, Point, TwoPin};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Nets with more distinct 3D pins than this are excluded outright.
const MAX_NET_PINS: usize = 1000;

/// Fills `pin2d`/`pin3d`/`two_pins` for every net and drops nets that
/// are pathological or have nothing to connect. Runs in place on
/// `data.nets`.
pub fn decompose(data: &mut IspdData) {
    let (llx, lly) = (data.lower_left_x, data.lower_left_y);
    let (tw, th) = (data.tile_width, data.tile_height);
    let before = data.nets.len();

    data.nets.retain_mut(|net| {
        net.pin3d.clear();
        net.pin2d.clear();
        net.two_pins.clear();
        for p in &net.pins {
            let x = (p.x - llx) / tw;
            let y = (p.y - lly) / th;
            if !net
                .pin3d
                .iter()
                .any(|q| q.x == x && q.y == y && q.z == p.z)
            {
                net.pin3d.push(Point::new(x, y, p.z));
            }
            if !net.pin2d.iter().any(|q| q.x == x && q.y == y) {
                net.pin2d.push(Point::new(x, y, p.z));
            }
        }
        if net.pin3d.len() > MAX_NET_PINS || net.pin2d.len() <= 1 {
            return false;
        }
        net.two_pins = prim_mst(&net.pin2d);
        true
    });

    if data.nets.len() != before {
        log::info!(
            "decomposition dropped {} of {} nets (trivial or oversized)",
            before - data.nets.len(),
            before
        );
    }
}

fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Prim over the complete Manhattan-distance graph, driven by a
/// min-heap of (distance, visited, unvisited) candidates.
fn prim_mst(pins: &[Point]) -> Vec<TwoPin> {
    let k = pins.len();
    let mut visited = vec![false; k];
    visited[0] = true;

    let mut heap: BinaryHeap<Reverse<(i32, usize, usize)>> = BinaryHeap::new();
    for j in 1..k {
        heap.push(Reverse((manhattan(pins[0], pins[j]), 0, j)));
    }

    let mut out = Vec::with_capacity(k - 1);
    while out.len() < k - 1 {
        let Some(Reverse((_, i, j))) = heap.pop() else {
            break;
        };
        if visited[j] {
            continue;
        }
        visited[j] = true;
        out.push(TwoPin::new(pins[i], pins[j]));
        for m in 1..k {
            if !visited[m] {
                heap.push(Reverse((manhattan(pins[j], pins[m]), j, m)));
            }
        }
    }
    out
}
