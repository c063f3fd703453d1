//! In-memory model of an ISPD 2008 global-routing benchmark.
//!
//! `IspdData` is what the parser produces and what the routing core
//! consumes. Pins are kept in layout coordinates; the router translates
//! them to tile coordinates during net decomposition and stores the
//! result in `Net::pin2d` / `Net::pin3d`.

/// A tile (gcell) position. `z` is the 1-based layer from the input;
/// the 2D router carries it around but never branches on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A routed edge between two adjacent tiles, stored canonically at its
/// lower-coordinate endpoint: `(x, y, true)` is the horizontal edge
/// `(x, y) - (x+1, y)`, `(x, y, false)` the vertical edge
/// `(x, y) - (x, y+1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RPoint {
    pub x: i32,
    pub y: i32,
    pub hori: bool,
}

impl RPoint {
    pub fn new(x: i32, y: i32, hori: bool) -> Self {
        Self { x, y, hori }
    }
}

/// Search-window state carried by a two-pin across reroutes. The four
/// `exp_*` flags record which sides are still worth growing.
#[derive(Clone, Copy, Debug)]
pub struct SearchBox {
    pub l: i32,
    pub r: i32,
    pub b: i32,
    pub u: i32,
    pub exp_l: bool,
    pub exp_r: bool,
    pub exp_b: bool,
    pub exp_u: bool,
}

impl SearchBox {
    pub fn new(from: Point, to: Point) -> Self {
        Self {
            l: from.x.min(to.x),
            r: from.x.max(to.x),
            b: from.y.min(to.y),
            u: from.y.max(to.y),
            exp_l: true,
            exp_r: true,
            exp_b: true,
            exp_u: true,
        }
    }

    pub fn width(&self) -> usize {
        (self.r - self.l + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.u - self.b + 1) as usize
    }
}

/// An elementary routing task between two tiles of the same net.
///
/// `path` is the set of grid edges this connection currently owns.
/// Ownership is non-exclusive: several two-pins may own the same edge,
/// and each contributes one unit of demand.
#[derive(Clone, Debug, Default)]
pub struct TwoPin {
    pub from: Point,
    pub to: Point,
    pub path: Vec<RPoint>,
    pub reroute: i32,
    pub overflow: bool,
    pub ripped: bool,
    pub bbox: Option<SearchBox>,
}

impl TwoPin {
    pub fn new(from: Point, to: Point) -> Self {
        Self {
            from,
            to,
            ..Default::default()
        }
    }

    /// Half-perimeter of the endpoint bounding box.
    pub fn hpwl(&self) -> i32 {
        (self.from.x - self.to.x).abs() + (self.from.y - self.to.y).abs()
    }
}

/// A multi-pin net. `pins` holds the raw layout coordinates from the
/// benchmark; `pin2d`/`pin3d` and `two_pins` are filled by
/// decomposition. The `overflow`/`overflow_twopin`/`wlen`/`cost` stats
/// are refreshed by every overflow-accounting pass and drive the
/// rip-up ordering.
#[derive(Clone, Debug, Default)]
pub struct Net {
    pub name: String,
    pub id: i32,
    pub num_pins: i32,
    pub minimum_width: i32,
    pub pins: Vec<Point>,
    pub pin2d: Vec<Point>,
    pub pin3d: Vec<Point>,
    pub two_pins: Vec<TwoPin>,
    pub overflow: i32,
    pub overflow_twopin: i32,
    pub wlen: i32,
    pub cost: f64,
}

/// One `reducedCapacityLevel` entry from the benchmark.
#[derive(Clone, Copy, Debug)]
pub struct CapacityAdj {
    pub grid1: (i32, i32, i32),
    pub grid2: (i32, i32, i32),
    pub reduced: i32,
}

/// A parsed ISPD 2008 benchmark.
#[derive(Clone, Debug, Default)]
pub struct IspdData {
    pub num_x_grid: i32,
    pub num_y_grid: i32,
    pub num_layer: i32,

    pub vertical_capacity: Vec<i32>,
    pub horizontal_capacity: Vec<i32>,
    pub minimum_width: Vec<i32>,
    pub minimum_spacing: Vec<i32>,
    pub via_spacing: Vec<i32>,

    pub lower_left_x: i32,
    pub lower_left_y: i32,
    pub tile_width: i32,
    pub tile_height: i32,

    pub num_net: i32,
    pub nets: Vec<Net>,

    pub capacity_adjs: Vec<CapacityAdj>,
}

impl IspdData {
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }
}
