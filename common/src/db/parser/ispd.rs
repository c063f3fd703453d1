//! ISPD 2008 global-routing benchmark reader.
//!
//! The format is whitespace-delimited throughout, so the reader works
//! on a token stream rather than on lines:
//!
//! ```text
//! grid <X> <Y> <L>
//! vertical capacity <c1 .. cL>
//! horizontal capacity <c1 .. cL>
//! minimum width <w1 .. wL>
//! minimum spacing <s1 .. sL>
//! via spacing <v1 .. vL>
//! <lowerLeftX> <lowerLeftY> <tileWidth> <tileHeight>
//! num net <N>
//! <name> <id> <numPins> <minWidth>
//! <x> <y> <z>            (numPins times)
//! ...
//! <numCapacityAdj>
//! <x1> <y1> <z1> <x2> <y2> <z2> <reduced>
//! ```

use crate::db::core::{CapacityAdj, IspdData, Net, Point};
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::str::SplitAsciiWhitespace;

struct Tokens<'a> {
    inner: SplitAsciiWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_ascii_whitespace(),
        }
    }

    fn word(&mut self, section: &'static str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| anyhow!("unexpected end of input while reading {}", section))
    }

    fn int(&mut self, section: &'static str) -> Result<i32> {
        let tok = self.word(section)?;
        tok.parse::<i32>()
            .map_err(|_| anyhow!("invalid integer `{}` in {}", tok, section))
    }

    fn keyword(&mut self, expected: &'static str) -> Result<()> {
        let tok = self.word(expected)?;
        if tok != expected {
            return Err(anyhow!("expected keyword `{}`, found `{}`", expected, tok));
        }
        Ok(())
    }

    fn int_row(&mut self, n: usize, section: &'static str) -> Result<Vec<i32>> {
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(self.int(section)?);
        }
        Ok(v)
    }
}

/// Parses a benchmark from an in-memory string.
pub fn parse(input: &str) -> Result<IspdData> {
    let mut tk = Tokens::new(input);
    let mut data = IspdData::default();

    tk.keyword("grid")?;
    data.num_x_grid = tk.int("grid")?;
    data.num_y_grid = tk.int("grid")?;
    data.num_layer = tk.int("grid")?;
    if data.num_x_grid < 2 || data.num_y_grid < 2 || data.num_layer < 1 {
        return Err(anyhow!(
            "degenerate grid {}x{}x{}",
            data.num_x_grid,
            data.num_y_grid,
            data.num_layer
        ));
    }
    let layers = data.num_layer as usize;

    tk.keyword("vertical")?;
    tk.keyword("capacity")?;
    data.vertical_capacity = tk.int_row(layers, "vertical capacity")?;

    tk.keyword("horizontal")?;
    tk.keyword("capacity")?;
    data.horizontal_capacity = tk.int_row(layers, "horizontal capacity")?;

    tk.keyword("minimum")?;
    tk.keyword("width")?;
    data.minimum_width = tk.int_row(layers, "minimum width")?;

    tk.keyword("minimum")?;
    tk.keyword("spacing")?;
    data.minimum_spacing = tk.int_row(layers, "minimum spacing")?;

    tk.keyword("via")?;
    tk.keyword("spacing")?;
    data.via_spacing = tk.int_row(layers, "via spacing")?;

    data.lower_left_x = tk.int("origin")?;
    data.lower_left_y = tk.int("origin")?;
    data.tile_width = tk.int("tile size")?;
    data.tile_height = tk.int("tile size")?;
    if data.tile_width <= 0 || data.tile_height <= 0 {
        return Err(anyhow!(
            "non-positive tile size {}x{}",
            data.tile_width,
            data.tile_height
        ));
    }

    tk.keyword("num")?;
    tk.keyword("net")?;
    data.num_net = tk.int("num net")?;

    data.nets.reserve(data.num_net.max(0) as usize);
    for _ in 0..data.num_net {
        let mut net = Net {
            name: tk.word("net header")?.to_string(),
            id: tk.int("net header")?,
            num_pins: tk.int("net header")?,
            minimum_width: tk.int("net header")?,
            ..Default::default()
        };
        net.pins.reserve(net.num_pins.max(0) as usize);
        for _ in 0..net.num_pins {
            let x = tk.int("pin")?;
            let y = tk.int("pin")?;
            let z = tk.int("pin")?;
            net.pins.push(Point::new(x, y, z));
        }
        data.nets.push(net);
    }

    let num_adj = tk.int("num capacity adjustments")?;
    data.capacity_adjs.reserve(num_adj.max(0) as usize);
    for _ in 0..num_adj {
        let g1 = (
            tk.int("capacity adjustment")?,
            tk.int("capacity adjustment")?,
            tk.int("capacity adjustment")?,
        );
        let g2 = (
            tk.int("capacity adjustment")?,
            tk.int("capacity adjustment")?,
            tk.int("capacity adjustment")?,
        );
        let reduced = tk.int("capacity adjustment")?;
        data.capacity_adjs.push(CapacityAdj {
            grid1: g1,
            grid2: g2,
            reduced,
        });
    }

    Ok(data)
}

/// Parses a benchmark from a file on disk.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<IspdData> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read benchmark {:?}", path))?;
    parse(&input).with_context(|| format!("malformed benchmark {:?}", path))
}
