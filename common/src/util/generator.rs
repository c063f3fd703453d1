use crate::util::rng;
use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Writes a random but well-formed two-layer benchmark for smoke
/// testing. Layer 1 is horizontal-only, layer 2 vertical-only, the
/// usual preferred-direction split.
pub fn generate_random_gr(
    filename: &str,
    width: i32,
    height: i32,
    num_nets: usize,
    pins_per_net: usize,
    capacity: i32,
) -> Result<()> {
    let tile = 10;
    let file = File::create(filename)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "grid {} {} 2", width, height)?;
    writeln!(out, "vertical capacity 0 {}", capacity)?;
    writeln!(out, "horizontal capacity {} 0", capacity)?;
    writeln!(out, "minimum width 1 1")?;
    writeln!(out, "minimum spacing 0 0")?;
    writeln!(out, "via spacing 0 0")?;
    writeln!(out, "0 0 {} {}", tile, tile)?;

    writeln!(out, "num net {}", num_nets)?;
    for i in 0..num_nets {
        writeln!(out, "net{} {} {} 1", i, i, pins_per_net)?;
        for _ in 0..pins_per_net {
            let x = rng::randint(width) * tile + tile / 2;
            let y = rng::randint(height) * tile + tile / 2;
            let z = rng::randint(2) + 1;
            writeln!(out, "{} {} {}", x, y, z)?;
        }
    }
    writeln!(out, "0")?;

    out.flush()?;
    log::info!(
        "generated {} ({}x{} tiles, {} nets)",
        filename,
        width,
        height,
        num_nets
    );
    Ok(())
}
