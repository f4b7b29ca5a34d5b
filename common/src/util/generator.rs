use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const INPUT_PORTS: [&str; 2] = ["in0", "in1"];

/// Writes a random CGRA benchmark (`design.graph`, `design.place`,
/// `design.net`) into `dir`. The same seed always yields the same files.
pub fn generate_random_design(
    dir: &str,
    width: u32,
    height: u32,
    tracks: u32,
    num_nets: usize,
    seed: u64,
) -> std::io::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dir = Path::new(dir);

    let width = width.max(2);
    let height = height.max(2);
    let tracks = tracks.max(1);

    log::info!(
        "Generating Benchmark: {}x{} tiles, {} tracks, {} nets (seed {})",
        width,
        height,
        tracks,
        num_nets,
        seed
    );

    write_graph(&dir.join("design.graph"), width, height, tracks)?;

    let mut tiles: Vec<(u32, u32)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .collect();
    tiles.shuffle(&mut rng);

    // Half the tiles hold a PE, the rest hold one folded register each.
    let num_pes = (tiles.len() / 2).max(2);
    let (pe_tiles, reg_tiles) = tiles.split_at(num_pes);

    let mut place = File::create(dir.join("design.place"))?;
    for (i, (x, y)) in pe_tiles.iter().enumerate() {
        writeln!(place, "p{} {} {}", i, x, y)?;
    }
    for (i, (x, y)) in reg_tiles.iter().enumerate() {
        writeln!(place, "r{} {} {}", i, x, y)?;
    }

    let mut free_inputs: Vec<(usize, &str)> = (0..num_pes)
        .flat_map(|pe| INPUT_PORTS.iter().map(move |&port| (pe, port)))
        .collect();
    free_inputs.shuffle(&mut rng);
    let mut free_regs: Vec<usize> = (0..reg_tiles.len()).collect();
    free_regs.shuffle(&mut rng);

    let mut netlist = File::create(dir.join("design.net"))?;
    let mut written = 0;
    for n in 0..num_nets.min(num_pes) {
        let fanout = rng.gen_range(1..=3usize);
        let mut sinks = Vec::new();
        for _ in 0..fanout {
            let Some(pos) = free_inputs.iter().position(|&(pe, _)| pe != n) else {
                break;
            };
            let (pe, port) = free_inputs.swap_remove(pos);
            sinks.push(format!("p{}:{}", pe, port));
        }
        if rng.gen_bool(0.3) {
            if let Some(r) = free_regs.pop() {
                sinks.push(format!("r{}:reg", r));
            }
        }
        if sinks.is_empty() {
            break;
        }
        // Mostly 1-bit nets; the rest are filtered out by the driver.
        let width_code = if rng.gen_bool(0.9) { 16 } else { 1 };
        writeln!(
            netlist,
            "NET net{} {} p{}:out {}",
            n,
            width_code,
            n,
            sinks.join(" ")
        )?;
        written += 1;
    }

    log::info!(
        "Generated {} nets over {} PEs and {} registers",
        written,
        num_pes,
        reg_tiles.len()
    );
    Ok(())
}

fn write_graph(path: &Path, width: u32, height: u32, tracks: u32) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "# {}x{} CGRA, {} tracks per tile", width, height, tracks)?;

    for y in 0..height {
        for x in 0..width {
            writeln!(file, "NODE {} {} out port 0 1", x, y)?;
            for port in INPUT_PORTS {
                writeln!(file, "NODE {} {} {} port 0 1", x, y, port)?;
            }
            for t in 0..tracks {
                writeln!(file, "NODE {} {} t{} track 1.0 1", x, y, t)?;
                writeln!(file, "NODE {} {} reg{} reg 0.5 1", x, y, t)?;
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            let neighbors = neighbors_2d(x, y, width, height);
            for t in 0..tracks {
                writeln!(file, "EDGE {x} {y} out {x} {y} t{t} 0.1")?;
                for port in INPUT_PORTS {
                    writeln!(file, "EDGE {x} {y} t{t} {x} {y} {port} 0.1")?;
                }
                writeln!(file, "EDGE {x} {y} t{t} {x} {y} reg{t} 0.1")?;
                for &(nx, ny) in &neighbors {
                    writeln!(file, "EDGE {x} {y} t{t} {nx} {ny} t{t} 1.0")?;
                    writeln!(file, "EDGE {x} {y} reg{t} {nx} {ny} t{t} 1.0")?;
                }
            }
        }
    }
    Ok(())
}

fn neighbors_2d(x: u32, y: u32, w: u32, h: u32) -> Vec<(u32, u32)> {
    let mut n = Vec::new();
    if x > 0 {
        n.push((x - 1, y));
    }
    if x < w - 1 {
        n.push((x + 1, y));
    }
    if y > 0 {
        n.push((x, y - 1));
    }
    if y < h - 1 {
        n.push((x, y + 1));
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::parser::{graph, netlist, placement};

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("cgra-gen-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn generated_files_parse() {
        let dir = temp_dir("parse");
        generate_random_design(dir.to_str().unwrap(), 4, 4, 2, 5, 7).unwrap();

        let g = graph::parse(dir.join("design.graph").to_str().unwrap()).unwrap();
        assert_eq!(g.width, 4);
        assert_eq!(g.height, 4);
        // out, in0, in1 + (track, reg) per track
        assert_eq!(g.num_nodes(), 16 * (3 + 2 * 2));

        let p = placement::parse(dir.join("design.place").to_str().unwrap()).unwrap();
        assert_eq!(p.len(), 16);

        let nets = netlist::parse(dir.join("design.net").to_str().unwrap()).unwrap();
        assert!(!nets.is_empty());
        assert!(nets.iter().all(|n| n.pins.len() >= 2));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn same_seed_same_netlist() {
        let a = temp_dir("seed-a");
        let b = temp_dir("seed-b");
        generate_random_design(a.to_str().unwrap(), 5, 3, 2, 6, 42).unwrap();
        generate_random_design(b.to_str().unwrap(), 5, 3, 2, 6, 42).unwrap();
        let na = std::fs::read_to_string(a.join("design.net")).unwrap();
        let nb = std::fs::read_to_string(b.join("design.net")).unwrap();
        assert_eq!(na, nb);
        std::fs::remove_dir_all(a).ok();
        std::fs::remove_dir_all(b).ok();
    }
}
