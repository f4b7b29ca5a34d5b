use super::clean_line;
use crate::db::graph::{NodeKind, RoutingGraph};
use crate::geom::coord::TileCoord;
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};

pub fn parse(filename: &str) -> Result<RoutingGraph> {
    log::info!("Parsing Routing Graph: {}", filename);
    let file = File::open(filename)
        .context(format!("Failed to open routing graph: {}", filename))?;
    let graph = read(BufReader::new(file))?;
    log::info!(
        "Routing Graph: {} nodes, {} edges, {}x{} tiles",
        graph.num_nodes(),
        graph.num_edges(),
        graph.width,
        graph.height
    );
    Ok(graph)
}

/// Reads `NODE x y name kind delay capacity [base_cost]` and
/// `EDGE x1 y1 name1 x2 y2 name2 cost` records.
pub fn read<R: BufRead>(reader: R) -> Result<RoutingGraph> {
    let mut graph = RoutingGraph::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(line) = clean_line(&line) else {
            continue;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let ln = line_no + 1;

        match parts[0] {
            "NODE" => {
                if parts.len() < 7 {
                    bail!("line {}: NODE needs 6 fields, got {}", ln, parts.len() - 1);
                }
                let pos = parse_tile(&parts[1..3], ln)?;
                let name = parts[3];
                let kind: NodeKind = parts[4]
                    .parse()
                    .map_err(|e: String| anyhow!("line {}: {}", ln, e))?;
                let delay: f64 = parts[5]
                    .parse()
                    .context(format!("line {}: bad delay '{}'", ln, parts[5]))?;
                let capacity: u32 = parts[6]
                    .parse()
                    .context(format!("line {}: bad capacity '{}'", ln, parts[6]))?;

                if graph.find(pos, name).is_some() {
                    bail!("line {}: node '{}' at {} defined twice", ln, name, pos);
                }
                let id = graph.add_node(pos, name, kind, delay, capacity);
                if let Some(cost) = parts.get(7) {
                    let cost: f64 = cost
                        .parse()
                        .context(format!("line {}: bad base cost '{}'", ln, cost))?;
                    graph.set_base_cost(id, cost);
                }
            }
            "EDGE" => {
                if parts.len() < 8 {
                    bail!("line {}: EDGE needs 7 fields, got {}", ln, parts.len() - 1);
                }
                let from_pos = parse_tile(&parts[1..3], ln)?;
                let to_pos = parse_tile(&parts[4..6], ln)?;
                let from = graph
                    .find(from_pos, parts[3])
                    .ok_or_else(|| anyhow!("line {}: unknown node {}@{}", ln, parts[3], from_pos))?;
                let to = graph
                    .find(to_pos, parts[6])
                    .ok_or_else(|| anyhow!("line {}: unknown node {}@{}", ln, parts[6], to_pos))?;
                let cost: f64 = parts[7]
                    .parse()
                    .context(format!("line {}: bad edge cost '{}'", ln, parts[7]))?;
                graph.add_edge(from, to, cost);
            }
            other => bail!("line {}: unknown record '{}'", ln, other),
        }
    }
    Ok(graph)
}

fn parse_tile(parts: &[&str], ln: usize) -> Result<TileCoord> {
    let x: u32 = parts[0]
        .parse()
        .context(format!("line {}: bad x '{}'", ln, parts[0]))?;
    let y: u32 = parts[1]
        .parse()
        .context(format!("line {}: bad y '{}'", ln, parts[1]))?;
    Ok(TileCoord::new(x, y))
}
