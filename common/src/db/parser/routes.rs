use super::clean_line;
use crate::db::core::{RoutingDB, SinkRoute};
use crate::geom::coord::TileCoord;
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// One routed sink as stored in a route file.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkRecord {
    pub slot: usize,
    pub endpoint: String,
    pub path: Vec<(TileCoord, String)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetRecord {
    pub name: String,
    pub source: String,
    pub sinks: Vec<SinkRecord>,
}

pub fn write(db: &RoutingDB, filename: &str) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(filename)?);
    write_to(db, &mut file)?;
    file.flush()
}

/// Writes `NET <name> <block:port>`, then per routed sink
/// `SINK <slot> <block:port>` followed by one `<x> <y> <node>` line per hop.
pub fn write_to<W: Write>(db: &RoutingDB, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "# {} nets", db.num_nets())?;
    for net in &db.nets {
        writeln!(out, "NET {} {}", net.name, net.source.label())?;
        let route = db.route_of(net.id);
        for (slot, (sink, sink_route)) in net.sinks.iter().zip(&route.sinks).enumerate() {
            let Some(sink_route) = sink_route else {
                continue;
            };
            writeln!(out, "  SINK {} {}", slot, sink.label())?;
            for &node in &sink_route.path {
                let n = db.graph.node(node);
                writeln!(out, "    {} {} {}", n.pos.x, n.pos.y, n.name)?;
            }
        }
    }
    Ok(())
}

pub fn parse(filename: &str) -> Result<Vec<NetRecord>> {
    log::info!("Parsing Routes: {}", filename);
    let file = File::open(filename).context(format!("Failed to open routes: {}", filename))?;
    read(BufReader::new(file))
}

pub fn read<R: BufRead>(reader: R) -> Result<Vec<NetRecord>> {
    let mut nets: Vec<NetRecord> = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(line) = clean_line(&line) else {
            continue;
        };
        let ln = line_no + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "NET" => {
                if parts.len() < 3 {
                    bail!("line {}: NET needs a name and a source pin", ln);
                }
                nets.push(NetRecord {
                    name: parts[1].to_string(),
                    source: parts[2].to_string(),
                    sinks: Vec::new(),
                });
            }
            "SINK" => {
                if parts.len() < 3 {
                    bail!("line {}: SINK needs a slot and a pin", ln);
                }
                let slot = parts[1]
                    .parse()
                    .context(format!("line {}: bad slot '{}'", ln, parts[1]))?;
                let net = nets
                    .last_mut()
                    .ok_or_else(|| anyhow!("line {}: SINK outside of a NET", ln))?;
                net.sinks.push(SinkRecord {
                    slot,
                    endpoint: parts[2].to_string(),
                    path: Vec::new(),
                });
            }
            _ => {
                if parts.len() < 3 {
                    bail!("line {}: expected '<x> <y> <node>'", ln);
                }
                let x: u32 = parts[0]
                    .parse()
                    .context(format!("line {}: bad x '{}'", ln, parts[0]))?;
                let y: u32 = parts[1]
                    .parse()
                    .context(format!("line {}: bad y '{}'", ln, parts[1]))?;
                let sink = nets
                    .last_mut()
                    .and_then(|n| n.sinks.last_mut())
                    .ok_or_else(|| anyhow!("line {}: path node outside of a SINK", ln))?;
                sink.path.push((TileCoord::new(x, y), parts[2].to_string()));
            }
        }
    }
    Ok(nets)
}

/// Loads `records` into the route table of a freshly ingested `db`.
/// Register endpoints take the locations the paths imply. Returns the number
/// of sink routes loaded.
pub fn apply(db: &mut RoutingDB, records: &[NetRecord]) -> Result<usize> {
    let mut loaded = 0;
    for record in records {
        let id = *db
            .net_name_map
            .get(&record.name)
            .ok_or_else(|| anyhow!("route for unknown net '{}'", record.name))?;
        let source_label = db.net(id).source.label();
        if source_label != record.source {
            bail!(
                "net '{}' is driven by {}, route file says {}",
                record.name,
                source_label,
                record.source
            );
        }

        for sink in &record.sinks {
            let path = sink
                .path
                .iter()
                .map(|(pos, name)| {
                    db.graph
                        .find(*pos, name)
                        .ok_or_else(|| anyhow!("net '{}': unknown node {}@{}", record.name, name, pos))
                })
                .collect::<Result<Vec<_>>>()?;
            let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
                bail!("net '{}': empty route to {}", record.name, sink.endpoint);
            };

            let net = &mut db.nets[id.index()];
            let endpoint = net.sinks.get_mut(sink.slot).ok_or_else(|| {
                anyhow!("net '{}' has no sink slot {}", record.name, sink.slot)
            })?;
            if endpoint.label() != sink.endpoint {
                bail!(
                    "net '{}': slot {} is {}, route file says {}",
                    record.name,
                    sink.slot,
                    endpoint.label(),
                    sink.endpoint
                );
            }
            if endpoint.is_register() {
                endpoint.node = Some(last);
            }
            if net.source.is_register() {
                net.source.node = Some(first);
            }
            db.routes[id.index()].sinks[sink.slot] = Some(SinkRoute { sink: last, path });
            loaded += 1;
        }
    }
    Ok(loaded)
}
