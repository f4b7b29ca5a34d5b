use super::clean_line;
use crate::db::core::{NetDescription, PinRef};
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};

pub fn parse(filename: &str) -> Result<Vec<NetDescription>> {
    log::info!("Parsing Netlist: {}", filename);
    let file = File::open(filename).context(format!("Failed to open netlist: {}", filename))?;
    read(BufReader::new(file))
}

/// Reads `NET <name> <width> <block>:<port> ...` records; the first pin is
/// the driver.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<NetDescription>> {
    let mut nets = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(line) = clean_line(&line) else {
            continue;
        };
        let ln = line_no + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts[0] != "NET" {
            bail!("line {}: unknown record '{}'", ln, parts[0]);
        }
        if parts.len() < 4 {
            bail!("line {}: NET needs a name, a width and at least one pin", ln);
        }
        let width: u32 = parts[2]
            .parse()
            .context(format!("line {}: bad width '{}'", ln, parts[2]))?;
        let pins = parts[3..]
            .iter()
            .map(|p| {
                p.split_once(':')
                    .map(|(block, port)| PinRef::new(block, port))
                    .ok_or_else(|| anyhow!("line {}: pin '{}' is not <block>:<port>", ln, p))
            })
            .collect::<Result<Vec<_>>>()?;

        nets.push(NetDescription {
            name: parts[1].to_string(),
            width,
            pins,
        });
    }
    Ok(nets)
}
