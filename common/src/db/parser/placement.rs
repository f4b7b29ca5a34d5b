use super::clean_line;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Block name and tile, in file order.
pub type Placement = Vec<(String, u32, u32)>;

pub fn parse(filename: &str) -> Result<Placement> {
    log::info!("Parsing Placement: {}", filename);
    let file =
        File::open(filename).context(format!("Failed to open placement: {}", filename))?;
    read(BufReader::new(file))
}

pub fn read<R: BufRead>(reader: R) -> Result<Placement> {
    let mut placement = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(line) = clean_line(&line) else {
            continue;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            bail!("line {}: expected '<block> <x> <y>'", line_no + 1);
        }
        let x: u32 = parts[1]
            .parse()
            .context(format!("line {}: bad x '{}'", line_no + 1, parts[1]))?;
        let y: u32 = parts[2]
            .parse()
            .context(format!("line {}: bad y '{}'", line_no + 1, parts[2]))?;
        placement.push((parts[0].to_string(), x, y));
    }
    Ok(placement)
}
