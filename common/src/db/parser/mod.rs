pub mod graph;
pub mod netlist;
pub mod placement;
pub mod routes;

/// Strips comments and surrounding whitespace; `None` for blank lines.
fn clean_line(line: &str) -> Option<&str> {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() { None } else { Some(line) }
}
