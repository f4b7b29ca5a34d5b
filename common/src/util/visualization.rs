use crate::db::core::RoutingDB;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Per-tile congestion map: red channel is peak utilisation, blue channel is
/// accumulated history, overflowed tiles get a white border.
pub fn draw_congestion(db: &RoutingDB, filename: &str, width: u32, height: u32) {
    let grid_w = db.graph.width;
    let grid_h = db.graph.height;
    if grid_w == 0 || grid_h == 0 {
        return;
    }

    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

    let tiles = (grid_w * grid_h) as usize;
    let mut utilisation = vec![0.0f64; tiles];
    let mut history = vec![0.0f64; tiles];
    let mut overflowed = vec![false; tiles];

    for node in &db.graph.nodes {
        let idx = (node.pos.y * grid_w + node.pos.x) as usize;
        if node.capacity > 0 {
            let u = node.occupancy() as f64 / node.capacity as f64;
            utilisation[idx] = utilisation[idx].max(u);
        }
        history[idx] += node.history();
        overflowed[idx] |= node.is_overflowed();
    }

    let max_history = history.iter().cloned().fold(0.0, f64::max);
    let cell_w = (width / grid_w).max(1);
    let cell_h = (height / grid_h).max(1);

    for y in 0..grid_h {
        for x in 0..grid_w {
            let idx = (y * grid_w + x) as usize;
            let red = (utilisation[idx].min(1.0) * 255.0) as u8;
            let blue = if max_history > 0.0 {
                (history[idx] / max_history * 255.0) as u8
            } else {
                0
            };
            // Row 0 at the bottom, like the device coordinates.
            let px = (x * cell_w) as i32;
            let py = height as i32 - ((y + 1) * cell_h) as i32;
            let rect = ImageRect::at(px + 1, py + 1).of_size(
                cell_w.saturating_sub(2).max(1),
                cell_h.saturating_sub(2).max(1),
            );
            draw_filled_rect_mut(&mut img, rect, Rgb([red, 40, blue]));
            if overflowed[idx] {
                let border = ImageRect::at(px, py).of_size(cell_w, cell_h);
                draw_hollow_rect_mut(&mut img, border, Rgb([255, 255, 255]));
            }
        }
    }

    if let Err(e) = img.save(Path::new(filename)) {
        log::warn!("Could not write congestion map {}: {}", filename, e);
    }
}
