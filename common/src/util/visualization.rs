use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// A placed rectangle in floorplan coordinates, bottom-left anchored.
pub struct PlacedRect {
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

pub fn draw_floorplan(rects: &[PlacedRect], filename: &str, width: u32, height: u32) {
    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

    let span_w = rects.iter().map(|r| r.x + r.width).max().unwrap_or(0);
    let span_h = rects.iter().map(|r| r.y + r.height).max().unwrap_or(0);
    if span_w == 0 || span_h == 0 {
        return;
    }

    let scale_x = width as f64 / span_w as f64;
    let scale_y = height as f64 / span_h as f64;

    let palette = [
        Rgb([180, 60, 60]),
        Rgb([60, 140, 180]),
        Rgb([180, 140, 40]),
        Rgb([90, 170, 90]),
        Rgb([150, 90, 170]),
    ];

    for (i, r) in rects.iter().enumerate() {
        let x = r.x as f64 * scale_x;
        let y_top = height as f64 - (r.y + r.height) as f64 * scale_y;
        let w = (r.width as f64 * scale_x).max(2.0);
        let h = (r.height as f64 * scale_y).max(2.0);
        let rect = ImageRect::at(x as i32, y_top as i32).of_size(w as u32, h as u32);
        draw_filled_rect_mut(&mut img, rect, palette[i % palette.len()]);
    }

    let _ = img.save(Path::new(filename));
}
