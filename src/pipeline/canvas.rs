use image::{Rgba, RgbaImage};

use crate::types::{Color, Point};

/// Drawing surface the renderer targets. Coordinates are absolute pixels and are
/// truncated to integers by implementations.
pub trait Canvas {
    /// Ring of `thickness` pixels centred on `radius`; a negative thickness fills the disc.
    fn draw_circle(&mut self, center: Point, radius: i32, color: Color, thickness: i32);
    fn draw_line(&mut self, p0: Point, p1: Point, color: Color, thickness: i32);
    /// Axis-aligned outline spanning the two corners.
    fn draw_rectangle(&mut self, p0: Point, p1: Point, color: Color, thickness: i32);
}

/// [`Canvas`] over an RGBA pixel buffer. Anything outside the image is dropped.
pub struct RgbaCanvas {
    image: RgbaImage,
}

impl RgbaCanvas {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn put_pixel_safe(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.image.width() || uy >= self.image.height() {
            return;
        }
        self.image
            .put_pixel(ux, uy, Rgba([color[0], color[1], color[2], 255]));
    }

    fn stamp(&mut self, x: i32, y: i32, radius: i32, color: Color) {
        self.put_pixel_safe(x, y, color);
        if radius <= 0 {
            return;
        }
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                    self.put_pixel_safe(x + ox, y + oy, color);
                }
            }
        }
    }

    fn line(&mut self, p0: (i32, i32), p1: (i32, i32), color: Color, thickness: i32) {
        let (mut x0, mut y0) = p0;
        let (x1, y1) = p1;
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let radius = (thickness.max(1) - 1) / 2;

        loop {
            self.stamp(x0, y0, radius, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

fn to_pixel(p: Point) -> (i32, i32) {
    (p.x as i32, p.y as i32)
}

impl Canvas for RgbaCanvas {
    fn draw_circle(&mut self, center: Point, radius: i32, color: Color, thickness: i32) {
        let (cx, cy) = to_pixel(center);
        let (inner, outer) = if thickness < 0 {
            (0, radius.max(0))
        } else {
            let half = thickness / 2;
            ((radius - half).max(0), radius + half)
        };

        for dy in -outer..=outer {
            for dx in -outer..=outer {
                let d2 = dx * dx + dy * dy;
                if d2 <= outer * outer && (inner == 0 || d2 >= inner * inner) {
                    self.put_pixel_safe(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn draw_line(&mut self, p0: Point, p1: Point, color: Color, thickness: i32) {
        self.line(to_pixel(p0), to_pixel(p1), color, thickness);
    }

    fn draw_rectangle(&mut self, p0: Point, p1: Point, color: Color, thickness: i32) {
        let (x1, y1) = to_pixel(p0);
        let (x2, y2) = to_pixel(p1);
        self.line((x1, y1), (x2, y1), color, thickness);
        self.line((x2, y1), (x2, y2), color, thickness);
        self.line((x2, y2), (x1, y2), color, thickness);
        self.line((x1, y2), (x1, y1), color, thickness);
    }
}
