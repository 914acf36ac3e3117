//! Drawing surfaces handed to program render functions.

use serde::{Deserialize, Serialize};

use crate::HudError;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0., 1.) * 255.).round() as u8,
            ..self
        }
    }

    /// Scales the color channels, keeping alpha.
    pub fn dimmed(self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor.clamp(0., 1.)).round() as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }
}

/// Immediate-mode 2D drawing capability. Implementors only provide the pixel primitive;
/// shapes are rasterized on top of it.
pub trait DrawableSurface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Source-over blends `color` into the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    fn blend_pixel(&mut self, x: i64, y: i64, color: Color);

    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let x0 = x.floor().max(0.) as i64;
        let y0 = y.floor().max(0.) as i64;
        let x1 = ((x + w).ceil() as i64).min(self.width() as i64);
        let y1 = ((y + h).ceil() as i64).min(self.height() as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        let (mut x0, mut y0) = (from.0.round() as i64, from.1.round() as i64);
        let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.blend_pixel(x0, y0, color);
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

    fn circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        let segments = ((radius * 0.75).ceil() as usize).clamp(12, 256);
        let point = |i: usize| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            (
                center.0 + radius * angle.cos(),
                center.1 + radius * angle.sin(),
            )
        };
        for i in 0..segments {
            self.line(point(i), point(i + 1), color);
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        let r2 = radius * radius;
        let y0 = (center.1 - radius).floor() as i64;
        let y1 = (center.1 + radius).ceil() as i64;
        let x0 = (center.0 - radius).floor() as i64;
        let x1 = (center.0 + radius).ceil() as i64;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - center.0;
                let dy = py as f32 + 0.5 - center.1;
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }
}

/// RGBA8 pixel buffer, row-major, ready for texture upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelSurface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PixelSurface {
    pub fn new(width: usize, height: usize) -> Result<Self, HudError> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .filter(|&len| len > 0)
            .ok_or(HudError::InvalidSurface { width, height })?;
        Ok(Self {
            width,
            height,
            pixels: vec![0; len],
        })
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.width + x) * 4;
        let px = &self.pixels[offset..offset + 4];
        Some(Color::rgba(px[0], px[1], px[2], px[3]))
    }
}

impl DrawableSurface for PixelSurface {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let offset = (y as usize * self.width + x as usize) * 4;
        let dst = &mut self.pixels[offset..offset + 4];
        if color.a == 255 {
            dst.copy_from_slice(&[color.r, color.g, color.b, 255]);
            return;
        }
        let alpha = color.a as u32;
        let inv = 255 - alpha;
        let mix = |src: u8, dst: u8| ((src as u32 * alpha + dst as u32 * inv) / 255) as u8;
        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = (alpha + dst[3] as u32 * inv / 255).min(255) as u8;
    }

    fn clear(&mut self, color: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sized_surface_rejected() {
        assert!(matches!(
            PixelSurface::new(0, 10),
            Err(HudError::InvalidSurface { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_overflowing_surface_rejected() {
        let width = usize::MAX / 2;
        assert!(matches!(
            PixelSurface::new(width, 3),
            Err(HudError::InvalidSurface { width: w, height: 3 }) if w == width
        ));
        assert!(PixelSurface::new(usize::MAX / 4 + 1, 1).is_err());
    }

    #[test]
    fn test_clear_and_fill_rect() {
        let mut surface = PixelSurface::new(8, 8).unwrap();
        surface.clear(Color::BLACK);
        surface.fill_rect(2., 2., 3., 3., Color::rgb(255, 0, 0));
        assert_eq!(surface.pixel(3, 3), Some(Color::rgb(255, 0, 0)));
        assert_eq!(surface.pixel(0, 0), Some(Color::BLACK));
        assert_eq!(surface.pixel(5, 5), Some(Color::BLACK));
        assert_eq!(surface.pixel(8, 0), None);
    }

    #[test]
    fn test_out_of_bounds_drawing_is_clipped() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        surface.line((-10., -10.), (20., 20.), Color::rgb(0, 255, 0));
        surface.fill_circle((0., 0.), 10., Color::rgb(0, 0, 255));
        surface.fill_rect(-5., -5., 100., 100., Color::rgb(1, 2, 3));
        assert_eq!(surface.pixel(3, 3), Some(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn test_alpha_blending() {
        let mut surface = PixelSurface::new(1, 1).unwrap();
        surface.clear(Color::BLACK);
        surface.blend_pixel(0, 0, Color::rgb(255, 255, 255).with_alpha(0.5));
        let px = surface.pixel(0, 0).unwrap();
        assert!((127..=128).contains(&px.r));
        assert_eq!(px.a, 255);
    }

    #[test]
    fn test_line_endpoints_painted() {
        let mut surface = PixelSurface::new(10, 10).unwrap();
        let white = Color::rgb(255, 255, 255);
        surface.line((1., 1.), (8., 4.), white);
        assert_eq!(surface.pixel(1, 1), Some(white));
        assert_eq!(surface.pixel(8, 4), Some(white));
    }
}
