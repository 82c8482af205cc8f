//! Procedural grass texture for the ground plane

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASE: [u8; 3] = [0x2f, 0x6b, 0x2f];
const DOT_COUNT: usize = 14_000;
const DOT_ALPHA: f32 = 0.25;
const STROKE_COUNT: usize = 1_000;
const STROKE_ALPHA: f32 = 0.18;
const STROKE_LIGHT: [u8; 3] = [0xa7, 0xd3, 0x6b];
const STROKE_DARK: [u8; 3] = [0x3c, 0x8a, 0x3c];

/// Square RGBA8 image (sRGB) that tiles seamlessly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrassTexture {
    pub size: u32,
    pub pixels: Vec<u8>,
}

impl GrassTexture {
    /// Paint the texture. The same `(size, seed)` always gives the same pixels.
    pub fn generate(size: u32, seed: u64) -> Self {
        let size = size.max(1);
        let mut canvas = Canvas::new(size, BASE);
        let mut rng = StdRng::seed_from_u64(seed);
        let extent = size as f32;

        for _ in 0..DOT_COUNT {
            let x = rng.gen_range(0.0..extent);
            let y = rng.gen_range(0.0..extent);
            let radius = rng.gen_range(0.5..2.5);
            let color = [
                rng.gen_range(30..60),
                rng.gen_range(110..190),
                rng.gen_range(25..55),
            ];
            canvas.disc(x, y, radius, color, DOT_ALPHA);
        }

        for _ in 0..STROKE_COUNT {
            let x = rng.gen_range(0.0..extent);
            let y = rng.gen_range(0.0..extent);
            let length = rng.gen_range(3.0..13.0);
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let color = if rng.gen_bool(0.5) { STROKE_LIGHT } else { STROKE_DARK };
            canvas.stroke(x, y, length, angle, color, STROKE_ALPHA);
        }

        Self {
            size,
            pixels: canvas.into_rgba(),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.size + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// Float RGB accumulation buffer; every write wraps around the edges
struct Canvas {
    size: u32,
    rgb: Vec<[f32; 3]>,
}

impl Canvas {
    fn new(size: u32, fill: [u8; 3]) -> Self {
        let color = fill.map(f32::from);
        Self {
            size,
            rgb: vec![color; (size * size) as usize],
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: [u8; 3], alpha: f32) {
        let size = self.size as i64;
        let index = (y.rem_euclid(size) * size + x.rem_euclid(size)) as usize;
        let dst = &mut self.rgb[index];
        for (channel, src) in dst.iter_mut().zip(color) {
            *channel = *channel * (1.0 - alpha) + f32::from(src) * alpha;
        }
    }

    fn disc(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 3], alpha: f32) {
        let r2 = radius * radius;
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.blend(x, y, color, alpha);
                }
            }
        }
    }

    fn stroke(&mut self, x: f32, y: f32, length: f32, angle: f32, color: [u8; 3], alpha: f32) {
        let steps = length.ceil() as usize;
        let (dy, dx) = angle.sin_cos();
        let mut last = None;

        for step in 0..=steps {
            let t = length * step as f32 / steps.max(1) as f32;
            let px = (x + dx * t).floor() as i64;
            let py = (y + dy * t).floor() as i64;
            // One pixel wide, so each pixel is painted once per stroke
            if last != Some((px, py)) {
                self.blend(px, py, color, alpha);
                last = Some((px, py));
            }
        }
    }

    fn into_rgba(self) -> Vec<u8> {
        self.rgb
            .into_iter()
            .flat_map(|[r, g, b]| {
                [
                    r.round().clamp(0.0, 255.0) as u8,
                    g.round().clamp(0.0, 255.0) as u8,
                    b.round().clamp(0.0, 255.0) as u8,
                    255,
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_opacity() {
        let texture = GrassTexture::generate(64, 7);
        assert_eq!(texture.size, 64);
        assert_eq!(texture.pixels.len(), 64 * 64 * 4);
        assert!(texture.pixels.chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_deterministic_per_seed() {
        let a = GrassTexture::generate(32, 42);
        let b = GrassTexture::generate(32, 42);
        let c = GrassTexture::generate(32, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_mostly_green() {
        let texture = GrassTexture::generate(64, 1);
        let green = texture
            .pixels
            .chunks(4)
            .filter(|p| p[1] > p[0] && p[1] > p[2])
            .count();
        assert_eq!(green, 64 * 64);
    }

    #[test]
    fn test_marks_wrap_across_edges() {
        let mut canvas = Canvas::new(8, [0, 0, 0]);
        canvas.disc(0.0, 0.0, 1.0, [255, 255, 255], 1.0);
        let rgba = canvas.into_rgba();
        let texture = GrassTexture { size: 8, pixels: rgba };
        // A disc centered on the corner paints all four corners
        assert_eq!(texture.pixel(0, 0)[0], 255);
        assert_eq!(texture.pixel(7, 0)[0], 255);
        assert_eq!(texture.pixel(0, 7)[0], 255);
        assert_eq!(texture.pixel(7, 7)[0], 255);
        assert_eq!(texture.pixel(4, 4)[0], 0);
    }
}
