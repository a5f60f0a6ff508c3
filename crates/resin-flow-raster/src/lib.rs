//! Software raster surface for resin flow.
//!
//! [`RasterSurface`] implements [`Surface`] on an in-memory float buffer:
//! anti-aliased discs and strokes with soft glow halos, composited
//! source-over onto the background. Frames convert to an
//! [`image::RgbaImage`] or save straight to PNG.
//!
//! # Example
//!
//! ```
//! use rhizome_resin_flow::{EngineConfig, FlowEngine};
//! use rhizome_resin_flow_raster::RasterSurface;
//!
//! let mut engine = FlowEngine::new(EngineConfig::new(160.0, 120.0).with_particle_count(24)).unwrap();
//! let mut surface = RasterSurface::new(160, 120);
//! let report = engine.tick(0.0, &mut surface);
//! assert!(report.drawn.is_some());
//! let image = surface.to_image();
//! assert_eq!(image.dimensions(), (160, 120));
//! ```

use std::path::Path;

use glam::Vec2;
use image::{ImageError, RgbaImage};
use rhizome_resin_flow::{Paint, Rgba, Surface, SurfaceError};
use thiserror::Error;

/// Peak opacity of a glow halo relative to its element.
const GLOW_STRENGTH: f32 = 0.35;
/// Flattening density for curves, in segments per pixel of control polygon.
const CURVE_SEGMENTS_PER_PX: f32 = 0.25;
const MAX_CURVE_SEGMENTS: usize = 64;

/// Errors from exporting a raster frame.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Encoding failed.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// The output directory could not be created.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An in-memory drawing surface.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    /// Straight RGBA per pixel, row-major.
    pixels: Vec<[f32; 4]>,
    detached: bool,
}

impl RasterSurface {
    /// Creates a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
            detached: false,
        }
    }

    /// Returns the dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocates the buffer at a new size, clearing it.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self {
            detached: self.detached,
            ..Self::new(width, height)
        };
    }

    /// Makes every subsequent call fail with [`SurfaceError::Detached`].
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Undoes [`detach`](Self::detach).
    pub fn attach(&mut self) {
        self.detached = false;
    }

    /// Color of the pixel at `(x, y)`, if inside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let [r, g, b, a] = self.pixels[(y * self.width + x) as usize];
        Some(Rgba::new(r, g, b, a))
    }

    /// Converts the current frame to an 8-bit image.
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (dst, src) in image.pixels_mut().zip(&self.pixels) {
            *dst = image::Rgba(Rgba::new(src[0], src[1], src[2], src[3]).to_rgba8());
        }
        image
    }

    /// Saves the current frame as a PNG, creating parent directories.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RasterError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        self.to_image().save(path)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }

    fn check(&self) -> Result<(), SurfaceError> {
        if self.detached {
            Err(SurfaceError::Detached)
        } else {
            Ok(())
        }
    }

    /// Composites `color` with extra opacity `alpha` over one pixel.
    fn blend(&mut self, x: u32, y: u32, color: Rgba, alpha: f32) {
        let a = (color.a * alpha).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = &mut self.pixels[(y * self.width + x) as usize];
        let out_a = a + dst[3] * (1.0 - a);
        if out_a <= 0.0 {
            return;
        }
        // Weight of the existing color: dst_a * (1 - a).
        let keep = out_a - a;
        for (channel, src) in dst.iter_mut().zip([color.r, color.g, color.b]) {
            *channel = (src * a + *channel * keep) / out_a;
        }
        dst[3] = out_a;
    }

    /// Shades every pixel in the box `lo`-`hi` using `coverage`, a function
    /// of the pixel center returning the element's opacity there.
    ///
    /// Fails with [`SurfaceError::Draw`] if the box is not finite.
    fn shade<F>(
        &mut self,
        lo: Vec2,
        hi: Vec2,
        color: Rgba,
        coverage: F,
    ) -> Result<(), SurfaceError>
    where
        F: Fn(Vec2) -> f32,
    {
        if !(lo.is_finite() && hi.is_finite()) {
            return Err(SurfaceError::Draw(format!("non-finite bounds {lo} to {hi}")));
        }
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let max = Vec2::new(self.width as f32 - 1.0, self.height as f32 - 1.0);
        let lo = lo.floor().clamp(Vec2::ZERO, max);
        let hi = hi.ceil().clamp(Vec2::ZERO, max);
        for y in lo.y as u32..=hi.y as u32 {
            for x in lo.x as u32..=hi.x as u32 {
                let alpha = coverage(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                self.blend(x, y, color, alpha);
            }
        }
        Ok(())
    }

    /// Strokes a polyline with round joins and caps.
    fn stroke(&mut self, points: &[Vec2], width: f32, paint: Paint) -> Result<(), SurfaceError> {
        let Some(&first) = points.first() else {
            return Ok(());
        };
        let half = (width * 0.5).max(0.25);
        let reach = half + paint.glow + 1.0;
        let (lo, hi) = points
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));

        self.shade(lo - reach, hi + reach, paint.color, |pixel| {
            let d = points
                .windows(2)
                .map(|s| segment_distance(pixel, s[0], s[1]))
                .fold(pixel.distance(first), f32::min);
            element_alpha(d, half, paint.glow)
        })
    }
}

impl Surface for RasterSurface {
    fn begin(&mut self) -> Result<Vec2, SurfaceError> {
        self.check()?;
        Ok(Vec2::new(self.width as f32, self.height as f32))
    }

    fn clear(&mut self, color: Rgba) -> Result<(), SurfaceError> {
        self.check()?;
        self.pixels.fill([color.r, color.g, color.b, color.a]);
        Ok(())
    }

    fn circle(&mut self, center: Vec2, radius: f32, paint: Paint) -> Result<(), SurfaceError> {
        self.check()?;
        let reach = Vec2::splat(radius + paint.glow + 1.0);
        self.shade(center - reach, center + reach, paint.color, |pixel| {
            element_alpha(pixel.distance(center), radius, paint.glow)
        })
    }

    fn line(
        &mut self,
        from: Vec2,
        to: Vec2,
        width: f32,
        paint: Paint,
    ) -> Result<(), SurfaceError> {
        self.check()?;
        self.stroke(&[from, to], width, paint)
    }

    fn curve(
        &mut self,
        from: Vec2,
        control: Vec2,
        to: Vec2,
        width: f32,
        paint: Paint,
    ) -> Result<(), SurfaceError> {
        self.check()?;
        let length = from.distance(control) + control.distance(to);
        let segments =
            ((length * CURVE_SEGMENTS_PER_PX).ceil() as usize).clamp(2, MAX_CURVE_SEGMENTS);
        let points: Vec<Vec2> = (0..=segments)
            .map(|i| {
                let t = i as f32 / segments as f32;
                let u = 1.0 - t;
                from * (u * u) + control * (2.0 * u * t) + to * (t * t)
            })
            .collect();
        self.stroke(&points, width, paint)
    }
}

/// Opacity of an element at distance `d` from its spine: an anti-aliased
/// body of half-extent `half` plus a quadratic falloff halo `glow` wide.
fn element_alpha(d: f32, half: f32, glow: f32) -> f32 {
    let body = (half + 0.5 - d).clamp(0.0, 1.0);
    if glow <= 0.0 {
        return body;
    }
    let falloff = (1.0 - (d - half) / glow).clamp(0.0, 1.0);
    body.max(falloff * falloff * GLOW_STRENGTH)
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
