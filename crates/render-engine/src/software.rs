//! CPU rasterizer backend.
//!
//! Mirrors what a GPU framebuffer does for this scene model: an RGBA8 color
//! buffer and a packed D24S8 depth-stencil buffer, each holding
//! `sample_count` samples per pixel. Coverage is tested per sample at fixed
//! sub-pixel positions, then samples are averaged into the resolved frame on
//! readback. Depth testing is less-or-equal, blending is source-over.

use framepipe_common::error::{FramepipeError, FramepipeResult};
use framepipe_scene_model::export::{ClearColor, RowOrder, MAX_DIMENSION};
use framepipe_scene_model::scene::SceneDescription;

use crate::compositor::{compose, DrawRect};
use crate::engine::{EngineConfig, SceneEngine};
use crate::surface::{RenderSurface, SurfaceProvider, SurfaceSpec, Viewport};

/// Sample counts the rasterizer has sample patterns for.
pub const SUPPORTED_SAMPLE_COUNTS: [u32; 5] = [1, 2, 4, 8, 16];

const DEPTH_MAX: u32 = 0x00FF_FFFF;
const DEPTH_STENCIL_CLEAR: u32 = DEPTH_MAX << 8;

// Standard sample positions in 1/16 pixel units, relative to the pixel center.
const PATTERN_1: [(i8, i8); 1] = [(0, 0)];
const PATTERN_2: [(i8, i8); 2] = [(4, 4), (-4, -4)];
const PATTERN_4: [(i8, i8); 4] = [(-2, -6), (6, -2), (-6, 2), (2, 6)];
const PATTERN_8: [(i8, i8); 8] = [
    (1, -3),
    (-1, 3),
    (5, 1),
    (-3, -5),
    (-5, 5),
    (-7, -1),
    (3, 7),
    (7, -7),
];
const PATTERN_16: [(i8, i8); 16] = [
    (1, 1),
    (-1, -3),
    (-3, 2),
    (4, -1),
    (-5, -2),
    (2, 5),
    (5, 3),
    (3, -5),
    (-2, 6),
    (0, -7),
    (-4, -6),
    (-6, 4),
    (-8, 0),
    (7, -4),
    (6, 7),
    (-7, -8),
];

fn sample_pattern(samples: u32) -> &'static [(i8, i8)] {
    match samples {
        16 => &PATTERN_16,
        8 => &PATTERN_8,
        4 => &PATTERN_4,
        2 => &PATTERN_2,
        _ => &PATTERN_1,
    }
}

/// Largest supported sample count not above `requested`.
pub fn supported_sample_count(requested: u32) -> u32 {
    let requested = requested.max(1);
    SUPPORTED_SAMPLE_COUNTS
        .iter()
        .copied()
        .filter(|&count| count <= requested)
        .max()
        .unwrap_or(1)
}

/// Hands out [`SoftwareSurface`]s.
#[derive(Debug, Default)]
pub struct SoftwareSurfaceProvider {
    acquired: u64,
}

impl SoftwareSurfaceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surfaces acquired over this provider's lifetime.
    pub fn surfaces_acquired(&self) -> u64 {
        self.acquired
    }
}

impl SurfaceProvider for SoftwareSurfaceProvider {
    type Surface = SoftwareSurface;

    fn name(&self) -> &str {
        "software"
    }

    fn acquire(&mut self, spec: SurfaceSpec) -> FramepipeResult<SoftwareSurface> {
        let surface = SoftwareSurface::new(spec)?;
        self.acquired += 1;
        tracing::debug!(
            width = spec.width,
            height = spec.height,
            samples = surface.samples,
            "Software surface acquired"
        );
        Ok(surface)
    }
}

/// Multisampled color and depth-stencil buffers in main memory.
#[derive(Debug)]
pub struct SoftwareSurface {
    width: u32,
    height: u32,
    samples: u32,
    color: Vec<[u8; 4]>,
    depth_stencil: Vec<u32>,
    presented: u64,
}

impl SoftwareSurface {
    fn new(spec: SurfaceSpec) -> FramepipeResult<Self> {
        if spec.width == 0 || spec.height == 0 {
            return Err(FramepipeError::surface(format!(
                "cannot allocate a {}x{} surface",
                spec.width, spec.height
            )));
        }
        if spec.width > MAX_DIMENSION || spec.height > MAX_DIMENSION {
            return Err(FramepipeError::surface(format!(
                "{}x{} exceeds the {MAX_DIMENSION}px surface limit",
                spec.width, spec.height
            )));
        }

        let samples = supported_sample_count(spec.sample_count);
        if samples != spec.effective_samples() {
            tracing::warn!(
                requested = spec.sample_count,
                fallback = samples,
                "Requested sample count not supported by the software rasterizer; falling back"
            );
        }

        let len = spec.width as usize * spec.height as usize * samples as usize;
        let mut color = Vec::new();
        let mut depth_stencil = Vec::new();
        color.try_reserve_exact(len).map_err(|e| {
            FramepipeError::surface(format!("color buffer allocation failed: {e}"))
        })?;
        depth_stencil.try_reserve_exact(len).map_err(|e| {
            FramepipeError::surface(format!("depth-stencil buffer allocation failed: {e}"))
        })?;
        color.resize(len, [0, 0, 0, 0]);
        depth_stencil.resize(len, DEPTH_STENCIL_CLEAR);

        Ok(Self {
            width: spec.width,
            height: spec.height,
            samples,
            color,
            depth_stencil,
            presented: 0,
        })
    }

    /// Frames flushed through [`RenderSurface::swap`].
    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    /// Raw packed D24S8 value of one sample.
    pub fn depth_stencil_at(&self, x: u32, y: u32, sample: u32) -> Option<u32> {
        if x >= self.width || y >= self.height || sample >= self.samples {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * self.samples as usize
            + sample as usize;
        self.depth_stencil.get(index).copied()
    }
}

impl RenderSurface for SoftwareSurface {
    type Target<'a> = SoftwareTarget<'a>;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample_count(&self) -> u32 {
        self.samples
    }

    fn row_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn make_current(&mut self) -> FramepipeResult<SoftwareTarget<'_>> {
        Ok(SoftwareTarget {
            width: self.width,
            height: self.height,
            pattern: sample_pattern(self.samples),
            color: &mut self.color,
            depth_stencil: &mut self.depth_stencil,
        })
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> FramepipeResult<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if out.len() != expected {
            return Err(FramepipeError::surface(format!(
                "readback buffer is {} bytes, frame needs {expected}",
                out.len()
            )));
        }

        let n = self.samples as usize;
        for (pixel, samples) in out.chunks_exact_mut(4).zip(self.color.chunks_exact(n)) {
            for channel in 0..4 {
                let sum: usize = samples.iter().map(|s| s[channel] as usize).sum();
                pixel[channel] = ((sum + n / 2) / n) as u8;
            }
        }
        Ok(())
    }

    fn swap(&mut self) -> FramepipeResult<()> {
        // Rasterization is synchronous; there is no queued work to wait for.
        self.presented += 1;
        Ok(())
    }
}

/// Drawing handle for a current [`SoftwareSurface`].
pub struct SoftwareTarget<'a> {
    width: u32,
    height: u32,
    pattern: &'static [(i8, i8)],
    color: &'a mut [[u8; 4]],
    depth_stencil: &'a mut [u32],
}

impl SoftwareTarget<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clear color to `color`, depth to the far plane and stencil to zero.
    pub fn clear(&mut self, color: ClearColor) {
        let rgba = color.to_rgba8();
        self.color.fill(rgba);
        self.depth_stencil.fill(DEPTH_STENCIL_CLEAR);
    }

    /// Rasterize one rectangle with depth test and source-over blending.
    pub fn fill_rect(&mut self, rect: &DrawRect) {
        let n = self.pattern.len();
        let depth = quantize_depth(rect.depth);

        // Sample offsets stay within half a pixel of the center.
        let px0 = (rect.x0.floor() as i64 - 1).max(0) as u32;
        let py0 = (rect.y0.floor() as i64 - 1).max(0) as u32;
        let px1 = (rect.x1.ceil() as i64 + 1).clamp(0, self.width as i64) as u32;
        let py1 = (rect.y1.ceil() as i64 + 1).clamp(0, self.height as i64) as u32;

        for py in py0..py1 {
            for px in px0..px1 {
                let base = (py as usize * self.width as usize + px as usize) * n;
                for (s, &(ox, oy)) in self.pattern.iter().enumerate() {
                    let sx = px as f32 + 0.5 + ox as f32 / 16.0;
                    let sy = py as f32 + 0.5 + oy as f32 / 16.0;
                    if !rect.contains(sx, sy) {
                        continue;
                    }
                    let index = base + s;
                    let stored = self.depth_stencil[index];
                    if depth > stored >> 8 {
                        continue;
                    }
                    self.depth_stencil[index] = (depth << 8) | (stored & 0xFF);
                    self.color[index] = blend_over(self.color[index], rect.color);
                }
            }
        }
    }
}

fn quantize_depth(depth: f32) -> u32 {
    (depth.clamp(0.0, 1.0) * DEPTH_MAX as f32).round() as u32
}

fn blend_over(dst: [u8; 4], src: [f32; 4]) -> [u8; 4] {
    let a = src[3].clamp(0.0, 1.0);
    let inv = 1.0 - a;
    let mut out = [0u8; 4];
    for channel in 0..3 {
        let d = dst[channel] as f32 / 255.0;
        out[channel] = to_u8(src[channel] * a + d * inv);
    }
    out[3] = to_u8(a + dst[3] as f32 / 255.0 * inv);
    out
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Scene engine drawing through the software rasterizer.
#[derive(Debug, Default)]
pub struct SoftwareSceneRenderer {
    configured: bool,
    scene: Option<SceneDescription>,
    viewport: Option<Viewport>,
    clear_color: ClearColor,
}

impl SoftwareSceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneEngine<SoftwareSurface> for SoftwareSceneRenderer {
    fn configure(&mut self, config: &EngineConfig) -> FramepipeResult<()> {
        if !config.offscreen {
            return Err(FramepipeError::config(
                "the software renderer only renders off-screen",
            ));
        }
        self.configured = true;
        Ok(())
    }

    fn set_scene(&mut self, scene: &SceneDescription) -> FramepipeResult<()> {
        scene.validate()?;
        self.scene = Some(scene.clone());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    fn draw(&mut self, mut target: SoftwareTarget<'_>, time: f64) -> FramepipeResult<()> {
        if !self.configured {
            return Err(FramepipeError::scene("draw called before the renderer was configured"));
        }
        let scene = self
            .scene
            .as_ref()
            .ok_or_else(|| FramepipeError::scene("draw called before a scene was bound"))?;
        let viewport = self
            .viewport
            .unwrap_or_else(|| Viewport::full(target.width(), target.height()));

        target.clear(self.clear_color);
        for rect in compose(scene, time, viewport)? {
            target.fill_rect(&rect);
        }
        Ok(())
    }
}
