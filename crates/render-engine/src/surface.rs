//! Offscreen render surfaces.
//!
//! A surface bundles a graphics context, a (possibly multisampled) color
//! target and a combined depth-stencil attachment. Acquiring one is the only
//! way to get a [`RenderSurface`]; dropping it releases everything, so every
//! exit path of an export gives the resources back.

use framepipe_common::error::FramepipeResult;
use framepipe_scene_model::export::{ExportConfig, RowOrder};

/// Size and multisampling of a surface to acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub width: u32,
    pub height: u32,

    /// Requested samples per pixel. 0 and 1 both mean no multisampling.
    pub sample_count: u32,
}

impl SurfaceSpec {
    pub fn for_export(config: &ExportConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            sample_count: config.sample_count,
        }
    }

    /// Sample count with 0 folded into 1.
    pub fn effective_samples(&self) -> u32 {
        self.sample_count.max(1)
    }

    /// Bytes in one resolved RGBA8 frame.
    pub fn frame_size_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Pixel rectangle the scene is mapped into, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a whole `width` x `height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An acquired offscreen surface.
///
/// Drawing goes through the handle returned by [`make_current`], which
/// borrows the surface mutably. Nothing can draw into a surface that has
/// not been made current, and readback cannot overlap a draw.
///
/// [`make_current`]: RenderSurface::make_current
pub trait RenderSurface {
    /// Explicit context handle passed to the scene engine for one draw.
    type Target<'a>
    where
        Self: 'a;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Samples per pixel actually allocated (may be lower than requested).
    fn sample_count(&self) -> u32;

    /// Order of rows produced by [`read_pixels`](RenderSurface::read_pixels).
    fn row_order(&self) -> RowOrder;

    /// Bind this surface's context and framebuffer for drawing.
    ///
    /// Idempotent. Must be called before every draw.
    fn make_current(&mut self) -> FramepipeResult<Self::Target<'_>>;

    /// Resolve and copy the rendered frame into `out` as RGBA8.
    ///
    /// `out` must be exactly `width * height * 4` bytes.
    fn read_pixels(&mut self, out: &mut [u8]) -> FramepipeResult<()>;

    /// Flush outstanding work and wait for it to finish.
    fn swap(&mut self) -> FramepipeResult<()>;
}

/// Creates surfaces for one backend.
pub trait SurfaceProvider {
    type Surface: RenderSurface;

    /// Backend name for logs and summaries.
    fn name(&self) -> &str;

    fn acquire(&mut self, spec: SurfaceSpec) -> FramepipeResult<Self::Surface>;
}

/// Reverse the row order of a tightly packed image in place.
pub fn flip_rows(pixels: &mut [u8], row_bytes: usize) {
    if row_bytes == 0 {
        return;
    }
    let rows = pixels.len() / row_bytes;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = pixels.split_at_mut(bottom * row_bytes);
        head[top * row_bytes..(top + 1) * row_bytes].swap_with_slice(&mut tail[..row_bytes]);
    }
}
