//! Frame compositor: evaluates a scene at one time into pixel-space draws.
//!
//! Both backends consume the same [`DrawRect`] list, so a scene looks the
//! same whichever backend renders it.

use framepipe_common::error::{FramepipeError, FramepipeResult};
use framepipe_scene_model::scene::SceneDescription;

use crate::surface::Viewport;

/// One rectangle to fill, in target pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    /// Left edge (inclusive).
    pub x0: f32,
    /// Top edge (inclusive).
    pub y0: f32,
    /// Right edge (exclusive).
    pub x1: f32,
    /// Bottom edge (exclusive).
    pub y1: f32,

    /// Straight-alpha RGBA in `[0, 1]`.
    pub color: [f32; 4],

    /// Depth in `[0, 1]`, smaller is nearer.
    pub depth: f32,
}

impl DrawRect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Whether the sample point `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Evaluate every layer of `scene` at `time` and map it into `viewport`.
///
/// Rectangles keep paint order, are clipped to the viewport, and are
/// dropped when nothing of them remains.
pub fn compose(
    scene: &SceneDescription,
    time: f64,
    viewport: Viewport,
) -> FramepipeResult<Vec<DrawRect>> {
    if viewport.is_empty() {
        return Ok(Vec::new());
    }

    let vx = viewport.x as f64;
    let vy = viewport.y as f64;
    let vw = viewport.width as f64;
    let vh = viewport.height as f64;

    let mut rects = Vec::with_capacity(scene.layers.len());
    for (index, layer) in scene.layers.iter().enumerate() {
        let state = layer.evaluate(time).ok_or_else(|| {
            FramepipeError::scene(format!(
                "layer {index} ({}) of scene `{}` has no keyframes",
                layer.name, scene.name
            ))
        })?;

        // Negative sizes extend left/up from the anchor.
        let (ax, bx) = ordered(state.x, state.x + state.width);
        let (ay, by) = ordered(state.y, state.y + state.height);

        let x0 = (vx + ax * vw).max(vx);
        let x1 = (vx + bx * vw).min(vx + vw);
        let y0 = (vy + ay * vh).max(vy);
        let y1 = (vy + by * vh).min(vy + vh);
        if !(x1 > x0 && y1 > y0) {
            continue;
        }

        rects.push(DrawRect {
            x0: x0 as f32,
            y0: y0 as f32,
            x1: x1 as f32,
            y1: y1 as f32,
            color: state.color.map(|c| unit(c) as f32),
            depth: unit(state.depth) as f32,
        });
    }
    Ok(rects)
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
