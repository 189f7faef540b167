//! The scene engine seam.

use framepipe_common::error::FramepipeResult;
use framepipe_scene_model::export::ClearColor;
use framepipe_scene_model::scene::SceneDescription;

use crate::surface::{RenderSurface, Viewport};

/// Windowing platform the engine should assume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Auto,
    Linux,
    MacOs,
    Windows,
}

/// Graphics API the engine should target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphicsApi {
    #[default]
    Auto,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

/// One-time engine setup, applied before the scene is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub platform: Platform,
    pub api: GraphicsApi,
    pub offscreen: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Auto,
            api: GraphicsApi::Auto,
            offscreen: true,
        }
    }
}

/// Renders a scene description into a surface of type `S`.
///
/// The engine owns no clock. `draw` renders the state at the given time and
/// must leave the surface's framebuffer holding the complete frame when it
/// returns.
pub trait SceneEngine<S: RenderSurface> {
    fn configure(&mut self, config: &EngineConfig) -> FramepipeResult<()>;

    fn set_scene(&mut self, scene: &SceneDescription) -> FramepipeResult<()>;

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_clear_color(&mut self, color: ClearColor);

    fn draw(&mut self, target: S::Target<'_>, time: f64) -> FramepipeResult<()>;
}
