//! Framepipe Render Engine
//!
//! Offscreen rendering surfaces, the scene engine seam, and the controller
//! that drives an animated scene frame by frame into an external encoder.
//!
//! # Pipeline Architecture
//!
//! ```text
//! SceneDescription ──▶ SceneEngine::draw(t) ──▶ RenderSurface
//!                                                    │ read_pixels
//!                                                    ▼
//!                                              RGBA8 frame ──▶ FrameSink ──▶ encoder ──▶ output
//! ```
//!
//! For every frame `i` the controller makes the surface current, draws at
//! `i * den / num` seconds, reads the resolved frame back, writes it to the
//! encoder pipe, reports progress, then swaps.
//!
//! Backends:
//! - [`software`]: CPU rasterizer, always available
//! - `gpu`: headless wgpu device (cargo feature `gpu`)

pub mod cancel;
pub mod compositor;
pub mod engine;
pub mod export;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod progress;
pub mod software;
pub mod surface;

pub use cancel::CancellationToken;
pub use engine::{EngineConfig, GraphicsApi, Platform, SceneEngine};
pub use export::*;
pub use progress::*;
pub use surface::{RenderSurface, SurfaceProvider, SurfaceSpec, Viewport};
