//! Export configuration types.
//!
//! An [`ExportConfig`] is the fully resolved, validated description of one
//! export run. [`ExportRequest`] is what a caller asks for; it is merged with
//! a scene's own defaults and the application defaults to produce a config.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use framepipe_common::config::RenderDefaults;

use crate::error::ModelError;
use crate::framerate::Framerate;
use crate::scene::SceneDescription;

/// Largest accepted output width or height in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// Bytes per pixel of the raw stream handed to the encoder (8-bit RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// Background color used to clear each frame, as linear RGBA in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClearColor(pub [f32; 4]);

impl ClearColor {
    pub const BLACK: ClearColor = ClearColor([0.0, 0.0, 0.0, 1.0]);

    pub fn r(&self) -> f32 {
        self.0[0]
    }

    pub fn g(&self) -> f32 {
        self.0[1]
    }

    pub fn b(&self) -> f32 {
        self.0[2]
    }

    pub fn a(&self) -> f32 {
        self.0[3]
    }

    /// Quantize to 8-bit RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for ClearColor {
    type Err = ModelError;

    /// Parse `"r,g,b,a"` (or `"r,g,b"` with opaque alpha).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ModelError::validation(format!("invalid clear color `{s}`")))?;
        match parts.as_slice() {
            [r, g, b] => Ok(Self([*r, *g, *b, 1.0])),
            [r, g, b, a] => Ok(Self([*r, *g, *b, *a])),
            _ => Err(ModelError::validation(format!(
                "clear color `{s}` must have 3 or 4 components"
            ))),
        }
    }
}

/// Row order of the frames delivered to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowOrder {
    /// First row in the stream is the top of the image.
    #[default]
    TopDown,
    /// First row in the stream is the bottom of the image.
    BottomUp,
}

impl fmt::Display for RowOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOrder::TopDown => f.write_str("top-down"),
            RowOrder::BottomUp => f.write_str("bottom-up"),
        }
    }
}

impl FromStr for RowOrder {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top-down" | "topdown" | "top_down" => Ok(RowOrder::TopDown),
            "bottom-up" | "bottomup" | "bottom_up" => Ok(RowOrder::BottomUp),
            other => Err(ModelError::validation(format!(
                "invalid row order `{other}` (expected top-down or bottom-up)"
            ))),
        }
    }
}

/// A fully resolved export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// File created (or overwritten) by the encoder.
    pub output_path: PathBuf,

    /// Output resolution in pixels.
    pub width: u32,
    pub height: u32,

    pub framerate: Framerate,

    /// Length of the export in seconds.
    pub duration_secs: f64,

    /// Multisample count (0 or 1 = no multisampling).
    pub sample_count: u32,

    pub clear_color: ClearColor,

    /// Row order the encoder expects.
    #[serde(default)]
    pub row_order: RowOrder,

    /// Extra encoder arguments, inserted before the output path.
    #[serde(default)]
    pub extra_encoder_args: Vec<String>,
}

impl ExportConfig {
    /// Check the config before any resource is touched.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.width == 0 || self.height == 0 {
            return Err(ModelError::validation(format!(
                "dimensions must be positive (got {}x{})",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ModelError::validation(format!(
                "dimensions {}x{} exceed the {MAX_DIMENSION}px limit",
                self.width, self.height
            )));
        }
        if self.framerate.num == 0 || self.framerate.den == 0 {
            return Err(ModelError::validation(format!(
                "framerate {} must have a positive numerator and denominator",
                self.framerate
            )));
        }
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(ModelError::validation(format!(
                "duration must be a non-negative number of seconds (got {})",
                self.duration_secs
            )));
        }
        if self.clear_color.0.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::validation("clear color components must be finite"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ModelError::validation("output path is empty"));
        }
        Ok(())
    }

    /// Number of frames this export produces.
    pub fn frame_count(&self) -> u64 {
        self.framerate.frame_count(self.duration_secs)
    }

    /// Presentation time of frame `index` in seconds.
    pub fn timestamp(&self, index: u64) -> f64 {
        self.framerate.timestamp(index)
    }

    /// Size of one raw RGBA8 frame in bytes.
    pub fn frame_size_bytes(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Exact number of bytes the encoder will receive.
    pub fn total_bytes(&self) -> u64 {
        self.frame_count() * self.frame_size_bytes() as u64
    }

    /// Whether the framebuffer should be multisampled.
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }
}

/// Values used when neither the request nor the scene specifies one.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefaults {
    pub width: u32,
    pub height: u32,
    pub framerate: Framerate,
    pub sample_count: u32,
    pub row_order: RowOrder,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            framerate: Framerate::fps(60),
            sample_count: 4,
            row_order: RowOrder::TopDown,
        }
    }
}

impl TryFrom<&RenderDefaults> for ExportDefaults {
    type Error = ModelError;

    /// Parse the string-typed fields of the `[render]` config section.
    fn try_from(render: &RenderDefaults) -> Result<Self, Self::Error> {
        Ok(Self {
            width: render.width,
            height: render.height,
            framerate: render.framerate.parse()?,
            sample_count: render.sample_count,
            row_order: render.row_order.parse()?,
        })
    }
}

/// What a caller asks to export. Unset fields fall back to the scene, then
/// to [`ExportDefaults`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportRequest {
    pub output_path: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub framerate: Option<Framerate>,
    pub duration_secs: Option<f64>,
    pub sample_count: Option<u32>,
    pub clear_color: Option<ClearColor>,
    pub row_order: Option<RowOrder>,
    pub extra_encoder_args: Vec<String>,
}

impl ExportRequest {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Merge with the scene's defaults and `defaults`, then validate.
    ///
    /// A scene without an explicit duration lasts until its last keyframe.
    pub fn resolve(
        &self,
        scene: &SceneDescription,
        defaults: &ExportDefaults,
    ) -> Result<ExportConfig, ModelError> {
        let config = ExportConfig {
            output_path: self.output_path.clone(),
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            framerate: self
                .framerate
                .or(scene.framerate)
                .unwrap_or(defaults.framerate),
            duration_secs: self
                .duration_secs
                .or(scene.duration_secs)
                .unwrap_or_else(|| scene.natural_duration()),
            sample_count: self
                .sample_count
                .or(scene.samples)
                .unwrap_or(defaults.sample_count),
            clear_color: self.clear_color.or(scene.clear_color).unwrap_or_default(),
            row_order: self.row_order.unwrap_or(defaults.row_order),
            extra_encoder_args: self.extra_encoder_args.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}
