//! Shared fixtures: shell-script encoders and a surface that records calls.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use framepipe_common::error::{FramepipeError, FramepipeResult};
use framepipe_encoder::EncoderSettings;
use framepipe_render_engine::software::{
    SoftwareSceneRenderer, SoftwareSurface, SoftwareSurfaceProvider, SoftwareTarget,
};
use framepipe_render_engine::{
    EngineConfig, RenderSurface, SceneEngine, SurfaceProvider, SurfaceSpec, Viewport,
};
use framepipe_scene_model::animation::Animated;
use framepipe_scene_model::export::{ClearColor, ExportConfig, RowOrder};
use framepipe_scene_model::framerate::Framerate;
use framepipe_scene_model::scene::{Layer, SceneDescription};

/// Copies stdin to the last argument, which is the output path.
pub const CAT_TO_OUTPUT: &str = "for last; do :; done\ncat > \"$last\"";

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "framepipe_test_export_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Encoder settings running `body` as a shell script through `sh`.
pub fn script_encoder(dir: &Path, body: &str) -> EncoderSettings {
    let script = dir.join("encoder.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    EncoderSettings {
        program: "sh".to_string(),
        program_args: vec![script.to_string_lossy().into_owned()],
        extra_args: Vec::new(),
        stderr_tail_bytes: 4096,
    }
}

pub fn export_config(output: &Path, width: u32, height: u32, fps: u32, duration: f64) -> ExportConfig {
    ExportConfig {
        output_path: output.to_path_buf(),
        width,
        height,
        framerate: Framerate::fps(fps),
        duration_secs: duration,
        sample_count: 1,
        clear_color: ClearColor::BLACK,
        row_order: RowOrder::TopDown,
        extra_encoder_args: Vec::new(),
    }
}

/// One opaque layer covering the top half of the frame.
pub fn top_band_scene(color: [f64; 4]) -> SceneDescription {
    SceneDescription {
        name: "top-band".to_string(),
        layers: vec![Layer {
            name: "band".to_string(),
            x: Animated::Constant(0.0),
            y: Animated::Constant(0.0),
            width: Animated::Constant(1.0),
            height: Animated::Constant(0.5),
            color: Animated::Constant(color),
            depth: Animated::Constant(0.0),
        }],
        ..Default::default()
    }
}

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Software provider whose surfaces record every call, optionally failing
/// to acquire.
pub struct RecordingProvider {
    inner: SoftwareSurfaceProvider,
    log: CallLog,
    fail_acquire: bool,
}

impl RecordingProvider {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: SoftwareSurfaceProvider::new(),
            log,
            fail_acquire: false,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            fail_acquire: true,
            ..Self::new(log)
        }
    }
}

impl SurfaceProvider for RecordingProvider {
    type Surface = RecordingSurface;

    fn name(&self) -> &str {
        "recording"
    }

    fn acquire(&mut self, spec: SurfaceSpec) -> FramepipeResult<RecordingSurface> {
        if self.fail_acquire {
            return Err(FramepipeError::surface("no graphics device in this test"));
        }
        let inner = self.inner.acquire(spec)?;
        self.log.lock().unwrap().push("acquire".to_string());
        Ok(RecordingSurface {
            inner,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct RecordingSurface {
    inner: SoftwareSurface,
    log: CallLog,
}

impl Drop for RecordingSurface {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("release".to_string());
    }
}

impl RenderSurface for RecordingSurface {
    type Target<'a> = SoftwareTarget<'a>;

    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn sample_count(&self) -> u32 {
        self.inner.sample_count()
    }

    fn row_order(&self) -> RowOrder {
        self.inner.row_order()
    }

    fn make_current(&mut self) -> FramepipeResult<SoftwareTarget<'_>> {
        self.log.lock().unwrap().push("make_current".to_string());
        self.inner.make_current()
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> FramepipeResult<()> {
        self.log.lock().unwrap().push("read".to_string());
        self.inner.read_pixels(out)
    }

    fn swap(&mut self) -> FramepipeResult<()> {
        self.log.lock().unwrap().push("swap".to_string());
        self.inner.swap()
    }
}

/// Software renderer that logs draw times and can fail on a given frame.
pub struct RecordingEngine {
    inner: SoftwareSceneRenderer,
    log: CallLog,
    fail_at: Option<f64>,
}

impl RecordingEngine {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: SoftwareSceneRenderer::new(),
            log,
            fail_at: None,
        }
    }

    pub fn failing_at(log: CallLog, time: f64) -> Self {
        Self {
            fail_at: Some(time),
            ..Self::new(log)
        }
    }
}

impl SceneEngine<RecordingSurface> for RecordingEngine {
    fn configure(&mut self, config: &EngineConfig) -> FramepipeResult<()> {
        SceneEngine::<SoftwareSurface>::configure(&mut self.inner, config)
    }

    fn set_scene(&mut self, scene: &SceneDescription) -> FramepipeResult<()> {
        self.log.lock().unwrap().push("set_scene".to_string());
        SceneEngine::<SoftwareSurface>::set_scene(&mut self.inner, scene)
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        SceneEngine::<SoftwareSurface>::set_viewport(&mut self.inner, viewport)
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        SceneEngine::<SoftwareSurface>::set_clear_color(&mut self.inner, color)
    }

    fn draw(&mut self, target: SoftwareTarget<'_>, time: f64) -> FramepipeResult<()> {
        self.log.lock().unwrap().push(format!("draw {time:.4}"));
        if self.fail_at == Some(time) {
            return Err(FramepipeError::scene("engine failed to draw"));
        }
        SceneEngine::<SoftwareSurface>::draw(&mut self.inner, target, time)
    }
}

pub fn percents(events: &Mutex<Vec<u8>>) -> Vec<u8> {
    events.lock().unwrap().clone()
}
