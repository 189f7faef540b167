//! Export controller: drives a scene through the frame loop into the encoder.

use std::path::PathBuf;

use serde::Serialize;

use framepipe_common::clock::ExportClock;
use framepipe_common::error::{FramepipeError, FramepipeResult};
use framepipe_encoder::{EncoderSettings, FrameSink};
use framepipe_scene_model::export::{ExportConfig, ExportDefaults, ExportRequest};
use framepipe_scene_model::framerate::Framerate;
use framepipe_scene_model::scene::{SceneDescription, SceneDocument};

use crate::cancel::CancellationToken;
use crate::engine::{EngineConfig, SceneEngine};
use crate::progress::{progress_percent, ExportProgress, ExportStage, ProgressCallback};
use crate::surface::{flip_rows, RenderSurface, SurfaceProvider, SurfaceSpec, Viewport};

/// What a finished export produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub output_path: PathBuf,
    pub frame_count: u64,
    pub frames_written: u64,
    pub bytes_written: u64,
    pub width: u32,
    pub height: u32,
    pub framerate: Framerate,
    pub backend: String,

    /// Wall-clock start of the export (RFC 3339).
    pub started_at: String,
    pub elapsed_secs: f64,
}

/// Result of [`ExportController::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Exported(ExportSummary),

    /// The document had no scene to export. No process was started.
    NothingToExport,
}

/// Renders exports with surfaces from `P` and encodes them with an
/// external encoder process.
///
/// Each export owns its surface, pipe and encoder exclusively; the
/// controller itself only keeps the provider and settings, so it can run
/// any number of exports one after the other.
pub struct ExportController<P: SurfaceProvider> {
    provider: P,
    encoder: EncoderSettings,
    engine_config: EngineConfig,
    cancel: CancellationToken,
}

impl<P: SurfaceProvider> ExportController<P> {
    pub fn new(provider: P, encoder: EncoderSettings) -> Self {
        Self {
            provider,
            encoder,
            engine_config: EngineConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` for cancellation instead of a private one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// A handle that cancels the running (and every later) export.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn encoder_settings(&self) -> &EncoderSettings {
        &self.encoder
    }

    /// Select a scene from `document`, resolve `request` against it and
    /// export it.
    ///
    /// An empty document is not an error: it yields
    /// [`ExportOutcome::NothingToExport`] without touching any resource.
    pub fn run<E>(
        &mut self,
        document: &SceneDocument,
        scene_name: Option<&str>,
        request: &ExportRequest,
        defaults: &ExportDefaults,
        engine: &mut E,
        progress: Option<ProgressCallback>,
    ) -> FramepipeResult<ExportOutcome>
    where
        E: SceneEngine<P::Surface>,
    {
        let Some(scene) = document.select(scene_name)? else {
            tracing::info!("Scene document is empty; nothing to export");
            return Ok(ExportOutcome::NothingToExport);
        };
        let config = request.resolve(scene, defaults)?;
        self.export(&config, scene, engine, progress)
            .map(ExportOutcome::Exported)
    }

    /// Render every frame of `scene` and stream it to a new encoder process.
    ///
    /// Resources are acquired in order: encoder (with its pipe), then
    /// surface. On any failure everything acquired so far is released and
    /// the encoder is reaped before the error is returned.
    ///
    /// A cancellation applies to the export in flight: the token is cleared
    /// once this returns, so the next export on this controller starts clean.
    pub fn export<E>(
        &mut self,
        config: &ExportConfig,
        scene: &SceneDescription,
        engine: &mut E,
        progress: Option<ProgressCallback>,
    ) -> FramepipeResult<ExportSummary>
    where
        E: SceneEngine<P::Surface>,
    {
        let result = self.export_once(config, scene, engine, progress);
        self.cancel.reset();
        result
    }

    fn export_once<E>(
        &mut self,
        config: &ExportConfig,
        scene: &SceneDescription,
        engine: &mut E,
        mut progress: Option<ProgressCallback>,
    ) -> FramepipeResult<ExportSummary>
    where
        E: SceneEngine<P::Surface>,
    {
        config.validate()?;
        let clock = ExportClock::start();
        let total_frames = config.frame_count();

        tracing::info!(
            output = %config.output_path.display(),
            scene = %scene.name,
            width = config.width,
            height = config.height,
            framerate = %config.framerate,
            frames = total_frames,
            backend = self.provider.name(),
            "Starting export"
        );

        let command = self.encoder.command_for(config);
        tracing::debug!(command = %command, "Encoder command");
        let mut sink = FrameSink::spawn(&command, self.encoder.stderr_tail_bytes)?;

        let mut surface = match self.provider.acquire(SurfaceSpec::for_export(config)) {
            Ok(surface) => surface,
            Err(err) => {
                tracing::error!(error = %err, "Surface acquisition failed");
                abandon(&mut sink);
                return Err(err);
            }
        };
        tracing::info!(
            backend = self.provider.name(),
            width = surface.width(),
            height = surface.height(),
            samples = surface.sample_count(),
            "Surface acquired"
        );

        let rendered = render_frames(
            config,
            scene,
            engine,
            &self.engine_config,
            &mut surface,
            &mut sink,
            &self.cancel,
            &clock,
            &mut progress,
        );

        if let Err(err) = rendered {
            drop(surface);
            return Err(fail(&mut sink, err));
        }

        emit(
            &mut progress,
            ExportProgress {
                percent: 100,
                frames_rendered: sink.frames_written(),
                total_frames,
                eta_secs: 0.0,
                stage: ExportStage::Finalizing,
            },
        );

        sink.close();
        drop(surface);
        let exit = sink.wait()?;
        if let Err(err) = exit.into_result() {
            tracing::error!(error = %err, "Encoder failed");
            return Err(err);
        }

        let summary = ExportSummary {
            output_path: config.output_path.clone(),
            frame_count: total_frames,
            frames_written: sink.frames_written(),
            bytes_written: sink.bytes_written(),
            width: config.width,
            height: config.height,
            framerate: config.framerate,
            backend: self.provider.name().to_string(),
            started_at: clock.epoch_wall().to_string(),
            elapsed_secs: clock.elapsed_secs(),
        };
        tracing::info!(
            output = %summary.output_path.display(),
            frames = summary.frames_written,
            bytes = summary.bytes_written,
            elapsed_secs = summary.elapsed_secs,
            "Export complete"
        );
        Ok(summary)
    }
}

#[allow(clippy::too_many_arguments)]
fn render_frames<S, E>(
    config: &ExportConfig,
    scene: &SceneDescription,
    engine: &mut E,
    engine_config: &EngineConfig,
    surface: &mut S,
    sink: &mut FrameSink,
    cancel: &CancellationToken,
    clock: &ExportClock,
    progress: &mut Option<ProgressCallback>,
) -> FramepipeResult<()>
where
    S: RenderSurface,
    E: SceneEngine<S>,
{
    let total_frames = config.frame_count();

    engine.configure(engine_config)?;
    engine.set_scene(scene)?;
    engine.set_viewport(Viewport::full(config.width, config.height));
    engine.set_clear_color(config.clear_color);

    if total_frames == 0 {
        emit(
            progress,
            ExportProgress {
                percent: 0,
                frames_rendered: 0,
                total_frames: 0,
                eta_secs: 0.0,
                stage: ExportStage::Preparing,
            },
        );
        return Ok(());
    }

    let flip = surface.row_order() != config.row_order;
    let row_bytes = config.width as usize * 4;
    let mut frame = vec![0u8; config.frame_size_bytes()];
    let mut last_logged_decile = 0u8;

    for index in 0..total_frames {
        let target = surface.make_current()?;
        engine.draw(target, config.timestamp(index))?;
        surface.read_pixels(&mut frame)?;
        if flip {
            flip_rows(&mut frame, row_bytes);
        }

        if cancel.is_cancelled() {
            return Err(FramepipeError::Cancelled {
                frames_written: sink.frames_written(),
            });
        }

        sink.write_frame(&frame)?;

        let percent = progress_percent(index, total_frames);
        let done = index + 1;
        emit(
            progress,
            ExportProgress {
                percent,
                frames_rendered: done,
                total_frames,
                eta_secs: clock.eta_secs(done as f64 / total_frames as f64),
                stage: ExportStage::Rendering,
            },
        );
        if percent / 10 > last_logged_decile {
            last_logged_decile = percent / 10;
            tracing::debug!(
                percent,
                frames = done,
                total_frames,
                "Export progress"
            );
        }

        surface.swap()?;
    }
    Ok(())
}

fn emit(progress: &mut Option<ProgressCallback>, report: ExportProgress) {
    if let Some(cb) = progress.as_mut() {
        cb(report);
    }
}

/// Finish the encoder after the frame loop failed with `err`.
///
/// A failed write usually means the encoder died; its exit status is the
/// more useful error, so it replaces the write error when non-zero.
fn fail(sink: &mut FrameSink, err: FramepipeError) -> FramepipeError {
    match err {
        FramepipeError::Write { frame, source } => {
            sink.close();
            match sink.wait() {
                Ok(exit) => match exit.into_result() {
                    Err(exit_err) => {
                        tracing::error!(frame, error = %exit_err, "Encoder exited mid-stream");
                        exit_err
                    }
                    Ok(_) => {
                        tracing::error!(frame, error = %source, "Frame write failed");
                        FramepipeError::Write { frame, source }
                    }
                },
                Err(wait_err) => {
                    tracing::warn!(error = %wait_err, "Could not reap encoder");
                    FramepipeError::Write { frame, source }
                }
            }
        }
        FramepipeError::Cancelled { frames_written } => {
            tracing::warn!(frames_written, "Export cancelled");
            abandon(sink);
            FramepipeError::Cancelled { frames_written }
        }
        other => {
            tracing::error!(error = %other, "Export failed");
            abandon(sink);
            other
        }
    }
}

/// Close the pipe, kill the encoder and reap it. Its output is discarded.
fn abandon(sink: &mut FrameSink) {
    if let Err(err) = sink.terminate() {
        tracing::warn!(error = %err, "Could not reap encoder");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::{SoftwareSceneRenderer, SoftwareSurfaceProvider};
    use framepipe_scene_model::export::{ClearColor, RowOrder};

    fn config(output: &str) -> ExportConfig {
        ExportConfig {
            output_path: PathBuf::from(output),
            width: 8,
            height: 8,
            framerate: Framerate::fps(10),
            duration_secs: 1.0,
            sample_count: 1,
            clear_color: ClearColor::BLACK,
            row_order: RowOrder::TopDown,
            extra_encoder_args: Vec::new(),
        }
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let mut controller = ExportController::new(
            SoftwareSurfaceProvider::new(),
            EncoderSettings::with_program("/nonexistent/encoder"),
        );
        let mut bad = config("out.mp4");
        bad.width = 0;
        let err = controller
            .export(
                &bad,
                &SceneDescription::default(),
                &mut SoftwareSceneRenderer::new(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, FramepipeError::Config { .. }));
        assert_eq!(controller.provider().surfaces_acquired(), 0);
    }

    #[test]
    fn test_missing_encoder_fails_before_surface() {
        let mut controller = ExportController::new(
            SoftwareSurfaceProvider::new(),
            EncoderSettings::with_program("/nonexistent/encoder"),
        );
        let err = controller
            .export(
                &config("out.mp4"),
                &SceneDescription::default(),
                &mut SoftwareSceneRenderer::new(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, FramepipeError::EncoderSpawn { .. }));
        assert_eq!(controller.provider().surfaces_acquired(), 0);
    }

    #[test]
    fn test_empty_document_is_nothing_to_export() {
        let mut controller = ExportController::new(
            SoftwareSurfaceProvider::new(),
            EncoderSettings::with_program("/nonexistent/encoder"),
        );
        let outcome = controller
            .run(
                &SceneDocument::default(),
                None,
                &ExportRequest::new("out.mp4"),
                &ExportDefaults::default(),
                &mut SoftwareSceneRenderer::new(),
                None,
            )
            .unwrap();
        assert_eq!(outcome, ExportOutcome::NothingToExport);
    }

    #[test]
    fn test_unknown_scene_is_scene_error() {
        let mut controller = ExportController::new(
            SoftwareSurfaceProvider::new(),
            EncoderSettings::with_program("/nonexistent/encoder"),
        );
        let document = SceneDocument::from_json(r#"{"scenes": [{"name": "a"}]}"#).unwrap();
        let err = controller
            .run(
                &document,
                Some("b"),
                &ExportRequest::new("out.mp4"),
                &ExportDefaults::default(),
                &mut SoftwareSceneRenderer::new(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, FramepipeError::Scene { .. }));
    }
}
