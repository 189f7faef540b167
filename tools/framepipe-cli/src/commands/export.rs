//! Export a scene to video.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use framepipe_common::config::{AppConfig, RenderBackendKind};
use framepipe_encoder::EncoderSettings;
use framepipe_render_engine::software::{SoftwareSceneRenderer, SoftwareSurfaceProvider};
use framepipe_render_engine::{
    CancellationToken, ExportController, ExportOutcome, ExportProgress, ExportStage,
    ProgressCallback,
};
use framepipe_scene_model::export::{ClearColor, ExportDefaults, ExportRequest, RowOrder};
use framepipe_scene_model::framerate::Framerate;
use framepipe_scene_model::scene::SceneDocument;

#[derive(Args)]
pub struct ExportArgs {
    /// Path to the scene document
    path: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Scene to export (defaults to the first scene)
    #[arg(long)]
    scene: Option<String>,

    /// Output width
    #[arg(long)]
    width: Option<u32>,

    /// Output height
    #[arg(long)]
    height: Option<u32>,

    /// Frame rate as `num/den` or an integer
    #[arg(long)]
    framerate: Option<Framerate>,

    /// Length in seconds (defaults to the scene's duration)
    #[arg(long)]
    duration: Option<f64>,

    /// Multisample count
    #[arg(long)]
    samples: Option<u32>,

    /// Clear color as `r,g,b[,a]` in [0, 1]
    #[arg(long)]
    clear_color: Option<ClearColor>,

    /// Row order of the raw frames: top-down|bottom-up
    #[arg(long)]
    row_order: Option<RowOrder>,

    /// Render backend: software|gpu
    #[arg(long)]
    backend: Option<String>,

    /// Encoder executable
    #[arg(long)]
    encoder: Option<String>,

    /// Extra encoder arguments, placed before the output path
    #[arg(last = true)]
    encoder_args: Vec<String>,
}

pub async fn run(args: ExportArgs, config: &AppConfig) -> anyhow::Result<()> {
    let backend = match args.backend.as_deref() {
        None => config.render.backend,
        Some("software") => RenderBackendKind::Software,
        Some("gpu") => RenderBackendKind::Gpu,
        Some(other) => {
            return Err(anyhow::anyhow!(
                "Unknown backend: {other}. Use: software, gpu"
            ));
        }
    };

    let document = SceneDocument::load(&args.path)
        .map_err(|e| anyhow::anyhow!("Failed to load scene document: {e}"))?;
    let defaults = ExportDefaults::try_from(&config.render)
        .map_err(|e| anyhow::anyhow!("Invalid [render] configuration: {e}"))?;

    let mut encoder = EncoderSettings::from(&config.encoder);
    if let Some(program) = args.encoder {
        encoder.program = program;
    }

    let request = ExportRequest {
        output_path: args.output.clone(),
        width: args.width,
        height: args.height,
        framerate: args.framerate,
        duration_secs: args.duration,
        sample_count: args.samples,
        clear_color: args.clear_color,
        row_order: args.row_order,
        extra_encoder_args: args.encoder_args,
    };

    println!("Exporting {}", args.path.display());
    println!("  Output: {}", args.output.display());
    println!("  Backend: {backend:?}");
    println!("  Encoder: {}", encoder.program);

    let token = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling export");
                token.cancel();
            }
        }
    });

    let scene = args.scene;
    let outcome = tokio::task::spawn_blocking(move || {
        let progress = Some(progress_printer());
        match backend {
            RenderBackendKind::Software => {
                let mut controller = ExportController::new(SoftwareSurfaceProvider::new(), encoder)
                    .with_cancellation(token);
                let mut engine = SoftwareSceneRenderer::new();
                controller.run(
                    &document,
                    scene.as_deref(),
                    &request,
                    &defaults,
                    &mut engine,
                    progress,
                )
            }
            #[cfg(feature = "gpu")]
            RenderBackendKind::Gpu => {
                use framepipe_render_engine::gpu::{GpuSceneRenderer, GpuSurfaceProvider};

                let mut controller = ExportController::new(GpuSurfaceProvider::new(), encoder)
                    .with_cancellation(token);
                let mut engine = GpuSceneRenderer::new();
                controller.run(
                    &document,
                    scene.as_deref(),
                    &request,
                    &defaults,
                    &mut engine,
                    progress,
                )
            }
            #[cfg(not(feature = "gpu"))]
            RenderBackendKind::Gpu => Err(framepipe_common::error::FramepipeError::config(
                "this build has no GPU backend (rebuild with `--features gpu`)",
            )),
        }
    })
    .await;
    ctrl_c.abort();

    match outcome? {
        Ok(ExportOutcome::Exported(summary)) => {
            println!();
            println!(
                "Export complete: {} ({} frames, {}x{} @ {}, {:.2}s)",
                summary.output_path.display(),
                summary.frames_written,
                summary.width,
                summary.height,
                summary.framerate,
                summary.elapsed_secs,
            );
            tracing::debug!(summary = %serde_json::to_string(&summary)?, "Export summary");
            Ok(())
        }
        Ok(ExportOutcome::NothingToExport) => {
            println!("Scene document has no scenes; nothing to export.");
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Export failed: {e}"))
        }
    }
}

fn progress_printer() -> ProgressCallback {
    Box::new(|p: ExportProgress| {
        let mut stdout = std::io::stdout().lock();
        let _ = match p.stage {
            ExportStage::Finalizing => write!(stdout, "\r{:>3}% finalizing...          ", p.percent),
            _ => write!(
                stdout,
                "\r{:>3}% ({}/{} frames, ETA: {:.0}s)  ",
                p.percent, p.frames_rendered, p.total_frames, p.eta_secs,
            ),
        };
        let _ = stdout.flush();
    })
}
