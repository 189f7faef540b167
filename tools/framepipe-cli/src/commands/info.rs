//! Show scene document information.

use std::path::PathBuf;

use framepipe_common::config::AppConfig;
use framepipe_scene_model::export::ExportDefaults;
use framepipe_scene_model::scene::SceneDocument;

pub fn run(path: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    let document = SceneDocument::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load scene document: {e}"))?;
    let defaults = ExportDefaults::try_from(&config.render)
        .map_err(|e| anyhow::anyhow!("Invalid [render] configuration: {e}"))?;

    println!("Scene document: {}", path.display());
    if document.scenes.is_empty() {
        println!("  (no scenes)");
        return Ok(());
    }

    for scene in &document.scenes {
        let framerate = scene.framerate.unwrap_or(defaults.framerate);
        let duration = scene
            .duration_secs
            .unwrap_or_else(|| scene.natural_duration());

        println!();
        println!("Scene: {}", scene.name);
        println!(
            "  Duration: {duration:.3}s @ {framerate} ({} frames)",
            framerate.frame_count(duration)
        );
        println!(
            "  Samples: {}",
            scene.samples.unwrap_or(defaults.sample_count)
        );
        if let Some(color) = scene.clear_color {
            println!("  Clear color: {:?}", color.0);
        }
        println!("  Layers: {}", scene.layers.len());
        for (index, layer) in scene.layers.iter().enumerate() {
            let name = if layer.name.is_empty() {
                "(unnamed)"
            } else {
                layer.name.as_str()
            };
            println!("    {index}: {name}");
        }
    }

    Ok(())
}
