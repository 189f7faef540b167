use std::path::PathBuf;

use framepipe_scene_model::{ExportDefaults, ExportRequest, Framerate, SceneDocument};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("scenes")
        .join("demo.json")
}

#[test]
fn demo_fixture_loads_and_validates() {
    let doc = SceneDocument::load(fixture_path()).expect("fixture scene should load");
    let names = doc
        .scenes
        .iter()
        .map(|scene| scene.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, ["sliding-boxes", "still"]);
}

#[test]
fn demo_fixture_resolves_to_expected_frame_counts() {
    let doc = SceneDocument::load(fixture_path()).unwrap();
    let defaults = ExportDefaults::default();

    let sliding = doc.select(Some("sliding-boxes")).unwrap().unwrap();
    let cfg = ExportRequest::new("sliding.mp4")
        .resolve(sliding, &defaults)
        .unwrap();
    assert_eq!(cfg.framerate, Framerate::fps(30));
    assert_eq!(cfg.frame_count(), 90);
    assert_eq!(cfg.sample_count, 4);

    let still = doc.select(Some("still")).unwrap().unwrap();
    let cfg = ExportRequest::new("still.mp4")
        .resolve(still, &defaults)
        .unwrap();
    assert_eq!(cfg.frame_count(), 0);
}

#[test]
fn demo_fixture_layers_evaluate_over_the_whole_duration() {
    let doc = SceneDocument::load(fixture_path()).unwrap();
    let scene = doc.select(None).unwrap().unwrap();
    let rate = scene.framerate.unwrap();
    for index in 0..rate.frame_count(scene.duration_secs.unwrap()) {
        let t = rate.timestamp(index);
        for layer in &scene.layers {
            let state = layer.evaluate(t).expect("validated layers always evaluate");
            assert!((0.0..=1.0).contains(&state.depth));
            assert!(state.x >= 0.0 && state.x <= 0.75 + 1e-9);
        }
    }
}
