//! Repeated exports must not leak file descriptors.
//!
//! Kept in its own test binary so no other test opens descriptors while the
//! counts are taken.

#![cfg(target_os = "linux")]

mod support;

use framepipe_render_engine::software::{SoftwareSceneRenderer, SoftwareSurfaceProvider};
use framepipe_render_engine::ExportController;

use support::*;

fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

#[test]
fn sequential_exports_leave_descriptor_count_unchanged() {
    let dir = scratch_dir("fd_leak");
    let scene = top_band_scene([1.0, 0.5, 0.0, 1.0]);
    let mut controller = ExportController::new(
        SoftwareSurfaceProvider::new(),
        script_encoder(&dir, CAT_TO_OUTPUT),
    );
    let mut renderer = SoftwareSceneRenderer::new();

    let baseline = open_descriptors();
    for run in 0..2 {
        let output = dir.join(format!("run{run}.raw"));
        controller
            .export(&export_config(&output, 32, 32, 30, 0.5), &scene, &mut renderer, None)
            .unwrap();
        assert_eq!(open_descriptors(), baseline, "descriptors leaked by run {run}");
    }

    // A failing run must clean up as well.
    let mut failing = ExportController::new(
        SoftwareSurfaceProvider::new(),
        script_encoder(&dir, "exit 2"),
    );
    let output = dir.join("failed.raw");
    assert!(failing
        .export(&export_config(&output, 128, 128, 30, 1.0), &scene, &mut renderer, None)
        .is_err());
    assert_eq!(open_descriptors(), baseline, "descriptors leaked by failed run");

    std::fs::remove_dir_all(&dir).ok();
}
