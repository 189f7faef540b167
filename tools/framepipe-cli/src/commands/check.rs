//! Check encoder and GPU availability.

use framepipe_common::config::AppConfig;
use framepipe_encoder::EncoderSettings;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Framepipe System Check");
    println!("{}", "=".repeat(50));

    let encoder = EncoderSettings::from(&config.encoder);
    let encoder_ok = encoder.is_available();
    if encoder_ok {
        println!("[OK] Encoder: {}", encoder.program);
    } else {
        println!("[WARN] Encoder not found: {}", encoder.program);
    }

    println!("[OK] Software backend");
    check_gpu();

    println!();
    if encoder_ok {
        println!("Framepipe is ready to export.");
    } else {
        println!(
            "Install `{}` or set `encoder.program` in the config file.",
            encoder.program
        );
    }

    Ok(())
}

#[cfg(feature = "gpu")]
fn check_gpu() {
    use framepipe_render_engine::gpu::GpuSurfaceProvider;

    let mut provider = GpuSurfaceProvider::new();
    match provider.context() {
        Ok(context) => {
            println!("[OK] GPU backend: {}", context.adapter_name());
            println!(
                "     Sample counts: {:?}",
                context.supported_sample_counts()
            );
        }
        Err(e) => println!("[WARN] GPU backend unavailable: {e}"),
    }
}

#[cfg(not(feature = "gpu"))]
fn check_gpu() {
    println!("[WARN] GPU backend not compiled in (build with `--features gpu`)");
}
