//! Encoder command lines.

use std::fmt;
use std::process::Command;

use framepipe_common::config::EncoderDefaults;
use framepipe_scene_model::export::ExportConfig;

/// Pixel format of the raw stream: interleaved 8-bit RGBA.
pub const PIXEL_FORMAT: &str = "rgba";

/// Input specifier for the encoder's standard input, which is where the
/// read end of the frame pipe is attached.
pub const PIPE_INPUT: &str = "pipe:0";

/// Program plus arguments for one encoder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for EncoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How to launch the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Executable name or path.
    pub program: String,

    /// Arguments placed before the generated ones, for launchers such as `nice`.
    pub program_args: Vec<String>,

    /// Arguments inserted ahead of each request's extra arguments.
    pub extra_args: Vec<String>,

    /// Trailing bytes of encoder stderr kept for error reports.
    pub stderr_tail_bytes: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self::from(&EncoderDefaults::default())
    }
}

impl From<&EncoderDefaults> for EncoderSettings {
    fn from(defaults: &EncoderDefaults) -> Self {
        Self {
            program: defaults.program.clone(),
            program_args: defaults.program_args.clone(),
            extra_args: defaults.extra_args.clone(),
            stderr_tail_bytes: defaults.capture_stderr_bytes,
        }
    }
}

impl EncoderSettings {
    /// Use a specific encoder executable with default settings otherwise.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Full command for one export.
    pub fn command_for(&self, config: &ExportConfig) -> EncoderCommand {
        let mut args = self.program_args.clone();
        args.extend(encoder_args(config, &self.extra_args));
        EncoderCommand {
            program: self.program.clone(),
            args,
        }
    }

    /// Whether the encoder executable can be found.
    pub fn is_available(&self) -> bool {
        command_exists(&self.program)
    }
}

/// Build the encoder argument list for `config`.
///
/// Input options describe the raw stream (format, size, rate, pixel layout)
/// and precede `-i`; `configured_extra` and the request's extra arguments
/// follow, and the output path comes last.
pub fn encoder_args(config: &ExportConfig, configured_extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pixel_format".to_string(),
        PIXEL_FORMAT.to_string(),
        "-video_size".to_string(),
        format!("{}x{}", config.width, config.height),
        "-framerate".to_string(),
        config.framerate.to_string(),
        "-i".to_string(),
        PIPE_INPUT.to_string(),
    ];
    args.extend(configured_extra.iter().cloned());
    args.extend(config.extra_encoder_args.iter().cloned());
    args.push("-y".to_string());
    args.push(config.output_path.to_string_lossy().into_owned());
    args
}

/// Check whether `binary` resolves to something runnable.
pub fn command_exists(binary: &str) -> bool {
    if binary.is_empty() {
        return false;
    }
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return std::path::Path::new(binary).is_file();
    }
    Command::new("sh")
        .args(["-c", "command -v \"$1\" >/dev/null 2>&1", "sh", binary])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
