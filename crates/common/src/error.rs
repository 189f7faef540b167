//! Error types shared across Framepipe crates.

/// Top-level error type for Framepipe operations.
///
/// Every export failure maps onto exactly one variant. None of them are
/// retried inside the pipeline; callers decide whether to run again.
#[derive(Debug, thiserror::Error)]
pub enum FramepipeError {
    /// Bad export request. No resources were touched.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Graphics context, surface or framebuffer could not be acquired.
    #[error("Surface error: {message}")]
    Surface { message: String },

    /// The OS refused to create the frame pipe.
    #[error("Pipe error: {source}")]
    Pipe {
        #[source]
        source: std::io::Error,
    },

    /// The encoder executable could not be started.
    #[error("Failed to spawn encoder `{program}`: {source}")]
    EncoderSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a frame to the encoder failed mid-stream.
    #[error("Failed to write frame {frame} to encoder: {source}")]
    Write {
        frame: u64,
        #[source]
        source: std::io::Error,
    },

    /// The encoder finished with a non-zero status; its output is not trustworthy.
    #[error("Encoder exited with {}: {stderr}", describe_exit_code(.code))]
    EncoderExit { code: Option<i32>, stderr: String },

    /// The export was cancelled at a frame boundary.
    #[error("Export cancelled after {frames_written} frames")]
    Cancelled { frames_written: u64 },

    #[error("Scene error: {message}")]
    Scene { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramepipeError.
pub type FramepipeResult<T> = Result<T, FramepipeError>;

impl FramepipeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface {
            message: msg.into(),
        }
    }

    pub fn scene(msg: impl Into<String>) -> Self {
        Self::Scene {
            message: msg.into(),
        }
    }

    /// Whether this error is the cooperative cancellation status.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
