//! Framepipe Encoder
//!
//! Moves raw frames out of the process and into an external video encoder:
//!
//! ```text
//!  renderer ──write──▶ PipeWriter ══ pipe ══▶ PipeReader (encoder stdin)
//!                                                 │
//!                                                 ▼
//!                                          encoder process ──▶ output file
//! ```
//!
//! - [`pipe`]: the anonymous pipe, created atomically with both ends owned
//! - [`args`]: the encoder command line derived from an export config
//! - [`sink`]: [`FrameSink`], which owns the write end and the child process
//!
//! Writes block when the encoder falls behind. That backpressure is the only
//! flow control between rendering and encoding.

pub mod args;
pub mod pipe;
pub mod sink;

pub use args::*;
pub use pipe::*;
pub use sink::*;
