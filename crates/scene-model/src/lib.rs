//! Framepipe Scene Model
//!
//! Defines the data contracts for offline frame export:
//! - **Framerate:** Rational frame rate, frame counts and per-frame timestamps
//! - **Export:** Validated export configuration and request merging
//! - **Scene:** Named scene documents made of animated layers
//!
//! Layer geometry is normalized to `[0.0, 1.0]` relative to the output
//! viewport so one scene renders at any export resolution.

pub mod animation;
pub mod error;
pub mod export;
pub mod framerate;
pub mod scene;

pub use animation::*;
pub use error::*;
pub use export::*;
pub use framerate::*;
pub use scene::*;
