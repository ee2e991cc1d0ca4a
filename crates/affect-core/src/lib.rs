//! Affect-Core: Foundation types for wearable affect sensing
//!
//! Channels, sample buffers, the per-session collector context and the
//! fixed-length feature vector produced for each analysis window.

pub mod buffer;
pub mod channel;
pub mod error;
pub mod feature_vector;

pub use buffer::{SampleBuffer, SessionBuffers, WindowSnapshot};
pub use channel::Channel;
pub use error::{AffectError, AffectResult};
pub use feature_vector::*;
