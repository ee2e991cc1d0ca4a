//! Affect-Simulation: synthetic wearable sessions and the online window driver
//!
//! Generates E4-like sensor streams for development and drives live,
//! timer-based feature extraction over a shared session.

pub mod signal_patterns;
pub mod wearable_simulator;
pub mod window_stream;

pub use signal_patterns::*;
pub use wearable_simulator::*;
pub use window_stream::*;
