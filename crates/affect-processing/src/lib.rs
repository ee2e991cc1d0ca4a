//! Affect-Processing: windowed physiological feature extraction
//!
//! Turns raw EDA, PPG, accelerometer and skin temperature buffers into the
//! fixed-length feature vector consumed by an affect classifier.

pub mod beats;
pub mod config;
pub mod detrend;
pub mod features;
pub mod filters;
pub mod healey;
pub mod spectral;
pub mod statistics;
pub mod stillness;
pub mod window;

pub use beats::{find_local_maxima, heart_features, BeatDetector, HeartFeatures};
pub use config::{EdaParams, ExtractionConfig, PpgParams, SamplingRates};
pub use detrend::{residual, Decomposition, TarvainenDetrender};
pub use features::{BlockKind, FeatureExtractor};
pub use filters::{finite_difference, ButterworthFilter, FilterConfig, FilterType};
pub use healey::{GsrPeak, PeakFeatures, PeakSegmenter, PeakSummary};
pub use spectral::{FrequencyBand, SpectralAnalyzer};
pub use statistics::SignalSummary;
pub use stillness::{
    physical_stillness_index, stillness_index_vector, StillnessIndex, StillnessMode,
    StillnessVector,
};
pub use window::{window_label, WindowAssembler};
