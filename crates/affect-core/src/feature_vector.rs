//! FeatureVector: fixed-order output of one analysis window

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Values per accelerometer block
pub const ACC_BLOCK_LEN: usize = 4;
/// Values in the PPG block
pub const PPG_BLOCK_LEN: usize = 18;
/// Values in the EDA block
pub const EDA_BLOCK_LEN: usize = 15;
/// Values in the temperature block
pub const TEMPERATURE_BLOCK_LEN: usize = 6;
/// Accelerometer streams summarised every second (ACC-3D, X, Y, Z)
pub const ACC_STREAMS: usize = 4;

/// Training target attached to a vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeatureLabel {
    /// Multi-class id (e.g. baseline / stress / amusement)
    Class(u32),
    /// Binary stress flag
    Binary(bool),
    /// Regression target
    Continuous(f32),
}

/// Immutable feature vector handed to a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
    label: Option<FeatureLabel>,
    session_id: Option<Uuid>,
    start_second: Option<usize>,
}

impl FeatureVector {
    /// Wrap computed features
    pub fn new(values: Vec<f32>) -> Self {
        FeatureVector {
            values,
            label: None,
            session_id: None,
            start_second: None,
        }
    }

    /// Vector length for a given window size in seconds
    ///
    /// Four accelerometer streams contribute one block per second; PPG, EDA
    /// and temperature contribute one block per window. Five seconds gives 119.
    pub fn expected_len(window_seconds: usize) -> usize {
        ACC_STREAMS * ACC_BLOCK_LEN * window_seconds
            + PPG_BLOCK_LEN
            + EDA_BLOCK_LEN
            + TEMPERATURE_BLOCK_LEN
    }

    /// Attach a training label
    pub fn with_label(mut self, label: FeatureLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Attach the originating session
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Attach the window offset within a recording
    pub fn with_start_second(mut self, start_second: usize) -> Self {
        self.start_second = Some(start_second);
        self
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn label(&self) -> Option<FeatureLabel> {
        self.label
    }

    /// Session the window was cut from
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Window offset in whole seconds, for vectors cut from recordings
    pub fn start_second(&self) -> Option<usize> {
        self.start_second
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the vector, returning the raw values
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}
