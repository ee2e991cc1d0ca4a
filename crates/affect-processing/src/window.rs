//! Window assembly: slice channel buffers and concatenate feature blocks
//!
//! Vector layout for a window of `W` seconds:
//!
//! ```text
//! [ACC-3D, ACC-X, ACC-Y, ACC-Z] x W seconds   (4 values each)
//! PPG (18) | EDA (15) | TEMP (6)
//! ```
//!
//! Seconds missing from a ragged accelerometer tail are filled with zero
//! blocks so the layout never changes.

use crate::config::ExtractionConfig;
use crate::features::{BlockKind, FeatureExtractor};
use affect_core::{AffectResult, Channel, FeatureLabel, FeatureVector, WindowSnapshot};
use tracing::{debug, warn};

/// Accelerometer streams in vector order
pub const ACC_CHANNELS: [Channel; 4] = [Channel::Acc3D, Channel::AccX, Channel::AccY, Channel::AccZ];

/// Window-level channels in vector order
pub const WINDOW_CHANNELS: [Channel; 3] = [Channel::Bvp, Channel::Eda, Channel::Temperature];

/// Builds feature vectors from channel buffers
pub struct WindowAssembler {
    extractor: FeatureExtractor,
}

impl WindowAssembler {
    pub fn new(config: ExtractionConfig) -> AffectResult<Self> {
        Ok(WindowAssembler {
            extractor: FeatureExtractor::new(config)?,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        self.extractor.config()
    }

    /// Vector length produced by this assembler
    pub fn vector_len(&self) -> usize {
        FeatureVector::expected_len(self.config().window_size)
    }

    /// Features of a freshly grabbed window
    pub fn assemble(&mut self, snapshot: &WindowSnapshot) -> AffectResult<FeatureVector> {
        let values = self.window_values(snapshot, 0)?;
        Ok(FeatureVector::new(values).with_session(snapshot.session_id))
    }

    /// Features of the window starting `start_second` seconds into a recording
    pub fn assemble_at(
        &mut self,
        recording: &WindowSnapshot,
        start_second: usize,
    ) -> AffectResult<FeatureVector> {
        let values = self.window_values(recording, start_second)?;
        Ok(FeatureVector::new(values)
            .with_session(recording.session_id)
            .with_start_second(start_second))
    }

    /// Whole seconds of a recording covered by every non-empty periodic channel
    pub fn recording_seconds(&self, recording: &WindowSnapshot) -> usize {
        ACC_CHANNELS
            .iter()
            .chain(WINDOW_CHANNELS.iter())
            .filter_map(|&channel| {
                let per_second = self.config().entries_per_second(channel)?;
                let len = recording.len(channel);
                (len > 0 && per_second > 0).then(|| len / per_second)
            })
            .min()
            .unwrap_or(0)
    }

    /// Features of every full, non-overlapping window of a recording
    ///
    /// Windows failing on their own data (too short to detrend, empty
    /// signals) are skipped; any other error aborts the batch.
    pub fn batch(&mut self, recording: &WindowSnapshot) -> AffectResult<Vec<FeatureVector>> {
        self.batch_labeled(recording, &[])
    }

    /// Like [`batch`](Self::batch), labelling each window with the truncated
    /// mean of the per-second labels it covers (see [`window_label`])
    pub fn batch_labeled(
        &mut self,
        recording: &WindowSnapshot,
        labels_per_second: &[FeatureLabel],
    ) -> AffectResult<Vec<FeatureVector>> {
        let window_size = self.config().window_size;
        let seconds = self.recording_seconds(recording);
        let mut vectors = Vec::new();

        let mut start = 0;
        while start + window_size <= seconds {
            match self.assemble_at(recording, start) {
                Ok(vector) => {
                    let end = (start + window_size).min(labels_per_second.len());
                    let covered = labels_per_second.get(start..end).unwrap_or(&[]);
                    let vector = match window_label(covered) {
                        Some(label) => vector.with_label(label),
                        None => vector,
                    };
                    vectors.push(vector);
                }
                Err(e) if e.is_window_local() => {
                    warn!(start_second = start, error = %e, "skipping window");
                }
                Err(e) => return Err(e),
            }
            start += window_size;
        }

        debug!(
            windows = vectors.len(),
            seconds,
            "batch feature extraction finished"
        );
        Ok(vectors)
    }

    fn window_values(
        &mut self,
        snapshot: &WindowSnapshot,
        start_second: usize,
    ) -> AffectResult<Vec<f32>> {
        let window_size = self.config().window_size;
        let mut values: Vec<f64> = Vec::with_capacity(self.vector_len());

        let acc_seconds = self.available_acc_seconds(snapshot, start_second);
        for second in start_second..start_second + acc_seconds {
            for channel in ACC_CHANNELS {
                let slice = self.second_slice(snapshot, channel, second);
                values.extend(self.extractor.block(BlockKind::Accelerometer, slice)?);
            }
        }
        for _ in acc_seconds..window_size {
            for _ in ACC_CHANNELS {
                values.extend(BlockKind::Accelerometer.zeros());
            }
        }

        for channel in WINDOW_CHANNELS {
            let per_second = self.config().entries_per_second(channel).unwrap_or(0);
            let start = start_second * per_second;
            let slice = snapshot.slice(channel, start, start + window_size * per_second);
            if let Some(kind) = BlockKind::for_channel(channel) {
                values.extend(self.extractor.block(kind, slice)?);
            }
        }

        debug!(
            session = %snapshot.session_id,
            start_second,
            acc_seconds,
            features = values.len(),
            "assembled window"
        );

        Ok(values.into_iter().map(|v| v as f32).collect())
    }

    /// Seconds of ACC-3D data after the offset, rounded half away from zero
    /// and capped at the window size
    fn available_acc_seconds(&self, snapshot: &WindowSnapshot, start_second: usize) -> usize {
        let per_second = self.config().entries_per_second(Channel::Acc3D).unwrap_or(0);
        if per_second == 0 {
            return 0;
        }

        let remaining = snapshot
            .len(Channel::Acc3D)
            .saturating_sub(start_second * per_second);
        let seconds = (remaining as f64 / per_second as f64).round() as usize;
        seconds.min(self.config().window_size)
    }

    fn second_slice<'a>(
        &self,
        snapshot: &'a WindowSnapshot,
        channel: Channel,
        second: usize,
    ) -> &'a [f64] {
        let per_second = self.config().entries_per_second(channel).unwrap_or(0);
        snapshot.slice(channel, second * per_second, (second + 1) * per_second)
    }
}

/// Label of a window from the labels of the seconds it covers
///
/// Class ids and binary flags are averaged and truncated toward zero, so a
/// binary window is only flagged when every second is. Continuous targets
/// take the plain mean. Windows mixing label kinds keep their first label.
pub fn window_label(labels: &[FeatureLabel]) -> Option<FeatureLabel> {
    let first = *labels.first()?;
    let n = labels.len() as f64;
    let mut sum = 0.0;
    for label in labels {
        sum += match (first, *label) {
            (FeatureLabel::Class(_), FeatureLabel::Class(id)) => id as f64,
            (FeatureLabel::Binary(_), FeatureLabel::Binary(flag)) => f64::from(u8::from(flag)),
            (FeatureLabel::Continuous(_), FeatureLabel::Continuous(value)) => value as f64,
            _ => return Some(first),
        };
    }
    let mean = sum / n;

    Some(match first {
        FeatureLabel::Class(_) => FeatureLabel::Class(mean.trunc() as u32),
        FeatureLabel::Binary(_) => FeatureLabel::Binary(mean.trunc() > 0.0),
        FeatureLabel::Continuous(_) => FeatureLabel::Continuous(mean as f32),
    })
}
