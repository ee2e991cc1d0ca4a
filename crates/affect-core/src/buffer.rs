//! Sample buffers and the per-session collector context
//!
//! The collector appends readings as they arrive and hands the pipeline a
//! stable snapshot via [`SessionBuffers::grab_window`]. Taking the snapshot
//! empties the live buffers in the same step, so a reading lands in exactly
//! one window.

use crate::channel::Channel;
use crate::error::{AffectError, AffectResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Append-only readings with parallel timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    readings: Vec<f64>,
    timestamps: Vec<f64>,
}

impl SampleBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a buffer from existing readings and timestamps of equal length
    pub fn from_parts(readings: Vec<f64>, timestamps: Vec<f64>) -> AffectResult<Self> {
        if readings.len() != timestamps.len() {
            return Err(AffectError::InvalidSignalData {
                reason: format!(
                    "{} readings paired with {} timestamps",
                    readings.len(),
                    timestamps.len()
                ),
            });
        }

        Ok(SampleBuffer { readings, timestamps })
    }

    /// Build a buffer from readings taken at a fixed rate, starting at t = 0
    pub fn from_readings(readings: Vec<f64>, entries_per_second: f64) -> Self {
        let timestamps = (0..readings.len())
            .map(|i| i as f64 / entries_per_second)
            .collect();

        SampleBuffer { readings, timestamps }
    }

    /// Append one reading
    pub fn push(&mut self, reading: f64, timestamp: f64) {
        self.readings.push(reading);
        self.timestamps.push(timestamp);
    }

    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
        self.timestamps.clear();
    }

    /// Readings in `[start, end)`, with both ends clamped to the buffer length
    pub fn slice_clamped(&self, start: usize, end: usize) -> &[f64] {
        let end = end.min(self.readings.len());
        let start = start.min(end);
        &self.readings[start..end]
    }

    /// Readings in `[start, end)`, failing if the range leaves the buffer
    pub fn try_slice(&self, start: usize, end: usize) -> AffectResult<&[f64]> {
        if start > end || end > self.readings.len() {
            return Err(AffectError::IndexRange {
                start,
                end,
                len: self.readings.len(),
            });
        }

        Ok(&self.readings[start..end])
    }
}

/// Immutable multi-channel snapshot handed to the feature pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Session the readings came from
    pub session_id: Uuid,
    /// Milliseconds since the Unix epoch when the snapshot was taken
    pub grabbed_at: u64,
    buffers: BTreeMap<Channel, SampleBuffer>,
}

impl WindowSnapshot {
    /// Build a snapshot from raw readings at each channel's native rate
    ///
    /// Used for recorded sessions, where timestamps are implied by position.
    pub fn from_readings<I>(channels: I) -> Self
    where
        I: IntoIterator<Item = (Channel, Vec<f64>)>,
    {
        let buffers = channels
            .into_iter()
            .map(|(channel, readings)| {
                let per_second = channel.samples_per_second().unwrap_or(1) as f64;
                (channel, SampleBuffer::from_readings(readings, per_second))
            })
            .collect();

        WindowSnapshot {
            session_id: Uuid::new_v4(),
            grabbed_at: now_millis(),
            buffers,
        }
    }

    /// Buffer for a channel, if the snapshot carries one
    pub fn buffer(&self, channel: Channel) -> Option<&SampleBuffer> {
        self.buffers.get(&channel)
    }

    /// Readings for a channel; absent channels read as empty
    pub fn readings(&self, channel: Channel) -> &[f64] {
        self.buffers
            .get(&channel)
            .map(|buffer| buffer.readings())
            .unwrap_or(&[])
    }

    /// Clamped slice of a channel's readings
    pub fn slice(&self, channel: Channel, start: usize, end: usize) -> &[f64] {
        self.buffers
            .get(&channel)
            .map(|buffer| buffer.slice_clamped(start, end))
            .unwrap_or(&[])
    }

    /// Number of readings held for a channel
    pub fn len(&self, channel: Channel) -> usize {
        self.readings(channel).len()
    }

    /// True when no channel holds any reading
    pub fn is_empty(&self) -> bool {
        self.buffers.values().all(SampleBuffer::is_empty)
    }
}

/// Live buffers of one device session
///
/// This is the context object a collector owns and passes around; there is
/// no process-wide registry of sessions.
#[derive(Debug, Clone)]
pub struct SessionBuffers {
    id: Uuid,
    buffers: BTreeMap<Channel, SampleBuffer>,
}

impl SessionBuffers {
    /// Create empty buffers for every channel
    pub fn new() -> Self {
        SessionBuffers {
            id: Uuid::new_v4(),
            buffers: Channel::ALL
                .iter()
                .map(|&channel| (channel, SampleBuffer::new()))
                .collect(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append a reading to a non-accelerometer channel
    ///
    /// Accelerometer readings must go through [`push_acceleration`] so the
    /// interleaved and per-axis buffers stay length-consistent.
    ///
    /// [`push_acceleration`]: SessionBuffers::push_acceleration
    pub fn push(&mut self, channel: Channel, reading: f64, timestamp: f64) -> AffectResult<()> {
        if channel.is_accelerometer() {
            return Err(AffectError::InvalidSignalData {
                reason: format!("{} readings must be pushed as an x/y/z triple", channel),
            });
        }

        self.buffer_mut(channel).push(reading, timestamp);
        Ok(())
    }

    /// Append one accelerometer sample to ACC-3D and the three axis buffers
    pub fn push_acceleration(&mut self, x: f64, y: f64, z: f64, timestamp: f64) {
        {
            let interleaved = self.buffer_mut(Channel::Acc3D);
            interleaved.push(x, timestamp);
            interleaved.push(y, timestamp);
            interleaved.push(z, timestamp);
        }
        self.buffer_mut(Channel::AccX).push(x, timestamp);
        self.buffer_mut(Channel::AccY).push(y, timestamp);
        self.buffer_mut(Channel::AccZ).push(z, timestamp);
    }

    /// Number of readings currently buffered for a channel
    pub fn len(&self, channel: Channel) -> usize {
        self.buffers.get(&channel).map(SampleBuffer::len).unwrap_or(0)
    }

    /// True when the interleaved buffer holds exactly three entries per axis sample
    pub fn acceleration_consistent(&self) -> bool {
        let axis = self.len(Channel::AccX);
        self.len(Channel::AccY) == axis
            && self.len(Channel::AccZ) == axis
            && self.len(Channel::Acc3D) == axis * Channel::Acc3D.interleave()
    }

    /// Copy the current buffers without clearing them
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            session_id: self.id,
            grabbed_at: now_millis(),
            buffers: self.buffers.clone(),
        }
    }

    /// Take every buffer and leave the session empty
    pub fn grab_window(&mut self) -> WindowSnapshot {
        let buffers = self
            .buffers
            .iter_mut()
            .map(|(&channel, buffer)| (channel, std::mem::take(buffer)))
            .collect();

        WindowSnapshot {
            session_id: self.id,
            grabbed_at: now_millis(),
            buffers,
        }
    }

    /// Drop all buffered readings
    pub fn clear(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.clear();
        }
    }

    fn buffer_mut(&mut self, channel: Channel) -> &mut SampleBuffer {
        self.buffers.entry(channel).or_default()
    }
}

impl Default for SessionBuffers {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_parts_must_align() {
        assert!(SampleBuffer::from_parts(vec![1.0, 2.0], vec![0.0, 0.25]).is_ok());

        let result = SampleBuffer::from_parts(vec![1.0, 2.0], vec![0.0]);
        assert!(matches!(result, Err(AffectError::InvalidSignalData { .. })));
    }

    #[test]
    fn test_slice_clamped_never_panics() {
        let buffer = SampleBuffer::from_readings((0..10).map(f64::from).collect(), 4.0);

        assert_eq!(buffer.slice_clamped(8, 16), &[8.0, 9.0]);
        assert!(buffer.slice_clamped(12, 20).is_empty());
        assert_eq!(buffer.slice_clamped(0, 3).len(), 3);
    }

    #[test]
    fn test_try_slice_reports_range() {
        let buffer = SampleBuffer::from_readings(vec![0.0; 5], 4.0);

        assert_eq!(buffer.try_slice(1, 4).unwrap().len(), 3);
        assert_eq!(
            buffer.try_slice(2, 9),
            Err(AffectError::IndexRange { start: 2, end: 9, len: 5 })
        );
    }

    #[test]
    fn test_acceleration_interleaving() {
        let mut session = SessionBuffers::new();
        session.push_acceleration(1.0, 2.0, 3.0, 0.0);
        session.push_acceleration(4.0, 5.0, 6.0, 1.0 / 32.0);

        assert!(session.acceleration_consistent());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.readings(Channel::Acc3D), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(snapshot.readings(Channel::AccY), &[2.0, 5.0]);
    }

    #[test]
    fn test_push_rejects_accelerometer_channels() {
        let mut session = SessionBuffers::new();
        assert!(session.push(Channel::AccX, 1.0, 0.0).is_err());
        assert!(session.push(Channel::Eda, 0.4, 0.0).is_ok());
        assert_eq!(session.len(Channel::Eda), 1);
    }

    #[test]
    fn test_grab_window_clears_session() {
        let mut session = SessionBuffers::new();
        for i in 0..8 {
            session.push(Channel::Eda, 0.1 * i as f64, i as f64 / 4.0).unwrap();
        }

        let snapshot = session.grab_window();
        assert_eq!(snapshot.session_id, session.id());
        assert_eq!(snapshot.len(Channel::Eda), 8);
        assert_eq!(session.len(Channel::Eda), 0);

        session.push(Channel::Eda, 1.0, 2.0).unwrap();
        let next = session.grab_window();
        assert_eq!(next.readings(Channel::Eda), &[1.0]);
    }

    #[test]
    fn test_snapshot_missing_channel_reads_empty() {
        let snapshot = WindowSnapshot::from_readings(vec![(Channel::Bvp, vec![0.5; 64])]);

        assert_eq!(snapshot.len(Channel::Bvp), 64);
        assert!(snapshot.readings(Channel::Eda).is_empty());
        assert!(snapshot.slice(Channel::Temperature, 0, 20).is_empty());
        assert!(!snapshot.is_empty());
    }
}
