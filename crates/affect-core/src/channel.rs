//! Wearable sensor channels and their native sampling characteristics

use serde::{Deserialize, Serialize};

/// Channels streamed by a wrist-worn biosensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// Interleaved x/y/z acceleration
    Acc3D,
    AccX,
    AccY,
    AccZ,
    /// Blood volume pulse (photoplethysmogram)
    Bvp,
    /// Electrodermal activity / galvanic skin response
    Eda,
    /// Skin temperature
    Temperature,
    /// Inter-beat interval, event driven
    Ibi,
    /// Device-reported heart rate, event driven
    HeartRate,
    /// Battery level, event driven
    Battery,
    /// Button press tags, event driven
    Tag,
}

impl Channel {
    /// Every channel, in collector order
    pub const ALL: [Channel; 11] = [
        Channel::Acc3D,
        Channel::AccX,
        Channel::AccY,
        Channel::AccZ,
        Channel::Bvp,
        Channel::Eda,
        Channel::Temperature,
        Channel::Ibi,
        Channel::HeartRate,
        Channel::Battery,
        Channel::Tag,
    ];

    /// Native sampling rate in Hz, `None` for event-driven channels
    pub fn native_rate(&self) -> Option<f64> {
        match self {
            Channel::Acc3D | Channel::AccX | Channel::AccY | Channel::AccZ => Some(32.0),
            Channel::Bvp => Some(64.0),
            Channel::Eda | Channel::Temperature => Some(4.0),
            Channel::Ibi | Channel::HeartRate | Channel::Battery | Channel::Tag => None,
        }
    }

    /// Number of readings stored per time step
    pub fn interleave(&self) -> usize {
        match self {
            Channel::Acc3D => 3,
            _ => 1,
        }
    }

    /// Buffer entries covering one second at the native rate
    pub fn samples_per_second(&self) -> Option<usize> {
        self.native_rate()
            .map(|rate| rate as usize * self.interleave())
    }

    /// True for channels sampled on a fixed clock
    pub fn is_periodic(&self) -> bool {
        self.native_rate().is_some()
    }

    /// True for the four accelerometer channels
    pub fn is_accelerometer(&self) -> bool {
        matches!(
            self,
            Channel::Acc3D | Channel::AccX | Channel::AccY | Channel::AccZ
        )
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::Acc3D => "ACC-3D",
            Channel::AccX => "ACC-X",
            Channel::AccY => "ACC-Y",
            Channel::AccZ => "ACC-Z",
            Channel::Bvp => "BVP",
            Channel::Eda => "EDA",
            Channel::Temperature => "TEMP",
            Channel::Ibi => "IBI",
            Channel::HeartRate => "HR",
            Channel::Battery => "BAT",
            Channel::Tag => "TAG",
        };
        write!(f, "{}", name)
    }
}
