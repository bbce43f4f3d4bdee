use glam::Vec3;
use std::fmt;
use std::time::Duration;

/// Discrete device facing reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Top edge up.
    Top,
    /// Bottom edge up.
    Bottom,
    /// Left edge up.
    Left,
    /// Right edge up.
    Right,
    /// Lying flat, roughly face up.
    Landing,
}

impl Orientation {
    /// Classify calibrated pitch/roll (degrees).
    ///
    /// Rules are checked in order and all bounds are exclusive, so a pitch of
    /// exactly 45 with zero roll falls through to `Landing`.
    pub fn classify(pitch: f32, roll: f32) -> Self {
        if pitch < -45.0 && pitch > -135.0 {
            Orientation::Top
        } else if pitch > 45.0 && pitch < 135.0 {
            Orientation::Bottom
        } else if roll > 45.0 {
            Orientation::Right
        } else if roll < -45.0 {
            Orientation::Left
        } else {
            Orientation::Landing
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Top => "TOP",
            Orientation::Bottom => "BOTTOM",
            Orientation::Left => "LEFT",
            Orientation::Right => "RIGHT",
            Orientation::Landing => "LANDING",
        };
        f.write_str(name)
    }
}

/// Tilt pair (degrees) produced by a [`SensorAdapter`](crate::adapter::SensorAdapter).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawSample {
    pub pitch: f32,
    pub roll: f32,
}

impl RawSample {
    pub fn new(pitch: f32, roll: f32) -> Self {
        Self { pitch, roll }
    }
}

/// One classified sample, as handed to the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationEvent {
    pub orientation: Orientation,
    /// Pitch with the calibration offset removed.
    pub pitch: f32,
    /// Roll with the calibration offset removed.
    pub roll: f32,
}

/// Physical sensor kinds a backend can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    /// Gravity vector in m/s^2, device frame.
    Accelerometer,
    /// Azimuth/pitch/roll in degrees, computed by the platform.
    Orientation,
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Accelerometer => f.write_str("accelerometer"),
            SensorType::Orientation => f.write_str("orientation"),
        }
    }
}

/// Requested delivery cadence, as the minimum spacing between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRate {
    Fastest,
    Game,
    Ui,
    Normal,
}

impl SamplingRate {
    /// Nominal period between samples.
    pub fn period(self) -> Duration {
        match self {
            SamplingRate::Fastest => Duration::ZERO,
            SamplingRate::Game => Duration::from_millis(20),
            SamplingRate::Ui => Duration::from_micros(66_667),
            SamplingRate::Normal => Duration::from_millis(200),
        }
    }
}

/// Accuracy status reported by a backend alongside its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

/// Backend-native sensor event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPayload {
    pub sensor_type: SensorType,
    /// Raw values; meaning depends on `sensor_type`.
    pub values: Vec3,
    /// Monotonic event time.
    pub timestamp_ns: u64,
}

impl SensorPayload {
    pub fn new(sensor_type: SensorType, values: Vec3, timestamp_ns: u64) -> Self {
        Self {
            sensor_type,
            values,
            timestamp_ns,
        }
    }
}

/// A physical device as enumerated by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub id: u32,
    pub name: String,
    pub sensor_type: SensorType,
}

/// Lifecycle state of a [`SensorSession`](crate::session::SensorSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Listening,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_bands_win_over_roll() {
        for pitch in [-134.9, -100.0, -45.1] {
            for roll in [-90.0, 0.0, 90.0] {
                assert_eq!(Orientation::classify(pitch, roll), Orientation::Top);
            }
        }
        for pitch in [45.1, 90.0, 134.9] {
            for roll in [-90.0, 0.0, 90.0] {
                assert_eq!(Orientation::classify(pitch, roll), Orientation::Bottom);
            }
        }
    }

    #[test]
    fn roll_decides_outside_pitch_bands() {
        for pitch in [-170.0, -45.0, 0.0, 45.0, 170.0] {
            assert_eq!(Orientation::classify(pitch, 60.0), Orientation::Right);
            assert_eq!(Orientation::classify(pitch, -60.0), Orientation::Left);
            assert_eq!(Orientation::classify(pitch, 10.0), Orientation::Landing);
        }
    }

    #[test]
    fn boundaries_are_exclusive() {
        assert_eq!(Orientation::classify(45.0, 0.0), Orientation::Landing);
        assert_eq!(Orientation::classify(-45.0, 0.0), Orientation::Landing);
        assert_eq!(Orientation::classify(135.0, 0.0), Orientation::Landing);
        assert_eq!(Orientation::classify(-135.0, 0.0), Orientation::Landing);
        assert_eq!(Orientation::classify(0.0, 45.0), Orientation::Landing);
        assert_eq!(Orientation::classify(0.0, -45.0), Orientation::Landing);
    }

    #[test]
    fn nan_lands() {
        assert_eq!(Orientation::classify(f32::NAN, f32::NAN), Orientation::Landing);
        assert_eq!(Orientation::classify(f32::NAN, 50.0), Orientation::Right);
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(Orientation::Landing.to_string(), "LANDING");
        assert_eq!(Orientation::Top.to_string(), "TOP");
    }
}
