use crate::types::{RawSample, SensorPayload, SensorType};

/// Turns one backend sensor type into the engine's pitch/roll pair.
///
/// The engine never looks at payload values directly, so adding a sensor
/// means adding an adapter.
pub trait SensorAdapter: Send + Sync + 'static {
    /// The single sensor type this adapter consumes.
    fn sensor_type(&self) -> SensorType;

    /// Convert a native payload into degrees of pitch and roll.
    fn convert_raw_payload(&self, payload: &SensorPayload) -> RawSample;
}

/// Derives tilt from the gravity vector reported by an accelerometer.
///
/// Flat and face up reads `(0, 0)`. Raising the top edge drives pitch towards
/// -90, raising the right edge drives roll towards +90.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelerometerAdapter;

impl SensorAdapter for AccelerometerAdapter {
    fn sensor_type(&self) -> SensorType {
        SensorType::Accelerometer
    }

    fn convert_raw_payload(&self, payload: &SensorPayload) -> RawSample {
        let g = payload.values;
        let pitch = -g.y.atan2(g.z).to_degrees();
        let roll = g.x.atan2((g.y * g.y + g.z * g.z).sqrt()).to_degrees();
        RawSample::new(pitch, roll)
    }
}

/// Passes through pitch and roll from a platform orientation sensor.
///
/// Payload layout: `[azimuth, pitch, roll]`, degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationSensorAdapter;

impl SensorAdapter for OrientationSensorAdapter {
    fn sensor_type(&self) -> SensorType {
        SensorType::Orientation
    }

    fn convert_raw_payload(&self, payload: &SensorPayload) -> RawSample {
        RawSample::new(payload.values.y, payload.values.z)
    }
}
