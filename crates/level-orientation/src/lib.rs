//! Orientation core for a bubble level.
//!
//! Raw sensor payloads go through a [`SensorAdapter`] into pitch/roll, the
//! [`OrientationEngine`] removes the calibration offsets and classifies the
//! result, and the registered [`OrientationListener`] hears about it. A
//! [`SensorSession`] owns the subscription against a host [`SensorBackend`].

pub mod adapter;
pub mod backend;
pub mod engine;
pub mod error;
pub mod loopback;
pub mod session;
pub mod types;

pub use adapter::{AccelerometerAdapter, OrientationSensorAdapter, SensorAdapter};
pub use backend::{ExecutionContext, SampleSink, SensorBackend};
pub use engine::{CalibrationState, OrientationEngine, OrientationListener};
pub use error::SensorError;
pub use loopback::{LoopbackBackend, StaticContext};
pub use session::{AccelerometerSession, OrientationSensorSession, SensorSession};
pub use types::{
    DeviceHandle, Orientation, OrientationEvent, RawSample, SamplingRate, SensorAccuracy,
    SensorPayload, SensorType, SessionState,
};
