use crate::types::{Orientation, OrientationEvent};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Receives one callback per processed sample.
pub trait OrientationListener: Send + Sync {
    fn on_orientation_changed(&self, orientation: Orientation, pitch: f32, roll: f32);
}

impl<F> OrientationListener for F
where
    F: Fn(Orientation, f32, f32) + Send + Sync,
{
    fn on_orientation_changed(&self, orientation: Orientation, pitch: f32, roll: f32) {
        self(orientation, pitch, roll)
    }
}

/// Per-axis offsets subtracted from every raw reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationState {
    pub pitch_offset: f32,
    pub roll_offset: f32,
}

impl CalibrationState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn accumulate(&mut self, delta_pitch: f32, delta_roll: f32) {
        self.pitch_offset += delta_pitch;
        self.roll_offset += delta_roll;
    }

    /// Remove the offsets from a raw pair.
    pub fn apply(&self, pitch: f32, roll: f32) -> (f32, f32) {
        (pitch - self.pitch_offset, roll - self.roll_offset)
    }
}

/// Calibrates and classifies samples, then reports them to the listener.
///
/// Holds no memory of earlier samples beyond the calibration offsets: two
/// readings either side of a threshold flip the orientation immediately.
pub struct OrientationEngine {
    calibration: Mutex<CalibrationState>,
    listener: RwLock<Option<Arc<dyn OrientationListener>>>,
}

impl OrientationEngine {
    pub fn new() -> Self {
        Self {
            calibration: Mutex::new(CalibrationState::default()),
            listener: RwLock::new(None),
        }
    }

    /// Process one raw pitch/roll pair.
    pub fn on_sample(&self, raw_pitch: f32, raw_roll: f32) -> OrientationEvent {
        let calibration = *self.calibration.lock();
        let (pitch, roll) = calibration.apply(raw_pitch, raw_roll);
        let orientation = Orientation::classify(pitch, roll);
        tracing::trace!(%orientation, pitch, roll, "Sample classified");

        // Clone out so the callback runs without the slot locked.
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.on_orientation_changed(orientation, pitch, roll);
        }

        OrientationEvent {
            orientation,
            pitch,
            roll,
        }
    }

    pub fn reset_calibration(&self) {
        self.calibration.lock().reset();
        tracing::info!("Calibration reset");
    }

    /// Add to the current offsets. Repeated calls accumulate.
    pub fn apply_calibration_delta(&self, delta_pitch: f32, delta_roll: f32) {
        let mut calibration = self.calibration.lock();
        calibration.accumulate(delta_pitch, delta_roll);
        tracing::info!(
            pitch_offset = calibration.pitch_offset,
            roll_offset = calibration.roll_offset,
            "Calibration adjusted"
        );
    }

    /// Current pitch offset.
    pub fn calibrated_pitch(&self) -> f32 {
        self.calibration.lock().pitch_offset
    }

    /// Current roll offset.
    pub fn calibrated_roll(&self) -> f32 {
        self.calibration.lock().roll_offset
    }

    pub fn calibration(&self) -> CalibrationState {
        *self.calibration.lock()
    }

    /// Install a listener, returning the one it replaced.
    pub fn set_listener(
        &self,
        listener: Arc<dyn OrientationListener>,
    ) -> Option<Arc<dyn OrientationListener>> {
        self.listener.write().replace(listener)
    }

    pub fn has_listener(&self) -> bool {
        self.listener.read().is_some()
    }
}

impl Default for OrientationEngine {
    fn default() -> Self {
        Self::new()
    }
}
