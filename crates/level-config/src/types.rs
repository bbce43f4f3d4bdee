use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Which sensor drives the level.
    pub sensor: SensorKind,
    /// Synthetic sample source used when no real backend is bound.
    pub simulation: SimulationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sensor: SensorKind::Accelerometer,
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Tilt derived from the gravity vector.
    Accelerometer,
    /// Platform-computed pitch/roll.
    Orientation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay between injected samples. Sessions subscribe at the normal
    /// rate (200 ms), so shorter intervals get thinned by the backend.
    pub sample_interval_ms: u64,
    /// Time for one full tilt sweep.
    pub sweep_period_ms: u64,
    /// Peak tilt reached during the sweep, degrees.
    pub max_tilt_deg: f32,
    /// Devices the simulated backend reports. 0 makes the sensor unsupported.
    pub device_count: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 200,
            sweep_period_ms: 8000,
            max_tilt_deg: 120.0,
            device_count: 1,
        }
    }
}
