use glam::Vec3;
use level_config::SimulationConfig;
use level_orientation::{LoopbackBackend, SensorPayload, SensorType};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

const STANDARD_GRAVITY: f32 = 9.81;

/// Tilt at `t` along a figure-eight sweep: pitch makes one cycle per
/// period, roll two.
pub fn sweep_tilt(t: Duration, config: &SimulationConfig) -> (f32, f32) {
    let period = config.sweep_period_ms.max(1) as f32 / 1000.0;
    let phase = TAU * (t.as_secs_f32() / period);
    let pitch = config.max_tilt_deg * phase.sin();
    let roll = 0.5 * config.max_tilt_deg * (2.0 * phase).sin();
    (pitch, roll)
}

/// Encode a pitch/roll pair the way `sensor_type` would report it.
pub fn payload_for(sensor_type: SensorType, pitch: f32, roll: f32, timestamp_ns: u64) -> SensorPayload {
    let values = match sensor_type {
        SensorType::Accelerometer => {
            let (pitch, roll) = (pitch.to_radians(), roll.to_radians());
            let planar = STANDARD_GRAVITY * roll.cos();
            Vec3::new(
                STANDARD_GRAVITY * roll.sin(),
                -planar * pitch.sin(),
                planar * pitch.cos(),
            )
        }
        SensorType::Orientation => Vec3::new(0.0, pitch, roll),
    };
    SensorPayload::new(sensor_type, values, timestamp_ns)
}

/// Background task: inject sweep samples into the backend until aborted.
pub async fn run_sweep(backend: Arc<LoopbackBackend>, sensor_type: SensorType, config: SimulationConfig) {
    let start = Instant::now();
    let mut ticker = time::interval_at(start, Duration::from_millis(config.sample_interval_ms.max(1)));
    let mut delivered: u64 = 0;

    loop {
        // Stamp with the scheduled tick so wake-up jitter can't push a sample
        // under the subscription's rate period.
        let elapsed = ticker.tick().await - start;
        let (pitch, roll) = sweep_tilt(elapsed, &config);
        let payload = payload_for(sensor_type, pitch, roll, elapsed.as_nanos() as u64);

        if backend.deliver(payload) == 0 {
            tracing::trace!("Simulated sample not delivered");
        }
        delivered += 1;
        if delivered % 100 == 0 {
            tracing::debug!(delivered, "Simulated samples injected");
        }
    }
}
