mod sim;

use anyhow::Result;
use level_config::{AppConfig, SensorKind};
use level_orientation::{
    AccelerometerAdapter, LoopbackBackend, Orientation, OrientationEvent, OrientationListener,
    OrientationSensorAdapter, SensorAdapter, SensorSession, StaticContext,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Log angles every this many samples even if the facing hasn't changed.
const ANGLE_LOG_EVERY: u64 = 25;

/// Stand-in for the bubble display: logs what it would draw.
#[derive(Default)]
struct LoggingListener {
    last: Mutex<Option<OrientationEvent>>,
    samples: AtomicU64,
}

impl LoggingListener {
    fn last(&self) -> Option<OrientationEvent> {
        *self.last.lock()
    }

    fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

impl OrientationListener for LoggingListener {
    fn on_orientation_changed(&self, orientation: Orientation, pitch: f32, roll: f32) {
        let n = self.samples.fetch_add(1, Ordering::Relaxed) + 1;
        let event = OrientationEvent {
            orientation,
            pitch,
            roll,
        };
        let previous = self.last.lock().replace(event);

        if previous.map(|p| p.orientation) != Some(orientation) {
            info!(%orientation, pitch, roll, "Orientation changed");
        } else if n % ANGLE_LOG_EVERY == 0 {
            info!(pitch, roll, "Tilt");
        }
    }
}

async fn run<A: SensorAdapter>(adapter: A, config: &AppConfig) -> Result<()> {
    let sensor_type = adapter.sensor_type();
    let backend = Arc::new(LoopbackBackend::with_devices(
        sensor_type,
        config.simulation.device_count,
    ));
    let session = SensorSession::new(Arc::new(StaticContext::new(backend.clone())), adapter);

    if !session.is_supported() {
        anyhow::bail!("No {sensor_type} sensor available");
    }

    let listener = Arc::new(LoggingListener::default());
    if !session.start_listening(listener.clone()) {
        anyhow::bail!("Failed to subscribe to {sensor_type} sensor");
    }

    let sweep = tokio::spawn(sim::run_sweep(
        backend.clone(),
        sensor_type,
        config.simulation.clone(),
    ));

    info!("Commands: 'c' = level at current tilt, 'r' = reset calibration, Ctrl-C = quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                match line? {
                    Some(cmd) => match cmd.trim() {
                        "c" => match listener.last() {
                            // Offsets accumulate, so nudging by the current
                            // calibrated reading zeroes it.
                            Some(last) => session.apply_calibration_delta(last.pitch, last.roll),
                            None => warn!("No sample yet, nothing to calibrate against"),
                        },
                        "r" => session.reset_calibration(),
                        "" => {}
                        other => warn!(command = other, "Unknown command"),
                    },
                    None => {
                        // stdin closed; keep running until Ctrl-C.
                        tokio::signal::ctrl_c().await?;
                        break;
                    }
                }
            }
        }
    }

    sweep.abort();
    session.stop_listening();
    info!(
        samples = listener.samples(),
        pitch_offset = session.calibrated_pitch(),
        roll_offset = session.calibrated_roll(),
        "Bubble level stopped"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "level_app=info,level_orientation=info,level_config=info".into()),
        )
        .init();

    info!("Bubble level starting");

    let config = level_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    info!(sensor = ?config.sensor, interval_ms = config.simulation.sample_interval_ms, "Config loaded");

    match config.sensor {
        SensorKind::Accelerometer => run(AccelerometerAdapter, &config).await,
        SensorKind::Orientation => run(OrientationSensorAdapter, &config).await,
    }
}
