use crate::backend::{same_sink, ExecutionContext, SampleSink, SensorBackend};
use crate::error::SensorError;
use crate::types::{DeviceHandle, SamplingRate, SensorAccuracy, SensorPayload, SensorType};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Subscription {
    device: DeviceHandle,
    sink: Arc<dyn SampleSink>,
    rate: SamplingRate,
    last_delivered_ns: Option<u64>,
}

impl Subscription {
    /// Whether `timestamp_ns` is at least one rate period after the last delivery.
    fn is_due(&self, timestamp_ns: u64) -> bool {
        let period = self.rate.period().as_nanos() as u64;
        self.last_delivered_ns
            .map_or(true, |last| timestamp_ns.saturating_sub(last) >= period)
    }
}

/// In-process backend whose events are injected by the caller.
///
/// Injected payloads reach every sink subscribed to a device of the matching
/// sensor type, thinned to each subscription's rate using the payload
/// timestamps. Used by the simulator and in tests.
pub struct LoopbackBackend {
    devices: Vec<DeviceHandle>,
    subscriptions: Mutex<Vec<Subscription>>,
    reject_subscriptions: AtomicBool,
}

impl LoopbackBackend {
    pub fn new(devices: Vec<DeviceHandle>) -> Self {
        Self {
            devices,
            subscriptions: Mutex::new(Vec::new()),
            reject_subscriptions: AtomicBool::new(false),
        }
    }

    /// Backend exposing `count` devices of one sensor type.
    pub fn with_devices(sensor_type: SensorType, count: u32) -> Self {
        let devices = (0..count)
            .map(|id| DeviceHandle {
                id,
                name: format!("loopback {sensor_type} #{id}"),
                sensor_type,
            })
            .collect();
        Self::new(devices)
    }

    /// Make subsequent `subscribe` calls fail.
    pub fn set_reject_subscriptions(&self, reject: bool) {
        self.reject_subscriptions.store(reject, Ordering::SeqCst);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Rate and device of the most recent subscription, if any.
    pub fn last_subscription(&self) -> Option<(DeviceHandle, SamplingRate)> {
        self.subscriptions
            .lock()
            .last()
            .map(|s| (s.device.clone(), s.rate))
    }

    /// Fan `payload` out to matching subscribers that are due for a sample.
    /// Returns how many received it.
    pub fn deliver(&self, payload: SensorPayload) -> usize {
        // Snapshot so sinks can (un)subscribe from inside the callback.
        let sinks: Vec<_> = self
            .subscriptions
            .lock()
            .iter_mut()
            .filter(|s| s.device.sensor_type == payload.sensor_type)
            .filter(|s| s.is_due(payload.timestamp_ns))
            .map(|s| {
                s.last_delivered_ns = Some(payload.timestamp_ns);
                s.sink.clone()
            })
            .collect();

        for sink in &sinks {
            sink.on_sensor_changed(&payload);
        }
        sinks.len()
    }

    pub fn deliver_accuracy(&self, sensor_type: SensorType, accuracy: SensorAccuracy) {
        let sinks: Vec<_> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.device.sensor_type == sensor_type)
            .map(|s| s.sink.clone())
            .collect();

        for sink in &sinks {
            sink.on_accuracy_changed(accuracy);
        }
    }
}

impl SensorBackend for LoopbackBackend {
    fn list_devices(&self, sensor_type: SensorType) -> Vec<DeviceHandle> {
        self.devices
            .iter()
            .filter(|d| d.sensor_type == sensor_type)
            .cloned()
            .collect()
    }

    fn subscribe(
        &self,
        device: &DeviceHandle,
        sink: Arc<dyn SampleSink>,
        rate: SamplingRate,
    ) -> Result<(), SensorError> {
        if self.reject_subscriptions.load(Ordering::SeqCst) || !self.devices.contains(device) {
            return Err(SensorError::SubscribeRejected);
        }

        tracing::debug!(device = %device.name, ?rate, "Loopback subscription added");
        self.subscriptions.lock().push(Subscription {
            device: device.clone(),
            sink,
            rate,
            last_delivered_ns: None,
        });
        Ok(())
    }

    fn unsubscribe(&self, sink: &Arc<dyn SampleSink>) -> Result<(), SensorError> {
        let mut subscriptions = self.subscriptions.lock();
        let before = subscriptions.len();
        subscriptions.retain(|s| !same_sink(&s.sink, sink));

        if subscriptions.len() == before {
            Err(SensorError::NotSubscribed)
        } else {
            Ok(())
        }
    }
}

/// Context that always (or never) resolves to a fixed backend.
pub struct StaticContext {
    backend: Option<Arc<dyn SensorBackend>>,
}

impl StaticContext {
    pub fn new(backend: Arc<dyn SensorBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A context with no backend bound yet.
    pub fn unbound() -> Self {
        Self { backend: None }
    }
}

impl ExecutionContext for StaticContext {
    fn sensor_backend(&self) -> Option<Arc<dyn SensorBackend>> {
        self.backend.clone()
    }
}
