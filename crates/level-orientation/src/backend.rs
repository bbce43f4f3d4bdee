use crate::error::SensorError;
use crate::types::{DeviceHandle, SamplingRate, SensorAccuracy, SensorPayload, SensorType};
use std::sync::Arc;

/// Callback target a backend delivers events into.
///
/// Backends call this serially per registration, from whatever thread they
/// deliver on.
pub trait SampleSink: Send + Sync {
    fn on_sensor_changed(&self, payload: &SensorPayload);

    fn on_accuracy_changed(&self, _accuracy: SensorAccuracy) {}
}

/// Trait for platform-specific sensor services.
pub trait SensorBackend: Send + Sync {
    /// Devices providing `sensor_type`, in backend preference order.
    fn list_devices(&self, sensor_type: SensorType) -> Vec<DeviceHandle>;

    /// Start delivering events from `device` to `sink`.
    fn subscribe(
        &self,
        device: &DeviceHandle,
        sink: Arc<dyn SampleSink>,
        rate: SamplingRate,
    ) -> Result<(), SensorError>;

    /// Stop all deliveries to `sink`.
    fn unsubscribe(&self, sink: &Arc<dyn SampleSink>) -> Result<(), SensorError>;
}

/// Resolves the sensor backend for the running host.
///
/// Returns `None` until the host has bound one.
pub trait ExecutionContext: Send + Sync {
    fn sensor_backend(&self) -> Option<Arc<dyn SensorBackend>>;
}

/// Compare two sinks by allocation, ignoring vtable metadata.
pub(crate) fn same_sink(a: &Arc<dyn SampleSink>, b: &Arc<dyn SampleSink>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
