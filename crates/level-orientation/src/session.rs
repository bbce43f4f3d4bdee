use crate::adapter::{AccelerometerAdapter, OrientationSensorAdapter, SensorAdapter};
use crate::backend::{ExecutionContext, SampleSink, SensorBackend};
use crate::engine::{OrientationEngine, OrientationListener};
use crate::error::SensorError;
use crate::types::{DeviceHandle, SamplingRate, SensorAccuracy, SensorPayload, SensorType, SessionState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type AccelerometerSession = SensorSession<AccelerometerAdapter>;
pub type OrientationSensorSession = SensorSession<OrientationSensorAdapter>;

/// The part of a session the backend calls into.
struct SessionSink<A> {
    adapter: A,
    engine: OrientationEngine,
    listening: AtomicBool,
}

impl<A: SensorAdapter> SampleSink for SessionSink<A> {
    fn on_sensor_changed(&self, payload: &SensorPayload) {
        if !self.listening.load(Ordering::SeqCst) {
            tracing::trace!("Dropping sample delivered while idle");
            return;
        }
        if payload.sensor_type != self.adapter.sensor_type() {
            tracing::trace!(sensor = %payload.sensor_type, "Ignoring foreign sensor payload");
            return;
        }

        let raw = self.adapter.convert_raw_payload(payload);
        self.engine.on_sample(raw.pitch, raw.roll);
    }

    fn on_accuracy_changed(&self, accuracy: SensorAccuracy) {
        tracing::debug!(?accuracy, "Sensor accuracy changed");
    }
}

/// What the session last resolved from the context.
#[derive(Default)]
struct Binding {
    backend: Option<Arc<dyn SensorBackend>>,
    device: Option<DeviceHandle>,
}

/// Sensor subscription lifecycle around an [`OrientationEngine`].
///
/// The backend is resolved through the injected [`ExecutionContext`] on every
/// lifecycle call, so a session can be built before the host binds one.
pub struct SensorSession<A: SensorAdapter> {
    context: Arc<dyn ExecutionContext>,
    sink: Arc<SessionSink<A>>,
    binding: Mutex<Binding>,
}

impl<A: SensorAdapter> SensorSession<A> {
    pub fn new(context: Arc<dyn ExecutionContext>, adapter: A) -> Self {
        Self {
            context,
            sink: Arc::new(SessionSink {
                adapter,
                engine: OrientationEngine::new(),
                listening: AtomicBool::new(false),
            }),
            binding: Mutex::new(Binding::default()),
        }
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sink.adapter.sensor_type()
    }

    /// Whether the bound backend has at least one device of our sensor type.
    pub fn is_supported(&self) -> bool {
        match self.context.sensor_backend() {
            Some(backend) => !backend.list_devices(self.sensor_type()).is_empty(),
            None => {
                tracing::debug!("No sensor backend bound, reporting unsupported");
                false
            }
        }
    }

    /// Subscribe to the first available device and route samples to `listener`.
    ///
    /// Returns whether the backend accepted the subscription. See
    /// [`try_start_listening`](Self::try_start_listening) for the reason on
    /// failure.
    pub fn start_listening(&self, listener: Arc<dyn OrientationListener>) -> bool {
        match self.try_start_listening(listener) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(%e, sensor = %self.sensor_type(), "Could not start listening");
                false
            }
        }
    }

    /// Like [`start_listening`](Self::start_listening), returning the chosen
    /// device.
    ///
    /// With no device available nothing changes and the listener is dropped.
    /// Otherwise the listener replaces any previous one even if the backend
    /// then rejects the subscription. Calling this while already listening
    /// subscribes again without unsubscribing first.
    pub fn try_start_listening(
        &self,
        listener: Arc<dyn OrientationListener>,
    ) -> Result<DeviceHandle, SensorError> {
        let backend = self.context.sensor_backend().ok_or(SensorError::NoBackend)?;
        let sensor_type = self.sensor_type();
        let device = backend
            .list_devices(sensor_type)
            .into_iter()
            .next()
            .ok_or(SensorError::NoDevice(sensor_type))?;

        if self.sink.engine.set_listener(listener).is_some() {
            tracing::debug!("Replaced existing orientation listener");
        }

        let sink: Arc<dyn SampleSink> = self.sink.clone();
        let result = backend.subscribe(&device, sink, SamplingRate::Normal);
        self.sink.listening.store(result.is_ok(), Ordering::SeqCst);

        {
            let mut binding = self.binding.lock();
            binding.backend = Some(backend);
            // A rejected retry leaves any earlier registration in place.
            if result.is_ok() {
                binding.device = Some(device.clone());
            }
        }

        result?;
        tracing::info!(device = %device.name, sensor = %sensor_type, "Listening for orientation");
        Ok(device)
    }

    /// Go idle and unsubscribe. Never fails; teardown errors are only logged.
    pub fn stop_listening(&self) {
        self.sink.listening.store(false, Ordering::SeqCst);

        let backend = {
            let mut binding = self.binding.lock();
            binding.device = None;
            binding.backend.clone()
        };

        let Some(backend) = backend.or_else(|| self.context.sensor_backend()) else {
            tracing::debug!("Stop requested with no sensor backend");
            return;
        };

        let sink: Arc<dyn SampleSink> = self.sink.clone();
        match backend.unsubscribe(&sink) {
            Ok(()) => tracing::info!(sensor = %self.sensor_type(), "Stopped listening"),
            Err(e) => tracing::debug!(%e, "Ignoring unsubscribe failure"),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.sink.listening.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        if self.is_listening() {
            SessionState::Listening
        } else {
            SessionState::Idle
        }
    }

    /// Device of the most recent accepted subscription, until stopped.
    pub fn device(&self) -> Option<DeviceHandle> {
        self.binding.lock().device.clone()
    }

    pub fn engine(&self) -> &OrientationEngine {
        &self.sink.engine
    }

    pub fn reset_calibration(&self) {
        self.engine().reset_calibration();
    }

    pub fn apply_calibration_delta(&self, delta_pitch: f32, delta_roll: f32) {
        self.engine().apply_calibration_delta(delta_pitch, delta_roll);
    }

    pub fn calibrated_pitch(&self) -> f32 {
        self.engine().calibrated_pitch()
    }

    pub fn calibrated_roll(&self) -> f32 {
        self.engine().calibrated_roll()
    }
}

impl<A: SensorAdapter> Drop for SensorSession<A> {
    fn drop(&mut self) {
        // The backend holds the sink, so a registration left behind leaks it.
        // Listening may be false while one exists after a rejected restart.
        self.stop_listening();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{LoopbackBackend, StaticContext};
    use crate::types::{Orientation, OrientationEvent};
    use glam::Vec3;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<OrientationEvent>>,
    }

    impl OrientationListener for Recorder {
        fn on_orientation_changed(&self, orientation: Orientation, pitch: f32, roll: f32) {
            self.events.lock().push(OrientationEvent {
                orientation,
                pitch,
                roll,
            });
        }
    }

    /// Context whose backend can be unbound mid-session.
    struct SwitchableContext {
        backend: Mutex<Option<Arc<LoopbackBackend>>>,
    }

    impl ExecutionContext for SwitchableContext {
        fn sensor_backend(&self) -> Option<Arc<dyn SensorBackend>> {
            self.backend
                .lock()
                .clone()
                .map(|b| b as Arc<dyn SensorBackend>)
        }
    }

    fn orientation_setup(devices: u32) -> (Arc<LoopbackBackend>, OrientationSensorSession) {
        let backend = Arc::new(LoopbackBackend::with_devices(SensorType::Orientation, devices));
        let context = Arc::new(StaticContext::new(backend.clone()));
        (backend, SensorSession::new(context, OrientationSensorAdapter))
    }

    fn tilt(pitch: f32, roll: f32) -> SensorPayload {
        tilt_at(pitch, roll, 0)
    }

    /// Tilt stamped `n` normal-rate periods in.
    fn tilt_at(pitch: f32, roll: f32, n: u64) -> SensorPayload {
        let ts = n * SamplingRate::Normal.period().as_nanos() as u64;
        SensorPayload::new(SensorType::Orientation, Vec3::new(0.0, pitch, roll), ts)
    }

    #[test]
    fn starts_and_routes_samples() {
        let (backend, session) = orientation_setup(2);
        let recorder = Arc::new(Recorder::default());

        assert!(session.is_supported());
        assert!(session.start_listening(recorder.clone()));
        assert!(session.is_listening());
        assert_eq!(session.state(), SessionState::Listening);

        let (device, rate) = backend.last_subscription().unwrap();
        assert_eq!(device.id, 0);
        assert_eq!(rate, SamplingRate::Normal);
        assert_eq!(session.device(), Some(device));

        backend.deliver(tilt(0.0, 50.0));
        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].orientation, Orientation::Right);
        assert!((events[0].roll - 50.0).abs() < 1e-6);
    }

    #[test]
    fn no_device_leaves_session_idle() {
        let (backend, session) = orientation_setup(0);
        let recorder = Arc::new(Recorder::default());

        assert!(!session.is_supported());
        assert_eq!(
            session.try_start_listening(recorder.clone()),
            Err(SensorError::NoDevice(SensorType::Orientation))
        );
        assert!(!session.start_listening(recorder));
        assert!(!session.is_listening());
        assert!(!session.engine().has_listener());
        assert_eq!(backend.subscription_count(), 0);
    }

    #[test]
    fn wrong_sensor_type_is_unsupported() {
        let backend = Arc::new(LoopbackBackend::with_devices(SensorType::Orientation, 1));
        let session = AccelerometerSession::new(
            Arc::new(StaticContext::new(backend)),
            AccelerometerAdapter,
        );
        assert!(!session.is_supported());
        assert!(!session.start_listening(Arc::new(Recorder::default())));
    }

    #[test]
    fn unbound_context_is_unsupported() {
        let session = OrientationSensorSession::new(
            Arc::new(StaticContext::unbound()),
            OrientationSensorAdapter,
        );
        assert!(!session.is_supported());
        assert_eq!(
            session.try_start_listening(Arc::new(Recorder::default())),
            Err(SensorError::NoBackend)
        );
        session.stop_listening();
        assert!(!session.is_listening());
    }

    #[test]
    fn rejected_subscription_reports_false() {
        let (backend, session) = orientation_setup(1);
        backend.set_reject_subscriptions(true);

        assert!(!session.start_listening(Arc::new(Recorder::default())));
        assert!(!session.is_listening());
        assert_eq!(session.device(), None);
    }

    #[test]
    fn stop_blocks_later_deliveries() {
        let (backend, session) = orientation_setup(1);
        let recorder = Arc::new(Recorder::default());
        assert!(session.start_listening(recorder.clone()));

        session.stop_listening();
        assert_eq!(backend.subscription_count(), 0);
        backend.deliver(tilt(-90.0, 0.0));
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn idle_sink_ignores_stray_delivery() {
        let (backend, session) = orientation_setup(1);
        let recorder = Arc::new(Recorder::default());
        assert!(session.start_listening(recorder.clone()));

        // Sink still registered but the session has gone idle.
        session.sink.listening.store(false, Ordering::SeqCst);
        backend.deliver(tilt(-90.0, 0.0));
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let (_backend, session) = orientation_setup(1);
        assert!(session.start_listening(Arc::new(Recorder::default())));

        session.stop_listening();
        session.stop_listening();
        assert!(!session.is_listening());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let (_backend, session) = orientation_setup(1);
        session.stop_listening();
        assert!(!session.is_listening());
    }

    #[test]
    fn restart_replaces_listener() {
        let (backend, session) = orientation_setup(1);
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        assert!(session.start_listening(first.clone()));
        assert!(session.start_listening(second.clone()));
        assert_eq!(backend.subscription_count(), 2);

        backend.deliver(tilt(100.0, 0.0));
        assert!(first.events.lock().is_empty());
        assert!(!second.events.lock().is_empty());

        // One stop clears every registration of the sink.
        session.stop_listening();
        assert_eq!(backend.subscription_count(), 0);
    }

    #[test]
    fn calibration_applies_to_backend_samples() {
        let (backend, session) = orientation_setup(1);
        let recorder = Arc::new(Recorder::default());
        assert!(session.start_listening(recorder.clone()));

        session.apply_calibration_delta(10.0, 0.0);
        backend.deliver(tilt_at(-100.0, 0.0, 0));
        session.reset_calibration();
        backend.deliver(tilt_at(-100.0, 0.0, 1));

        let events = recorder.events.lock();
        assert_eq!(events[0].orientation, Orientation::Top);
        assert!((events[0].pitch + 110.0).abs() < 1e-6);
        assert!((events[1].pitch + 100.0).abs() < 1e-6);
        assert_eq!(session.calibrated_pitch(), 0.0);
        assert_eq!(session.calibrated_roll(), 0.0);
    }

    #[test]
    fn accelerometer_session_end_to_end() {
        let backend = Arc::new(LoopbackBackend::with_devices(SensorType::Accelerometer, 1));
        let session = AccelerometerSession::new(
            Arc::new(StaticContext::new(backend.clone())),
            AccelerometerAdapter,
        );
        let recorder = Arc::new(Recorder::default());
        assert!(session.start_listening(recorder.clone()));

        backend.deliver(SensorPayload::new(
            SensorType::Accelerometer,
            Vec3::new(0.0, 9.81, 0.0),
            1,
        ));
        assert_eq!(recorder.events.lock()[0].orientation, Orientation::Top);
    }

    #[test]
    fn normal_rate_thins_fast_deliveries() {
        let (backend, session) = orientation_setup(1);
        let recorder = Arc::new(Recorder::default());
        assert!(session.start_listening(recorder.clone()));

        // Ten payloads within one normal period, then one a period later.
        let step = SamplingRate::Normal.period().as_nanos() as u64 / 10;
        for i in 0..10 {
            let mut payload = tilt(0.0, 0.0);
            payload.timestamp_ns = i * step;
            backend.deliver(payload);
        }
        backend.deliver(tilt_at(0.0, 0.0, 1));
        assert_eq!(recorder.events.lock().len(), 2);
    }

    #[test]
    fn rejected_restart_keeps_first_registration() {
        let (backend, session) = orientation_setup(1);
        assert!(session.start_listening(Arc::new(Recorder::default())));
        let first_device = session.device();

        backend.set_reject_subscriptions(true);
        assert!(!session.start_listening(Arc::new(Recorder::default())));
        assert!(!session.is_listening());
        assert_eq!(backend.subscription_count(), 1);
        assert_eq!(session.device(), first_device);

        drop(session);
        assert_eq!(backend.subscription_count(), 0);
    }

    #[test]
    fn stop_after_backend_lost_registration() {
        let (backend, session) = orientation_setup(1);
        assert!(session.start_listening(Arc::new(Recorder::default())));

        // Backend drops the registration on its own, e.g. a service restart.
        let sink: Arc<dyn SampleSink> = session.sink.clone();
        backend.unsubscribe(&sink).unwrap();

        session.stop_listening();
        assert!(!session.is_listening());
        assert_eq!(session.device(), None);
        session.stop_listening();
        assert!(!session.is_listening());
    }

    #[test]
    fn stop_after_context_unbinds() {
        let backend = Arc::new(LoopbackBackend::with_devices(SensorType::Orientation, 1));
        let context = Arc::new(SwitchableContext {
            backend: Mutex::new(Some(backend.clone())),
        });
        let session = OrientationSensorSession::new(context.clone(), OrientationSensorAdapter);
        let recorder = Arc::new(Recorder::default());
        assert!(session.start_listening(recorder.clone()));

        *context.backend.lock() = None;
        assert!(!session.is_supported());

        session.stop_listening();
        assert!(!session.is_listening());
        backend.deliver(tilt(-90.0, 0.0));
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn stop_on_never_bound_context_is_quiet() {
        let context = Arc::new(SwitchableContext {
            backend: Mutex::new(None),
        });
        let session = OrientationSensorSession::new(context, OrientationSensorAdapter);
        session.stop_listening();
        session.stop_listening();
        assert!(!session.is_listening());
    }

    #[test]
    fn drop_unsubscribes() {
        let (backend, session) = orientation_setup(1);
        assert!(session.start_listening(Arc::new(Recorder::default())));
        drop(session);
        assert_eq!(backend.subscription_count(), 0);
    }
}
