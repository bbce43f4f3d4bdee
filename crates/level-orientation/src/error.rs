use crate::types::SensorType;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("No sensor backend bound to the execution context")]
    NoBackend,
    #[error("No {0} sensor available")]
    NoDevice(SensorType),
    #[error("Backend rejected the subscription")]
    SubscribeRejected,
    #[error("Sink was not subscribed")]
    NotSubscribed,
}
