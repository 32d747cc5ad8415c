pub mod service;
pub mod state;

pub use service::{HealthStatus, PredictionService};
pub use state::{Readiness, ServiceState};
