pub mod health;

pub use health::{ComponentHealth, HealthResponse, health_check, liveness, readiness};
