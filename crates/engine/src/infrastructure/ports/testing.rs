//! Testability ports for injecting time and randomness.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    /// Uniform face in `min..=max`.
    fn gen_range(&self, min: u32, max: u32) -> u32;
    fn gen_uuid(&self) -> Uuid;
}
