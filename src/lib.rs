// Library exports for the workout session tracker

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use api::{ApiError, ProgressClient, ProgressStore};
pub use config::{ApiConfig, SessionConfig};
pub use errors::TrackerError;
pub use services::{SaveOutcome, WorkoutSessionTracker};
