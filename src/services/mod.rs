// Workout session services

pub mod debounce;
pub mod plan_reconciliation;
pub mod progress_view;
pub mod rest_timer;
pub mod session_tracker;
pub mod snapshot;
pub mod workout_state;

pub use debounce::Debouncer;
pub use progress_view::{ProgressSource, ProgressView, SessionStats, SetCounts};
pub use rest_timer::RestTimer;
pub use session_tracker::{SaveOutcome, WorkoutSessionTracker};
pub use snapshot::{embed_progress, extract_progress, sync_embedded_progress};
pub use workout_state::{DayOutcome, SetField, WorkoutAction, WorkoutState};
