use thiserror::Error;

/// Rejections produced by the progress reducer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Day {day} does not exist")]
    DayOutOfRange { day: usize },

    #[error("Exercise {exercise} does not exist on day {day}")]
    ExerciseOutOfRange { day: usize, exercise: usize },

    #[error("Set {set} is out of bounds for exercise {exercise} on day {day} ({len} sets)")]
    SetOutOfRange {
        day: usize,
        exercise: usize,
        set: usize,
        len: usize,
    },

    #[error("Day {day} is locked")]
    DayLocked { day: usize },

    #[error("Day {day} is already completed")]
    DayCompleted { day: usize },

    #[error("Exercise {exercise} on day {day} must keep at least one set")]
    LastSet { day: usize, exercise: usize },

    #[error("Day {day} already has progress")]
    DayExists { day: usize },
}

impl TrackerError {
    /// True for invalid day/exercise/set indices.
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            TrackerError::DayOutOfRange { .. }
                | TrackerError::ExerciseOutOfRange { .. }
                | TrackerError::SetOutOfRange { .. }
        )
    }
}
