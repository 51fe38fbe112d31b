use serde::Serialize;

use crate::models::{DayStatus, Plan, SetRecord};

use super::workout_state::WorkoutState;

/// Where a set count was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Sets embedded in the plan by a previous save
    Plan,
    /// The tracker's own progress map
    Tracker,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SetCounts {
    pub completed: usize,
    pub total: usize,
}

impl SetCounts {
    fn from_sets(sets: &[SetRecord]) -> Self {
        Self {
            completed: sets.iter().filter(|set| set.completed).count(),
            total: sets.len(),
        }
    }

    /// Rounded completion percentage, 0 when there is nothing to do
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

impl std::ops::Add for SetCounts {
    type Output = SetCounts;

    fn add(self, other: SetCounts) -> SetCounts {
        SetCounts {
            completed: self.completed + other.completed,
            total: self.total + other.total,
        }
    }
}

/// Aggregate numbers for the whole plan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_days: usize,
    pub completed_days: usize,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub total_sets: usize,
    pub completed_sets: usize,
    pub total_time_spent: u64,
    pub progress_percent: u32,
}

/// Read-only progress queries over a plan and the tracker state.
///
/// Set counts come from the plan when it carries recorded sets for an
/// exercise and from the tracker otherwise.
pub struct ProgressView<'a> {
    plan: Option<&'a Plan>,
    workout: &'a WorkoutState,
}

impl<'a> ProgressView<'a> {
    pub fn new(plan: Option<&'a Plan>, workout: &'a WorkoutState) -> Self {
        Self { plan, workout }
    }

    /// Completed/total sets for one exercise, following the source chain.
    pub fn exercise_counts(&self, day: usize, exercise: usize) -> Option<(SetCounts, ProgressSource)> {
        self.plan_counts(day, exercise)
            .map(|counts| (counts, ProgressSource::Plan))
            .or_else(|| {
                self.tracker_counts(day, exercise)
                    .map(|counts| (counts, ProgressSource::Tracker))
            })
    }

    fn plan_counts(&self, day: usize, exercise: usize) -> Option<SetCounts> {
        self.plan?
            .exercise(day, exercise)?
            .embedded_sets()
            .map(SetCounts::from_sets)
    }

    fn tracker_counts(&self, day: usize, exercise: usize) -> Option<SetCounts> {
        self.workout
            .exercise(day, exercise)
            .map(|progress| SetCounts::from_sets(&progress.sets))
    }

    fn exercise_count(&self, day: usize) -> usize {
        let planned = self
            .plan
            .and_then(|plan| plan.day(day))
            .map(|d| d.exercises.len());
        let tracked = self.workout.day(day).map(|d| d.exercises.len());

        planned.or(tracked).unwrap_or(0)
    }

    fn day_count(&self) -> usize {
        let planned = self.plan.map(|plan| plan.schedule.len()).unwrap_or(0);
        let tracked = self
            .workout
            .days()
            .map(|(index, _)| index + 1)
            .max()
            .unwrap_or(0);

        planned.max(tracked)
    }

    pub fn exercise_progress(&self, day: usize, exercise: usize) -> u32 {
        self.exercise_counts(day, exercise)
            .map(|(counts, _)| counts.percent())
            .unwrap_or(0)
    }

    pub fn day_counts(&self, day: usize) -> SetCounts {
        (0..self.exercise_count(day))
            .filter_map(|exercise| self.exercise_counts(day, exercise))
            .fold(SetCounts::default(), |acc, (counts, _)| acc + counts)
    }

    pub fn day_progress(&self, day: usize) -> u32 {
        self.day_counts(day).percent()
    }

    pub fn total_session_stats(&self) -> SessionStats {
        let mut stats = SessionStats::default();
        let mut sets = SetCounts::default();

        for day in 0..self.day_count() {
            stats.total_days += 1;
            if let Some(progress) = self.workout.day(day) {
                stats.total_time_spent += progress.total_time_spent;
                if progress.status == DayStatus::Completed {
                    stats.completed_days += 1;
                }
            }

            for exercise in 0..self.exercise_count(day) {
                let Some((counts, _)) = self.exercise_counts(day, exercise) else {
                    continue;
                };
                stats.total_exercises += 1;
                if counts.total > 0 && counts.is_complete() {
                    stats.completed_exercises += 1;
                }
                sets = sets + counts;
            }
        }

        stats.total_sets = sets.total;
        stats.completed_sets = sets.completed;
        stats.progress_percent = sets.percent();
        stats
    }
}
