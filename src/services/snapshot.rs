// Progress travels to the server embedded in the plan's schedule.

use crate::models::{
    DayProgress, DayStatus, ExerciseProgress, ExerciseSets, ExerciseTemplate, Plan, SetDefaults,
    WorkoutSummary,
};

use super::workout_state::WorkoutState;

/// Copy of `plan` with the tracked progress spliced into its days and exercises.
pub fn embed_progress(plan: &Plan, state: &WorkoutState) -> Plan {
    let mut snapshot = plan.clone();

    for (index, day) in snapshot.schedule.iter_mut().enumerate() {
        let Some(progress) = state.day(index) else {
            continue;
        };

        day.workout_status = Some(progress.status);
        day.workout_started_at = progress.started_at;
        day.workout_completed_at = progress.completed_at;
        day.workout_ended_at = progress.ended_at;
        day.workout_duration = Some(progress.total_time_spent);
        day.workout_attempts = Some(progress.attempts);
        day.workout_notes = progress
            .workout_summary
            .as_ref()
            .map(|summary| summary.user_notes.clone());
        day.workout_was_completed = progress
            .workout_summary
            .as_ref()
            .map(|summary| summary.was_completed);

        for (exercise, tracked) in day.exercises.iter_mut().zip(&progress.exercises) {
            exercise.sets = Some(ExerciseSets::Records(tracked.sets.clone()));
            exercise.exercise_notes = Some(tracked.exercise_notes.clone());
            exercise.exercise_completed = Some(tracked.completed);
        }
    }

    snapshot
}

/// Bring progress already embedded in `plan` up to date with `state`.
/// Plans that carry no recorded sets are left untouched.
pub fn sync_embedded_progress(plan: &mut Plan, state: &WorkoutState) {
    let carries_progress = plan
        .schedule
        .iter()
        .flat_map(|day| &day.exercises)
        .any(|exercise| exercise.embedded_sets().is_some());

    if carries_progress {
        *plan = embed_progress(plan, state);
    }
}

/// Rebuild tracked progress from a plan that went through [`embed_progress`].
///
/// A day stored as completed leaves its successor accessible, which repairs
/// unlock chains broken by plans extended after the fact. Only a successor
/// stored as locked (or with no status) is unlocked; a stored in-progress,
/// ended or completed successor keeps its status.
pub fn extract_progress(plan: &Plan, defaults: &SetDefaults) -> WorkoutState {
    let mut previous_completed = false;

    let days = plan.schedule.iter().enumerate().map(|(index, day)| {
        let stored = day.workout_status;
        let mut status = stored.unwrap_or(if index == 0 {
            DayStatus::Unlocked
        } else {
            DayStatus::Locked
        });
        if previous_completed && status == DayStatus::Locked {
            status = DayStatus::Unlocked;
        }
        previous_completed = stored == Some(DayStatus::Completed);

        let exercises = day
            .exercises
            .iter()
            .map(|exercise| {
                let notes = exercise.exercise_notes.clone().unwrap_or_default();
                match exercise.embedded_sets() {
                    Some(records) => {
                        let mut progress = ExerciseProgress::from_sets(records.to_vec(), notes);
                        progress.renumber();
                        progress
                    }
                    None => {
                        let mut progress = ExerciseProgress::from_template(
                            &ExerciseTemplate::resolve(exercise, defaults),
                        );
                        progress.exercise_notes = notes;
                        progress
                    }
                }
            })
            .collect();

        let total_time_spent = day.workout_duration.unwrap_or(0);
        let workout_summary = if day.workout_notes.is_some() || day.workout_was_completed.is_some() {
            Some(WorkoutSummary {
                user_notes: day.workout_notes.clone().unwrap_or_default(),
                completed_at: day.workout_completed_at,
                ended_at: day.workout_ended_at,
                duration: total_time_spent,
                was_completed: day
                    .workout_was_completed
                    .unwrap_or(status == DayStatus::Completed),
            })
        } else {
            None
        };

        let attempts = day
            .workout_attempts
            .unwrap_or(u32::from(day.workout_started_at.is_some()));

        let progress = DayProgress {
            status,
            started_at: day.workout_started_at,
            completed_at: day.workout_completed_at,
            ended_at: day.workout_ended_at,
            total_time_spent,
            attempts,
            workout_summary,
            exercises,
        };

        (index, progress)
    });

    WorkoutState::from_days(days.collect::<Vec<_>>())
}
