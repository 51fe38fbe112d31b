use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::plan_reconciliation::{apply_reps_change, reconcile_sets};
use crate::errors::TrackerError;
use crate::models::{
    DayProgress, DayStatus, ExerciseProgress, ExerciseTemplate, Plan, SetDefaults, SetRecord,
    WorkoutSummary,
};

/// Field write on a single set
#[derive(Debug, Clone, PartialEq)]
pub enum SetField {
    Weight(String),
    Reps(String),
    Completed(bool),
    Notes(String),
    RestTime(u32),
    ActualRestTime(Option<u32>),
}

/// How a day's session was finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    Completed,
    Ended,
}

/// Every transition the progress map supports.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkoutAction {
    UpdateSet {
        day: usize,
        exercise: usize,
        set: usize,
        field: SetField,
    },
    UndoSet {
        day: usize,
        exercise: usize,
        set: usize,
    },
    StartDay {
        day: usize,
    },
    FinishDay {
        day: usize,
        outcome: DayOutcome,
        notes: String,
        duration_secs: u64,
    },
    AddSet {
        day: usize,
        exercise: usize,
        template: ExerciseTemplate,
    },
    RemoveSet {
        day: usize,
        exercise: usize,
    },
    SetExerciseNotes {
        day: usize,
        exercise: usize,
        notes: String,
    },
    ReplaceExercise {
        day: usize,
        exercise: usize,
        template: ExerciseTemplate,
    },
    RemoveExercise {
        day: usize,
        exercise: usize,
    },
    ChangeReps {
        day: usize,
        exercise: usize,
        reps: String,
    },
    AddDay {
        day: usize,
        exercises: Vec<ExerciseTemplate>,
    },
}

/// Progress for a whole plan, keyed by day index.
///
/// Values are never mutated in place from the outside: [`WorkoutState::apply`]
/// returns the next state and leaves the current one untouched on rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkoutState {
    days: BTreeMap<usize, DayProgress>,
}

/// Whole seconds from `start` to `end`, zero if the clock went backwards.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_seconds().max(0) as u64
}

impl WorkoutState {
    /// Fresh progress matching the plan's current shape. Day 0 starts unlocked.
    pub fn from_plan(plan: &Plan, defaults: &SetDefaults) -> Self {
        let days = plan
            .schedule
            .iter()
            .enumerate()
            .map(|(index, day)| {
                let templates: Vec<ExerciseTemplate> = day
                    .exercises
                    .iter()
                    .map(|exercise| ExerciseTemplate::resolve(exercise, defaults))
                    .collect();
                let status = if index == 0 {
                    DayStatus::Unlocked
                } else {
                    DayStatus::Locked
                };
                (index, DayProgress::from_templates(status, &templates))
            })
            .collect();

        Self { days }
    }

    pub fn from_days(days: impl IntoIterator<Item = (usize, DayProgress)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    pub fn day(&self, day: usize) -> Option<&DayProgress> {
        self.days.get(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = (usize, &DayProgress)> {
        self.days.iter().map(|(index, day)| (*index, day))
    }

    pub fn exercise(&self, day: usize, exercise: usize) -> Option<&ExerciseProgress> {
        self.day(day).and_then(|d| d.exercises.get(exercise))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// First day currently in progress
    pub fn active_day(&self) -> Option<usize> {
        self.days
            .iter()
            .find(|(_, day)| day.status == DayStatus::InProgress)
            .map(|(index, _)| *index)
    }

    /// Overlay persisted progress onto this state. Days unknown to the
    /// current plan are dropped.
    pub fn merge(&self, persisted: WorkoutState) -> WorkoutState {
        let mut next = self.clone();
        for (index, day) in persisted.days {
            if let Some(slot) = next.days.get_mut(&index) {
                *slot = day;
            }
        }
        next
    }

    /// Produce the state that follows `action`.
    pub fn apply(&self, action: WorkoutAction, now: DateTime<Utc>) -> Result<WorkoutState, TrackerError> {
        let mut next = self.clone();

        match action {
            WorkoutAction::UpdateSet {
                day,
                exercise,
                set,
                field,
            } => next.update_set(day, exercise, set, field, now)?,
            WorkoutAction::UndoSet { day, exercise, set } => next.undo_set(day, exercise, set)?,
            WorkoutAction::StartDay { day } => next.start_day(day, now)?,
            WorkoutAction::FinishDay {
                day,
                outcome,
                notes,
                duration_secs,
            } => next.finish_day(day, outcome, &notes, duration_secs, now)?,
            WorkoutAction::AddSet {
                day,
                exercise,
                template,
            } => {
                let progress = next.exercise_mut(day, exercise)?;
                let set_number = progress.sets.len() as u32 + 1;
                progress
                    .sets
                    .push(SetRecord::from_template(set_number, &template));
                progress.refresh_completed();
            }
            WorkoutAction::RemoveSet { day, exercise } => {
                let progress = next.exercise_mut(day, exercise)?;
                if progress.sets.len() <= 1 {
                    return Err(TrackerError::LastSet { day, exercise });
                }
                progress.sets.pop();
                progress.renumber();
                progress.refresh_completed();
            }
            WorkoutAction::SetExerciseNotes {
                day,
                exercise,
                notes,
            } => {
                next.exercise_mut(day, exercise)?.exercise_notes = notes;
            }
            WorkoutAction::ReplaceExercise {
                day,
                exercise,
                template,
            } => {
                let exercises = &mut next.day_mut(day)?.exercises;
                if exercise < exercises.len() {
                    reconcile_sets(&mut exercises[exercise], &template);
                } else if exercise == exercises.len() {
                    exercises.push(ExerciseProgress::from_template(&template));
                } else {
                    return Err(TrackerError::ExerciseOutOfRange { day, exercise });
                }
            }
            WorkoutAction::RemoveExercise { day, exercise } => {
                let exercises = &mut next.day_mut(day)?.exercises;
                if exercise >= exercises.len() {
                    return Err(TrackerError::ExerciseOutOfRange { day, exercise });
                }
                // Vec removal keeps the remaining indices dense
                exercises.remove(exercise);
            }
            WorkoutAction::ChangeReps {
                day,
                exercise,
                reps,
            } => apply_reps_change(next.exercise_mut(day, exercise)?, &reps),
            WorkoutAction::AddDay { day, exercises } => {
                if next.days.contains_key(&day) {
                    return Err(TrackerError::DayExists { day });
                }
                next.days
                    .insert(day, DayProgress::from_templates(DayStatus::Locked, &exercises));
            }
        }

        Ok(next)
    }

    fn day_mut(&mut self, day: usize) -> Result<&mut DayProgress, TrackerError> {
        self.days
            .get_mut(&day)
            .ok_or(TrackerError::DayOutOfRange { day })
    }

    fn exercise_mut(&mut self, day: usize, exercise: usize) -> Result<&mut ExerciseProgress, TrackerError> {
        self.day_mut(day)?
            .exercises
            .get_mut(exercise)
            .ok_or(TrackerError::ExerciseOutOfRange { day, exercise })
    }

    fn update_set(
        &mut self,
        day: usize,
        exercise: usize,
        set: usize,
        field: SetField,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        let day_progress = self.day_mut(day)?;
        match day_progress.status {
            DayStatus::Locked => return Err(TrackerError::DayLocked { day }),
            DayStatus::Completed => return Err(TrackerError::DayCompleted { day }),
            _ => {}
        }

        let progress = day_progress
            .exercises
            .get_mut(exercise)
            .ok_or(TrackerError::ExerciseOutOfRange { day, exercise })?;
        let len = progress.sets.len();
        if set >= len {
            return Err(TrackerError::SetOutOfRange {
                day,
                exercise,
                set,
                len,
            });
        }

        let previous_done = set
            .checked_sub(1)
            .and_then(|prev| progress.sets[prev].completed_at);
        let record = &mut progress.sets[set];

        match field {
            SetField::Weight(weight) => record.weight = weight,
            SetField::Reps(reps) => record.reps = reps,
            SetField::Notes(notes) => record.notes = notes,
            SetField::RestTime(secs) => record.rest_time = Some(secs),
            SetField::ActualRestTime(secs) => record.actual_rest_time = secs,
            SetField::Completed(done) => {
                record.completed = done;
                if done {
                    record.completed_at = Some(now);
                    if record.actual_rest_time.is_none() {
                        record.actual_rest_time =
                            previous_done.map(|prev| elapsed_seconds(prev, now) as u32);
                    }
                }
            }
        }

        progress.refresh_completed();
        Ok(())
    }

    fn undo_set(&mut self, day: usize, exercise: usize, set: usize) -> Result<(), TrackerError> {
        let day_progress = self.day_mut(day)?;
        if day_progress.status == DayStatus::Completed {
            return Err(TrackerError::DayCompleted { day });
        }

        let progress = day_progress
            .exercises
            .get_mut(exercise)
            .ok_or(TrackerError::ExerciseOutOfRange { day, exercise })?;
        let len = progress.sets.len();
        let record = progress.sets.get_mut(set).ok_or(TrackerError::SetOutOfRange {
            day,
            exercise,
            set,
            len,
        })?;

        record.completed = false;
        record.completed_at = None;
        progress.refresh_completed();
        Ok(())
    }

    fn start_day(&mut self, day: usize, now: DateTime<Utc>) -> Result<(), TrackerError> {
        let status = self.day_mut(day)?.status;
        match status {
            DayStatus::Locked => return Err(TrackerError::DayLocked { day }),
            DayStatus::Completed => return Err(TrackerError::DayCompleted { day }),
            _ => {}
        }

        // Only one day may be in progress at a time
        for (index, other) in self.days.iter_mut() {
            if *index == day || other.status != DayStatus::InProgress {
                continue;
            }

            let duration = other
                .started_at
                .map(|started| elapsed_seconds(started, now))
                .unwrap_or(0);
            other.status = DayStatus::Ended;
            other.ended_at = Some(now);
            other.total_time_spent += duration;
            other.workout_summary = Some(WorkoutSummary {
                user_notes: String::new(),
                completed_at: None,
                ended_at: Some(now),
                duration,
                was_completed: false,
            });

            tracing::info!("Ended day {} because day {} was started", index, day);
        }

        let day_progress = self.day_mut(day)?;
        day_progress.started_at = Some(now);
        day_progress.attempts += 1;
        day_progress.status = DayStatus::InProgress;
        Ok(())
    }

    fn finish_day(
        &mut self,
        day: usize,
        outcome: DayOutcome,
        notes: &str,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        let day_progress = self.day_mut(day)?;
        match day_progress.status {
            DayStatus::Locked => return Err(TrackerError::DayLocked { day }),
            DayStatus::Completed => return Err(TrackerError::DayCompleted { day }),
            _ => {}
        }

        day_progress.total_time_spent += duration_secs;
        let user_notes = notes.trim().to_string();

        match outcome {
            DayOutcome::Completed => {
                day_progress.status = DayStatus::Completed;
                day_progress.completed_at = Some(now);
                day_progress.workout_summary = Some(WorkoutSummary {
                    user_notes,
                    completed_at: Some(now),
                    ended_at: None,
                    duration: duration_secs,
                    was_completed: true,
                });

                if let Some(next_day) = self.days.get_mut(&(day + 1)) {
                    if next_day.status == DayStatus::Locked {
                        next_day.status = DayStatus::Unlocked;
                    }
                }
            }
            DayOutcome::Ended => {
                day_progress.status = DayStatus::Ended;
                day_progress.ended_at = Some(now);
                day_progress.workout_summary = Some(WorkoutSummary {
                    user_notes,
                    completed_at: None,
                    ended_at: Some(now),
                    duration: duration_secs,
                    was_completed: false,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlanDay, PlanExercise};
    use chrono::Duration;

    fn two_day_plan() -> Plan {
        Plan::new(vec![
            PlanDay::new(vec![PlanExercise::new("Squat", 3, 10, Some(60))]),
            PlanDay::new(vec![
                PlanExercise::new("Bench", 2, 8, Some(90)),
                PlanExercise::new("Row", 2, 12, None),
            ]),
        ])
    }

    fn initial() -> WorkoutState {
        WorkoutState::from_plan(&two_day_plan(), &SetDefaults::default())
    }

    fn complete(state: &WorkoutState, day: usize, exercise: usize, set: usize) -> WorkoutState {
        state
            .apply(
                WorkoutAction::UpdateSet {
                    day,
                    exercise,
                    set,
                    field: SetField::Completed(true),
                },
                Utc::now(),
            )
            .unwrap()
    }

    fn start(state: &WorkoutState, day: usize) -> WorkoutState {
        state
            .apply(WorkoutAction::StartDay { day }, Utc::now())
            .unwrap()
    }

    #[test]
    fn test_initialization_matches_plan() {
        let state = initial();

        assert_eq!(state.len(), 2);
        assert_eq!(state.day(0).unwrap().status, DayStatus::Unlocked);
        assert_eq!(state.day(1).unwrap().status, DayStatus::Locked);

        let sets = &state.exercise(0, 0).unwrap().sets;
        assert_eq!(sets.len(), 3);
        for set in sets {
            assert_eq!(set.reps, "10");
            assert_eq!(set.rest_time, Some(60));
            assert!(!set.completed);
        }

        // Missing rest falls back to the default
        assert_eq!(state.exercise(1, 1).unwrap().sets[0].rest_time, Some(60));
    }

    #[test]
    fn test_completing_sets_derives_exercise_completion() {
        let mut state = initial();
        for set in 0..3 {
            assert!(!state.exercise(0, 0).unwrap().completed);
            state = complete(&state, 0, 0, set);
        }

        let exercise = state.exercise(0, 0).unwrap();
        assert!(exercise.completed);
        assert!(exercise.sets.iter().all(|s| s.completed_at.is_some()));
    }

    #[test]
    fn test_non_completion_fields_leave_timestamp_alone() {
        let state = initial()
            .apply(
                WorkoutAction::UpdateSet {
                    day: 0,
                    exercise: 0,
                    set: 1,
                    field: SetField::Weight("80".to_string()),
                },
                Utc::now(),
            )
            .unwrap();

        let set = &state.exercise(0, 0).unwrap().sets[1];
        assert_eq!(set.weight, "80");
        assert!(set.completed_at.is_none());
        assert!(!set.completed);
    }

    #[test]
    fn test_out_of_bounds_set_is_rejected() {
        let state = initial();

        let err = state
            .apply(
                WorkoutAction::UpdateSet {
                    day: 0,
                    exercise: 0,
                    set: 3,
                    field: SetField::Completed(true),
                },
                Utc::now(),
            )
            .unwrap_err();

        assert!(err.is_bounds_error());
        assert_eq!(state, initial());
    }

    #[test]
    fn test_locked_day_rejects_set_logging() {
        let err = initial()
            .apply(
                WorkoutAction::UpdateSet {
                    day: 1,
                    exercise: 0,
                    set: 0,
                    field: SetField::Completed(true),
                },
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(err, TrackerError::DayLocked { day: 1 });
    }

    #[test]
    fn test_actual_rest_time_measured_from_previous_set() {
        let t0 = Utc::now();
        let state = initial()
            .apply(
                WorkoutAction::UpdateSet {
                    day: 0,
                    exercise: 0,
                    set: 0,
                    field: SetField::Completed(true),
                },
                t0,
            )
            .unwrap()
            .apply(
                WorkoutAction::UpdateSet {
                    day: 0,
                    exercise: 0,
                    set: 1,
                    field: SetField::Completed(true),
                },
                t0 + Duration::seconds(75),
            )
            .unwrap();

        let sets = &state.exercise(0, 0).unwrap().sets;
        assert_eq!(sets[0].actual_rest_time, None);
        assert_eq!(sets[1].actual_rest_time, Some(75));
    }

    #[test]
    fn test_start_day_tracks_attempts() {
        let state = start(&initial(), 0);
        let day = state.day(0).unwrap();

        assert_eq!(day.status, DayStatus::InProgress);
        assert_eq!(day.attempts, 1);
        assert!(day.started_at.is_some());
        assert_eq!(state.active_day(), Some(0));
    }

    #[test]
    fn test_cannot_start_locked_day() {
        let err = initial()
            .apply(WorkoutAction::StartDay { day: 1 }, Utc::now())
            .unwrap_err();
        assert_eq!(err, TrackerError::DayLocked { day: 1 });
    }

    #[test]
    fn test_complete_day_unlocks_next() {
        let now = Utc::now();
        let state = start(&initial(), 0)
            .apply(
                WorkoutAction::FinishDay {
                    day: 0,
                    outcome: DayOutcome::Completed,
                    notes: "  felt strong \n".to_string(),
                    duration_secs: 1800,
                },
                now,
            )
            .unwrap();

        let day = state.day(0).unwrap();
        assert_eq!(day.status, DayStatus::Completed);
        assert_eq!(day.completed_at, Some(now));
        assert_eq!(day.total_time_spent, 1800);

        let summary = day.workout_summary.as_ref().unwrap();
        assert_eq!(summary.user_notes, "felt strong");
        assert!(summary.was_completed);
        assert_eq!(summary.duration, 1800);

        assert_eq!(state.day(1).unwrap().status, DayStatus::Unlocked);
    }

    #[test]
    fn test_end_day_keeps_next_locked() {
        let now = Utc::now();
        let state = start(&initial(), 0)
            .apply(
                WorkoutAction::FinishDay {
                    day: 0,
                    outcome: DayOutcome::Ended,
                    notes: String::new(),
                    duration_secs: 300,
                },
                now,
            )
            .unwrap();

        let day = state.day(0).unwrap();
        assert_eq!(day.status, DayStatus::Ended);
        assert_eq!(day.ended_at, Some(now));
        assert!(day.completed_at.is_none());
        assert!(!day.workout_summary.as_ref().unwrap().was_completed);
        assert_eq!(state.day(1).unwrap().status, DayStatus::Locked);

        // An ended day can be resumed
        let resumed = start(&state, 0);
        assert_eq!(resumed.day(0).unwrap().attempts, 2);
        assert_eq!(resumed.day(0).unwrap().total_time_spent, 300);
    }

    #[test]
    fn test_starting_second_day_ends_the_first() {
        let t0 = Utc::now();
        let unlocked = WorkoutState::from_days([
            (0, DayProgress::new(DayStatus::Unlocked, Vec::new())),
            (1, DayProgress::new(DayStatus::Unlocked, Vec::new())),
        ]);

        let state = unlocked
            .apply(WorkoutAction::StartDay { day: 0 }, t0)
            .unwrap()
            .apply(WorkoutAction::StartDay { day: 1 }, t0 + Duration::seconds(120))
            .unwrap();

        let first = state.day(0).unwrap();
        assert_eq!(first.status, DayStatus::Ended);
        assert_eq!(first.total_time_spent, 120);
        assert_eq!(state.day(1).unwrap().status, DayStatus::InProgress);
        assert_eq!(state.active_day(), Some(1));
    }

    #[test]
    fn test_undo_rejected_on_completed_day() {
        let state = complete(&start(&initial(), 0), 0, 0, 0)
            .apply(
                WorkoutAction::FinishDay {
                    day: 0,
                    outcome: DayOutcome::Completed,
                    notes: String::new(),
                    duration_secs: 0,
                },
                Utc::now(),
            )
            .unwrap();

        let err = state
            .apply(
                WorkoutAction::UndoSet {
                    day: 0,
                    exercise: 0,
                    set: 0,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, TrackerError::DayCompleted { day: 0 });
        assert!(state.exercise(0, 0).unwrap().sets[0].completed);
    }

    #[test]
    fn test_undo_clears_completion() {
        let state = complete(&start(&initial(), 0), 0, 0, 0)
            .apply(
                WorkoutAction::UndoSet {
                    day: 0,
                    exercise: 0,
                    set: 0,
                },
                Utc::now(),
            )
            .unwrap();

        let set = &state.exercise(0, 0).unwrap().sets[0];
        assert!(!set.completed);
        assert!(set.completed_at.is_none());
    }

    #[test]
    fn test_add_set_uses_template() {
        let state = initial()
            .apply(
                WorkoutAction::AddSet {
                    day: 0,
                    exercise: 0,
                    template: ExerciseTemplate {
                        sets: 3,
                        reps: "12".to_string(),
                        rest_seconds: 90,
                    },
                },
                Utc::now(),
            )
            .unwrap();

        let sets = &state.exercise(0, 0).unwrap().sets;
        assert_eq!(sets.len(), 4);
        let added = &sets[3];
        assert_eq!(added.set_number, 4);
        assert_eq!(added.weight, "");
        assert_eq!(added.reps, "12");
        assert_eq!(added.rest_time, Some(90));
        assert!(!added.completed);
    }

    #[test]
    fn test_remove_set_keeps_numbering_contiguous() {
        let mut state = initial();
        for expected in [2, 1] {
            state = state
                .apply(WorkoutAction::RemoveSet { day: 0, exercise: 0 }, Utc::now())
                .unwrap();
            let sets = &state.exercise(0, 0).unwrap().sets;
            assert_eq!(sets.len(), expected);
            let numbers: Vec<u32> = sets.iter().map(|s| s.set_number).collect();
            assert_eq!(numbers, (1..=expected as u32).collect::<Vec<_>>());
        }

        let err = state
            .apply(WorkoutAction::RemoveSet { day: 0, exercise: 0 }, Utc::now())
            .unwrap_err();
        assert_eq!(err, TrackerError::LastSet { day: 0, exercise: 0 });
    }

    #[test]
    fn test_remove_set_on_missing_exercise() {
        let err = initial()
            .apply(WorkoutAction::RemoveSet { day: 0, exercise: 4 }, Utc::now())
            .unwrap_err();
        assert!(err.is_bounds_error());
    }

    #[test]
    fn test_remove_exercise_reindexes() {
        let state = initial()
            .apply(WorkoutAction::RemoveExercise { day: 1, exercise: 0 }, Utc::now())
            .unwrap();

        let day = state.day(1).unwrap();
        assert_eq!(day.exercises.len(), 1);
        assert_eq!(day.exercises[0].sets[0].reps, "12");
    }

    #[test]
    fn test_add_day_is_locked() {
        let state = initial()
            .apply(
                WorkoutAction::AddDay {
                    day: 2,
                    exercises: vec![ExerciseTemplate {
                        sets: 2,
                        reps: "5".to_string(),
                        rest_seconds: 180,
                    }],
                },
                Utc::now(),
            )
            .unwrap();

        let day = state.day(2).unwrap();
        assert_eq!(day.status, DayStatus::Locked);
        assert_eq!(day.exercises[0].sets.len(), 2);

        let err = state
            .apply(
                WorkoutAction::AddDay {
                    day: 2,
                    exercises: Vec::new(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, TrackerError::DayExists { day: 2 });
    }

    #[test]
    fn test_merge_overlays_known_days() {
        let base = initial();
        let persisted = WorkoutState::from_days([
            (0, DayProgress::new(DayStatus::Completed, Vec::new())),
            (7, DayProgress::new(DayStatus::Unlocked, Vec::new())),
        ]);

        let merged = base.merge(persisted);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.day(0).unwrap().status, DayStatus::Completed);
        assert_eq!(merged.day(1), base.day(1));
    }
}
