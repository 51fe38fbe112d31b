use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::debounce::Debouncer;
use super::progress_view::{ProgressView, SessionStats};
use super::rest_timer::RestTimer;
use super::snapshot::{embed_progress, extract_progress, sync_embedded_progress};
use super::workout_state::{elapsed_seconds, DayOutcome, SetField, WorkoutAction, WorkoutState};
use crate::api::ProgressStore;
use crate::config::SessionConfig;
use crate::errors::TrackerError;
use crate::models::{
    DayProgress, DayStatus, ExerciseTemplate, Plan, PlanDay, PlanExercise, RepsTarget,
};

/// Result of a save request. Saving never fails across this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// A newer save was requested before this one got its turn
    Superseded,
    Failed { message: String },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SaveOutcome::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Progress read from the store, with the local state it was requested against
struct LoadedProgress {
    workout: WorkoutState,
    generation: u64,
    baseline: WorkoutState,
}

#[derive(Debug, Clone)]
struct ProgressTarget {
    plan_id: String,
    client_id: String,
}

#[derive(Debug, Default)]
struct TrackerState {
    plan: Option<Plan>,
    plan_generation: u64,
    workout: WorkoutState,
    current_day: usize,
    current_exercise: usize,
    is_workout_started: bool,
    session_start_time: Option<DateTime<Utc>>,
    rest: RestTimer,
    last_saved_at: Option<DateTime<Utc>>,
}

impl TrackerState {
    /// Keep sets embedded in the plan copy in step with local progress
    fn sync_plan(&mut self) {
        if let Some(plan) = self.plan.as_mut() {
            sync_embedded_progress(plan, &self.workout);
        }
    }
}

struct Inner {
    state: Mutex<TrackerState>,
    store: Arc<dyn ProgressStore>,
    settings: SessionConfig,
    target: Mutex<Option<ProgressTarget>>,
    save_token: AtomicU64,
    load_token: AtomicU64,
    save_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn target(&self) -> Option<ProgressTarget> {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn save(&self, plan_id: &str, client_id: &str) -> SaveOutcome {
        let token = self.save_token.fetch_add(1, Ordering::SeqCst) + 1;
        let _turn = self.save_lock.lock().await;

        if self.save_token.load(Ordering::SeqCst) != token {
            tracing::debug!("Skipping save {}, a newer save is queued", token);
            return SaveOutcome::Superseded;
        }

        let (snapshot, generation) = {
            let state = self.lock();
            let Some(plan) = state.plan.as_ref() else {
                tracing::warn!("No plan available to save");
                return SaveOutcome::Failed {
                    message: "No plan data available".to_string(),
                };
            };
            (embed_progress(plan, &state.workout), state.plan_generation)
        };

        match self.store.store_plan(plan_id, client_id, &snapshot).await {
            Ok(()) => {
                let mut state = self.lock();
                state.last_saved_at = Some(Utc::now());
                if state.plan_generation == generation
                    && self.save_token.load(Ordering::SeqCst) == token
                {
                    // Edits made while the request was in flight stay visible
                    let adopted = embed_progress(&snapshot, &state.workout);
                    state.plan = Some(adopted);
                }
                SaveOutcome::Saved
            }
            Err(e) => {
                tracing::warn!("Failed to save workout progress: {}", e);
                SaveOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

fn log_rejection(error: &TrackerError) {
    if error.is_bounds_error() {
        tracing::error!("{}", error);
    } else {
        tracing::warn!("{}", error);
    }
}

/// Drives a client through a multi-day plan: set logging, the day unlock
/// chain, a rest countdown and debounced persistence.
///
/// All methods take `&self`; the tracker can be shared behind an `Arc`.
/// Timer features need a tokio runtime and are skipped with a warning
/// without one.
pub struct WorkoutSessionTracker {
    inner: Arc<Inner>,
    autosave: Mutex<Debouncer>,
    rest_ticker: Mutex<Option<JoinHandle<()>>>,
}

impl WorkoutSessionTracker {
    pub fn new(store: Arc<dyn ProgressStore>, settings: SessionConfig) -> Self {
        let autosave = Debouncer::new(settings.autosave_delay());

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(TrackerState::default()),
                store,
                settings,
                target: Mutex::new(None),
                save_token: AtomicU64::new(0),
                load_token: AtomicU64::new(0),
                save_lock: tokio::sync::Mutex::new(()),
            }),
            autosave: Mutex::new(autosave),
            rest_ticker: Mutex::new(None),
        }
    }

    /// Replace the plan and rebuild progress from scratch.
    ///
    /// Previous progress is discarded; use [`Self::restore_workout_progress`]
    /// afterwards to bring back what the server has.
    pub fn set_plan(&self, plan: Plan) {
        let workout = WorkoutState::from_plan(&plan, &self.inner.settings.set_defaults());

        {
            let mut state = self.inner.lock();
            state.plan = Some(plan);
            state.plan_generation += 1;
            state.workout = workout;
            state.current_day = 0;
            state.current_exercise = 0;
            state.is_workout_started = false;
            state.session_start_time = None;
        }

        self.cancel_autosave();
        self.stop_rest();
        tracing::debug!("Workout data initialized from plan");
    }

    /// Enable auto-save against the given plan/client pair
    pub fn bind_progress_target(&self, plan_id: impl Into<String>, client_id: impl Into<String>) {
        *self
            .inner
            .target
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(ProgressTarget {
            plan_id: plan_id.into(),
            client_id: client_id.into(),
        });
    }

    // Accessors

    pub fn plan(&self) -> Option<Plan> {
        self.inner.lock().plan.clone()
    }

    pub fn workout_data(&self) -> WorkoutState {
        self.inner.lock().workout.clone()
    }

    pub fn day(&self, day: usize) -> Option<DayProgress> {
        self.inner.lock().workout.day(day).cloned()
    }

    pub fn current_day(&self) -> usize {
        self.inner.lock().current_day
    }

    pub fn current_exercise(&self) -> usize {
        self.inner.lock().current_exercise
    }

    pub fn is_workout_started(&self) -> bool {
        self.inner.lock().is_workout_started
    }

    pub fn session_start_time(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().session_start_time
    }

    pub fn rest_timer(&self) -> RestTimer {
        self.inner.lock().rest
    }

    pub fn is_resting(&self) -> bool {
        self.inner.lock().rest.is_resting
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_saved_at
    }

    pub fn is_autosave_pending(&self) -> bool {
        self.autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_pending()
    }

    // Navigation

    pub fn select_day(&self, day: usize) -> Result<(), TrackerError> {
        let mut state = self.inner.lock();
        let status = match state.workout.day(day) {
            Some(progress) => progress.status,
            None => {
                let error = TrackerError::DayOutOfRange { day };
                log_rejection(&error);
                return Err(error);
            }
        };
        if status == DayStatus::Locked {
            let error = TrackerError::DayLocked { day };
            log_rejection(&error);
            return Err(error);
        }

        if state.current_day != day {
            state.current_day = day;
            state.current_exercise = 0;
        }
        Ok(())
    }

    pub fn select_exercise(&self, exercise: usize) -> Result<(), TrackerError> {
        let mut state = self.inner.lock();
        let day = state.current_day;
        if state.workout.exercise(day, exercise).is_none() {
            let error = TrackerError::ExerciseOutOfRange { day, exercise };
            log_rejection(&error);
            return Err(error);
        }

        state.current_exercise = exercise;
        Ok(())
    }

    // Set mutations

    /// Write one field of one set.
    pub fn update_workout_data(
        &self,
        day: usize,
        exercise: usize,
        set: usize,
        field: SetField,
    ) -> Result<(), TrackerError> {
        self.commit(WorkoutAction::UpdateSet {
            day,
            exercise,
            set,
            field,
        })
    }

    /// Mark a set of the current exercise done and start the rest countdown
    /// unless it was the exercise's last set.
    pub fn complete_set(&self, set: usize) -> Result<(), TrackerError> {
        let (day, exercise) = {
            let state = self.inner.lock();
            (state.current_day, state.current_exercise)
        };

        self.update_workout_data(day, exercise, set, SetField::Completed(true))?;

        let rest = {
            let state = self.inner.lock();
            let total_sets = state
                .workout
                .exercise(day, exercise)
                .map(|progress| progress.sets.len())
                .unwrap_or(0);
            state
                .plan
                .as_ref()
                .and_then(|plan| plan.exercise(day, exercise))
                .and_then(PlanExercise::rest_seconds)
                .filter(|_| set + 1 < total_sets)
        };

        if let Some(seconds) = rest {
            self.start_rest(seconds);
        }
        Ok(())
    }

    pub fn undo_set(&self, set: usize) -> Result<(), TrackerError> {
        let (day, exercise) = {
            let state = self.inner.lock();
            (state.current_day, state.current_exercise)
        };

        self.commit(WorkoutAction::UndoSet { day, exercise, set })
    }

    /// Append a set using the plan's template for the exercise.
    pub fn add_set(&self, day: usize, exercise: usize) -> Result<(), TrackerError> {
        let template = self.template_for(day, exercise);
        self.commit(WorkoutAction::AddSet {
            day,
            exercise,
            template,
        })
    }

    /// Drop the last set. Exercises always keep at least one set.
    pub fn remove_set(&self, day: usize, exercise: usize) -> Result<(), TrackerError> {
        self.commit(WorkoutAction::RemoveSet { day, exercise })
    }

    pub fn update_exercise_notes(
        &self,
        day: usize,
        exercise: usize,
        notes: impl Into<String>,
    ) -> Result<(), TrackerError> {
        self.commit(WorkoutAction::SetExerciseNotes {
            day,
            exercise,
            notes: notes.into(),
        })
    }

    // Day lifecycle

    /// Start a day (the current one by default) and make it the active session.
    pub fn start_workout(&self, day: Option<usize>) -> Result<(), TrackerError> {
        let now = Utc::now();

        {
            let mut state = self.inner.lock();
            let day = day.unwrap_or(state.current_day);

            let next = state
                .workout
                .apply(WorkoutAction::StartDay { day }, now)
                .inspect_err(log_rejection)?;

            state.workout = next;
            state.sync_plan();
            state.is_workout_started = true;
            state.session_start_time = Some(now);
            if state.current_day != day {
                state.current_day = day;
                state.current_exercise = 0;
            }
            tracing::info!("Started workout for day {}", day);
        }

        self.schedule_autosave();
        Ok(())
    }

    /// Finish a day successfully, unlocking the next one.
    pub async fn complete_day_workout(&self, notes: &str, day: Option<usize>) -> Option<DayProgress> {
        self.finish_workout(notes, day, DayOutcome::Completed).await
    }

    /// Stop a day without completing it. The day can be resumed later.
    pub async fn end_workout(&self, notes: &str, day: Option<usize>) -> Option<DayProgress> {
        self.finish_workout(notes, day, DayOutcome::Ended).await
    }

    async fn finish_workout(
        &self,
        notes: &str,
        day: Option<usize>,
        outcome: DayOutcome,
    ) -> Option<DayProgress> {
        let now = Utc::now();

        let finished = {
            let mut state = self.inner.lock();
            let day = day.unwrap_or(state.current_day);
            let duration_secs = state
                .session_start_time
                .map(|started| elapsed_seconds(started, now))
                .unwrap_or(0);

            let action = WorkoutAction::FinishDay {
                day,
                outcome,
                notes: notes.to_string(),
                duration_secs,
            };

            match state.workout.apply(action, now) {
                Ok(next) => {
                    state.workout = next;
                    state.sync_plan();
                    state.is_workout_started = false;
                    state.session_start_time = None;
                    tracing::info!("Finished day {} ({:?}) after {}s", day, outcome, duration_secs);
                    state.workout.day(day).cloned()
                }
                Err(e) => {
                    log_rejection(&e);
                    None
                }
            }
        };

        finished.as_ref()?;

        self.cancel_autosave();
        self.stop_rest();

        if let Some(target) = self.inner.target() {
            let outcome = self.inner.save(&target.plan_id, &target.client_id).await;
            if let Some(message) = outcome.message() {
                tracing::warn!("Progress for finished day not saved: {}", message);
            }
        }

        finished
    }

    // Rest timer

    fn start_rest(&self, seconds: u32) {
        self.inner.lock().rest = RestTimer::start(seconds);

        let mut ticker = self
            .rest_ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = ticker.take() {
            previous.abort();
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("No async runtime available, rest countdown will not tick");
            return;
        };

        let inner = Arc::clone(&self.inner);
        *ticker = Some(handle.spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = interval_at(Instant::now() + period, period);

            loop {
                interval.tick().await;
                let resting = {
                    let mut state = inner.lock();
                    state.rest = state.rest.tick();
                    state.rest.is_resting
                };
                if !resting {
                    tracing::debug!("Rest finished");
                    break;
                }
            }
        }));

        tracing::debug!("Resting for {}s", seconds);
    }

    fn stop_rest(&self) {
        if let Some(ticker) = self
            .rest_ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            ticker.abort();
        }
        self.inner.lock().rest = RestTimer::default();
    }

    /// Cut the current rest short
    pub fn skip_rest(&self) {
        self.stop_rest();
    }

    // Plan edits

    /// Reconcile progress after an exercise definition was swapped.
    /// `exercise` may equal the day's exercise count to append a new one.
    pub fn update_workout_data_after_exercise_change(
        &self,
        day: usize,
        exercise: usize,
        replacement: &PlanExercise,
    ) -> Result<(), TrackerError> {
        let template = ExerciseTemplate::resolve(replacement, &self.inner.settings.set_defaults());
        let replacement = replacement.clone();

        self.commit_edit(
            WorkoutAction::ReplaceExercise {
                day,
                exercise,
                template,
            },
            move |plan| {
                let Some(plan_day) = plan.schedule.get_mut(day) else {
                    return;
                };
                if exercise < plan_day.exercises.len() {
                    plan_day.exercises[exercise] = replacement;
                } else if exercise == plan_day.exercises.len() {
                    plan_day.exercises.push(replacement);
                }
            },
        )
    }

    pub fn update_workout_data_after_remove_exercise(
        &self,
        day: usize,
        exercise: usize,
    ) -> Result<(), TrackerError> {
        self.commit_edit(WorkoutAction::RemoveExercise { day, exercise }, move |plan| {
            if let Some(plan_day) = plan.schedule.get_mut(day) {
                if exercise < plan_day.exercises.len() {
                    plan_day.exercises.remove(exercise);
                }
            }
        })?;

        let mut state = self.inner.lock();
        if state.current_day == day {
            let remaining = state
                .workout
                .day(day)
                .map(|progress| progress.exercises.len())
                .unwrap_or(0);
            if state.current_exercise >= remaining {
                state.current_exercise = remaining.saturating_sub(1);
            }
        }
        Ok(())
    }

    /// Retarget reps on the sets that have not been performed yet.
    pub fn update_workout_data_after_reps_change(
        &self,
        day: usize,
        exercise: usize,
        reps: &str,
    ) -> Result<(), TrackerError> {
        let target = reps
            .parse::<u32>()
            .map(RepsTarget::Count)
            .unwrap_or_else(|_| RepsTarget::Text(reps.to_string()));

        self.commit_edit(
            WorkoutAction::ChangeReps {
                day,
                exercise,
                reps: reps.to_string(),
            },
            move |plan| {
                if let Some(plan_exercise) = plan.exercise_mut(day, exercise) {
                    plan_exercise.reps = Some(target);
                }
            },
        )
    }

    /// Track a day appended to the plan after it was loaded. The day starts locked.
    pub fn add_new_day_workout_data(
        &self,
        day: usize,
        exercises: &[PlanExercise],
    ) -> Result<(), TrackerError> {
        let defaults = self.inner.settings.set_defaults();
        let templates = exercises
            .iter()
            .map(|exercise| ExerciseTemplate::resolve(exercise, &defaults))
            .collect();
        let plan_day = PlanDay::new(exercises.to_vec());

        self.commit_edit(
            WorkoutAction::AddDay {
                day,
                exercises: templates,
            },
            move |plan| {
                if plan.schedule.len() == day {
                    plan.schedule.push(plan_day);
                }
            },
        )
    }

    // Progress queries

    pub fn get_exercise_progress(&self, day: usize, exercise: usize) -> u32 {
        let state = self.inner.lock();
        ProgressView::new(state.plan.as_ref(), &state.workout).exercise_progress(day, exercise)
    }

    pub fn get_day_progress(&self, day: usize) -> u32 {
        let state = self.inner.lock();
        ProgressView::new(state.plan.as_ref(), &state.workout).day_progress(day)
    }

    pub fn get_total_session_stats(&self) -> SessionStats {
        let state = self.inner.lock();
        ProgressView::new(state.plan.as_ref(), &state.workout).total_session_stats()
    }

    // Persistence

    /// Embed progress into the plan and PATCH it to the progress endpoint.
    pub async fn save_workout_progress(&self, plan_id: &str, client_id: &str) -> SaveOutcome {
        self.inner.save(plan_id, client_id).await
    }

    /// Fetch persisted progress. Any failure reads as "nothing saved yet".
    pub async fn load_workout_progress(&self, plan_id: &str, client_id: &str) -> Option<WorkoutState> {
        self.fetch_progress(plan_id, client_id)
            .await
            .map(|loaded| loaded.workout)
    }

    /// Load persisted progress and merge it over the current state.
    /// Days edited locally while the request was in flight keep their local
    /// progress. Returns true when something was merged.
    pub async fn restore_workout_progress(&self, plan_id: &str, client_id: &str) -> bool {
        let Some(loaded) = self.fetch_progress(plan_id, client_id).await else {
            return false;
        };

        let mut state = self.inner.lock();
        if state.plan_generation != loaded.generation {
            tracing::debug!("Plan changed while loading progress, discarding it");
            return false;
        }

        let persisted = WorkoutState::from_days(
            loaded
                .workout
                .days()
                .filter(|(index, _)| {
                    let untouched = state.workout.day(*index) == loaded.baseline.day(*index);
                    if !untouched {
                        tracing::debug!("Day {} changed while loading, keeping local progress", index);
                    }
                    untouched
                })
                .map(|(index, day)| (index, day.clone()))
                .collect::<Vec<_>>(),
        );
        Self::merge_into(&mut state, persisted);
        true
    }

    /// Overlay persisted progress. A merged in-progress day becomes the
    /// active session again.
    pub fn merge_persisted(&self, persisted: WorkoutState) {
        let mut state = self.inner.lock();
        Self::merge_into(&mut state, persisted);
    }

    fn merge_into(state: &mut TrackerState, persisted: WorkoutState) {
        let merged = state.workout.merge(persisted);

        if let Some(day) = merged.active_day() {
            let started_at = merged.day(day).and_then(|progress| progress.started_at);
            if state.current_day != day {
                state.current_day = day;
                state.current_exercise = 0;
            }
            state.is_workout_started = true;
            state.session_start_time = started_at.or_else(|| Some(Utc::now()));
            tracing::info!("Resuming in-progress workout for day {}", day);
        }

        state.workout = merged;
        state.sync_plan();
    }

    async fn fetch_progress(&self, plan_id: &str, client_id: &str) -> Option<LoadedProgress> {
        let token = self.inner.load_token.fetch_add(1, Ordering::SeqCst) + 1;
        let (generation, baseline) = {
            let state = self.inner.lock();
            (state.plan_generation, state.workout.clone())
        };

        let plan = match self.inner.store.fetch_plan(plan_id, client_id).await {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                tracing::debug!("No saved progress for plan {}", plan_id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to load workout progress: {}", e);
                return None;
            }
        };

        if self.inner.load_token.load(Ordering::SeqCst) != token {
            tracing::debug!("Discarding stale progress load {}", token);
            return None;
        }

        let workout = extract_progress(&plan, &self.inner.settings.set_defaults());
        Some(LoadedProgress {
            workout,
            generation,
            baseline,
        })
    }

    // Internals

    fn template_for(&self, day: usize, exercise: usize) -> ExerciseTemplate {
        let defaults = self.inner.settings.set_defaults();
        let state = self.inner.lock();

        state
            .plan
            .as_ref()
            .and_then(|plan| plan.exercise(day, exercise))
            .map(|template| ExerciseTemplate::resolve(template, &defaults))
            .unwrap_or_else(|| ExerciseTemplate::fallback(&defaults))
    }

    fn commit(&self, action: WorkoutAction) -> Result<(), TrackerError> {
        self.commit_edit(action, |_| {})
    }

    /// Apply `action`; on success also run `edit` on the plan copy.
    fn commit_edit<F>(&self, action: WorkoutAction, edit: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut Plan),
    {
        {
            let mut state = self.inner.lock();
            let next = state
                .workout
                .apply(action, Utc::now())
                .inspect_err(log_rejection)?;

            state.workout = next;
            if let Some(plan) = state.plan.as_mut() {
                edit(plan);
            }
            state.sync_plan();
        }

        self.schedule_autosave();
        Ok(())
    }

    fn schedule_autosave(&self) {
        if !self.inner.lock().is_workout_started {
            return;
        }
        let Some(target) = self.inner.target() else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        self.autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .schedule(async move {
                match inner.save(&target.plan_id, &target.client_id).await {
                    SaveOutcome::Saved => tracing::debug!("Auto-saved workout progress"),
                    SaveOutcome::Superseded => {}
                    SaveOutcome::Failed { message } => {
                        tracing::warn!("Auto-save failed: {}", message)
                    }
                }
            });
    }

    fn cancel_autosave(&self) {
        if self
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel()
        {
            tracing::debug!("Cancelled pending auto-save");
        }
    }
}

impl Drop for WorkoutSessionTracker {
    fn drop(&mut self) {
        if let Some(ticker) = self
            .rest_ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            ticker.abort();
        }
        self.autosave
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}
