use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use workout_tracker::models::DayProgress;
use workout_tracker::services::extract_progress;
use workout_tracker::{ProgressClient, ProgressStore, SaveOutcome, WorkoutSessionTracker};

use super::to_index;
use crate::config::Config;

/// A tracker opened on one plan from the progress endpoint
pub struct WorkoutSession {
    pub tracker: WorkoutSessionTracker,
    pub plan_id: String,
    pub client_id: String,
}

impl WorkoutSession {
    pub async fn open(config: &Config, plan_id: String, client_id: String) -> Result<Self> {
        let mut client = ProgressClient::new(config.api.clone())?;
        if config.is_authenticated() {
            client = client.with_token(config.auth.token.clone());
        }
        let store: Arc<dyn ProgressStore> = Arc::new(client);

        let plan = store
            .fetch_plan(&plan_id, &client_id)
            .await
            .context("Failed to load plan")?
            .with_context(|| format!("Plan {} not found for client {}", plan_id, client_id))?;

        // The fetched plan already carries saved progress
        let persisted = extract_progress(&plan, &config.session.set_defaults());
        let tracker = WorkoutSessionTracker::new(store, config.session.clone());
        tracker.set_plan(plan);
        tracker.merge_persisted(persisted);

        Ok(Self {
            tracker,
            plan_id,
            client_id,
        })
    }

    pub async fn save(&self) -> Result<()> {
        match self
            .tracker
            .save_workout_progress(&self.plan_id, &self.client_id)
            .await
        {
            SaveOutcome::Saved | SaveOutcome::Superseded => Ok(()),
            SaveOutcome::Failed { message } => bail!("Failed to save workout progress: {}", message),
        }
    }

    /// Day of the workout in progress
    pub fn active_day(&self) -> Result<usize> {
        if !self.tracker.is_workout_started() {
            bail!("No workout in progress. Start one with 'workout-tracker start'");
        }
        Ok(self.tracker.current_day())
    }

    /// First day that can be started, preferring one already in progress
    pub fn next_day(&self) -> Option<usize> {
        let workout = self.tracker.workout_data();
        workout
            .active_day()
            .or_else(|| {
                workout
                    .days()
                    .find(|(_, day)| day.status.can_start())
                    .map(|(index, _)| index)
            })
    }
}

#[derive(Args)]
pub struct StartCommand {
    /// Day number to start (defaults to the next available day)
    day: Option<usize>,
}

impl StartCommand {
    pub async fn execute(self, session: &WorkoutSession) -> Result<()> {
        let day = match self.day {
            Some(number) => to_index(number, "Day")?,
            None => session
                .next_day()
                .context("Every day of the plan is either locked or completed")?,
        };

        session.tracker.start_workout(Some(day))?;
        session.save().await?;

        let exercises = session
            .tracker
            .day(day)
            .map(|progress| progress.exercises.len())
            .unwrap_or(0);
        println!("{} Started day {} ({} exercises)", "✓".green(), day + 1, exercises);

        Ok(())
    }
}

#[derive(Args)]
pub struct FinishCommand {
    /// Notes about the session
    #[arg(short, long, default_value = "")]
    notes: String,

    /// Day number (defaults to the active day)
    #[arg(long)]
    day: Option<usize>,
}

impl FinishCommand {
    pub async fn complete(self, session: &WorkoutSession) -> Result<()> {
        let day = self.resolve_day(session)?;
        let progress = session
            .tracker
            .complete_day_workout(&self.notes, Some(day))
            .await
            .with_context(|| format!("Day {} cannot be completed", day + 1))?;
        session.save().await?;

        println!("{} Day {} completed", "✓".green(), day + 1);
        print_summary(&progress);
        if let Some(next) = session.tracker.day(day + 1) {
            println!("  Day {} is now {}", day + 2, next.status);
        }

        Ok(())
    }

    pub async fn end(self, session: &WorkoutSession) -> Result<()> {
        let day = self.resolve_day(session)?;
        let progress = session
            .tracker
            .end_workout(&self.notes, Some(day))
            .await
            .with_context(|| format!("Day {} cannot be ended", day + 1))?;
        session.save().await?;

        println!("{} Day {} ended, resume it any time", "■".yellow(), day + 1);
        print_summary(&progress);

        Ok(())
    }

    fn resolve_day(&self, session: &WorkoutSession) -> Result<usize> {
        match self.day {
            Some(number) => to_index(number, "Day"),
            None => session.active_day(),
        }
    }
}

fn print_summary(progress: &DayProgress) {
    let minutes = progress.total_time_spent / 60;
    println!(
        "  {}/{} sets, {} min total, attempt {}",
        progress.completed_sets(),
        progress.total_sets(),
        minutes,
        progress.attempts
    );
    if let Some(summary) = &progress.workout_summary {
        if !summary.user_notes.is_empty() {
            println!("  Notes: {}", summary.user_notes);
        }
    }
}
