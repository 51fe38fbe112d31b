use anyhow::Result;
use clap::Args;
use colored::Colorize;

use workout_tracker::services::SetField;

use super::session::WorkoutSession;
use super::to_index;

#[derive(Args)]
pub struct LogSetCommand {
    /// Set number within the exercise
    set: usize,

    /// Exercise number within the active day
    #[arg(short, long, default_value = "1")]
    exercise: usize,

    /// Weight used, e.g. "80" or "80kg"
    #[arg(short, long)]
    weight: Option<String>,

    /// Reps performed
    #[arg(short, long)]
    reps: Option<String>,

    /// Notes for this set
    #[arg(long)]
    notes: Option<String>,

    /// Undo the set instead of completing it
    #[arg(long)]
    undo: bool,
}

impl LogSetCommand {
    pub async fn execute(self, session: &WorkoutSession) -> Result<()> {
        let tracker = &session.tracker;
        let day = session.active_day()?;
        let exercise = to_index(self.exercise, "Exercise")?;
        let set = to_index(self.set, "Set")?;

        tracker.select_exercise(exercise)?;

        let fields = [
            self.weight.map(SetField::Weight),
            self.reps.map(SetField::Reps),
            self.notes.map(SetField::Notes),
        ];
        for field in fields.into_iter().flatten() {
            tracker.update_workout_data(day, exercise, set, field)?;
        }

        if self.undo {
            tracker.undo_set(set)?;
            println!("{} Set {} undone", "↺".yellow(), set + 1);
        } else {
            tracker.complete_set(set)?;
            println!("{} Set {} logged", "✓".green(), set + 1);
        }

        let rest = tracker.rest_timer();
        session.save().await?;

        println!(
            "  {} {}%",
            exercise_name(session, day, exercise),
            tracker.get_exercise_progress(day, exercise)
        );
        if rest.is_resting {
            println!("  Rest {}s before the next set", rest.remaining);
        }

        Ok(())
    }
}

/// Day and exercise, both numbered from 1
#[derive(Args)]
pub struct ExerciseArgs {
    /// Day number
    day: usize,

    /// Exercise number within the day
    exercise: usize,
}

impl ExerciseArgs {
    fn indices(&self) -> Result<(usize, usize)> {
        Ok((to_index(self.day, "Day")?, to_index(self.exercise, "Exercise")?))
    }
}

pub async fn add_set(session: &WorkoutSession, target: ExerciseArgs) -> Result<()> {
    let (day, exercise) = target.indices()?;

    session.tracker.add_set(day, exercise)?;
    session.save().await?;

    println!(
        "{} {} now has {} sets",
        "✓".green(),
        exercise_name(session, day, exercise),
        set_count(session, day, exercise)
    );
    Ok(())
}

pub async fn remove_set(session: &WorkoutSession, target: ExerciseArgs) -> Result<()> {
    let (day, exercise) = target.indices()?;

    session.tracker.remove_set(day, exercise)?;
    session.save().await?;

    println!(
        "{} {} now has {} sets",
        "✓".green(),
        exercise_name(session, day, exercise),
        set_count(session, day, exercise)
    );
    Ok(())
}

fn exercise_name(session: &WorkoutSession, day: usize, exercise: usize) -> String {
    session
        .tracker
        .plan()
        .and_then(|plan| plan.exercise(day, exercise).map(|e| e.name.clone()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Exercise {}", exercise + 1))
}

fn set_count(session: &WorkoutSession, day: usize, exercise: usize) -> usize {
    session
        .tracker
        .workout_data()
        .exercise(day, exercise)
        .map(|progress| progress.sets.len())
        .unwrap_or(0)
}
