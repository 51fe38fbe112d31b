use anyhow::{Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

use workout_tracker::models::{DayStatus, SetRecord};

use super::session::WorkoutSession;
use super::to_index;

#[derive(Args)]
pub struct StatusCommand {
    /// Day to show in detail (defaults to the active or next day)
    #[arg(short, long)]
    day: Option<usize>,
}

impl StatusCommand {
    pub fn execute(self, session: &WorkoutSession) -> Result<()> {
        let tracker = &session.tracker;
        let stats = tracker.get_total_session_stats();
        let workout = tracker.workout_data();

        println!("Plan {} progress", session.plan_id);
        println!("────────────────────────────────");
        println!(
            "Days {}/{}  Exercises {}/{}  Sets {}/{} ({}%)",
            stats.completed_days,
            stats.total_days,
            stats.completed_exercises,
            stats.total_exercises,
            stats.completed_sets,
            stats.total_sets,
            stats.progress_percent
        );
        println!();

        for (index, day) in workout.days() {
            let marker = if tracker.is_workout_started() && tracker.current_day() == index {
                "  ← active"
            } else {
                ""
            };
            println!(
                "  Day {:<3} {:<12} {:>3}%{}",
                index + 1,
                status_label(day.status),
                tracker.get_day_progress(index),
                marker
            );
        }

        let detail = match self.day {
            Some(number) => Some(to_index(number, "Day")?),
            None => session.next_day(),
        };
        let Some(day) = detail else {
            return Ok(());
        };

        let progress = workout
            .day(day)
            .with_context(|| format!("Day {} is not part of this plan", day + 1))?;
        let plan = tracker.plan();

        println!();
        println!("Day {} ({})", day + 1, progress.status);
        for (index, exercise) in progress.exercises.iter().enumerate() {
            let name = plan
                .as_ref()
                .and_then(|plan| plan.exercise(day, index))
                .map(|e| e.name.clone())
                .unwrap_or_default();
            println!(
                "  {}. {} {}/{}",
                index + 1,
                name,
                exercise.completed_sets(),
                exercise.sets.len()
            );
            for set in &exercise.sets {
                println!("     {}", format_set(set));
            }
        }

        Ok(())
    }
}

fn status_label(status: DayStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        DayStatus::Locked => label.dimmed(),
        DayStatus::Unlocked => label.normal(),
        DayStatus::InProgress => label.cyan().bold(),
        DayStatus::Completed => label.green(),
        DayStatus::Ended => label.yellow(),
    }
}

fn format_set(set: &SetRecord) -> String {
    let check = if set.completed { "✓" } else { "·" };
    let weight = if set.weight.is_empty() {
        "-".to_string()
    } else {
        set.weight.clone()
    };

    let mut line = format!("{} Set {}  {} x {}", check, set.set_number, weight, set.reps);
    if let Some(rest) = set.actual_rest_time {
        line.push_str(&format!("  rested {}s", rest));
    }
    if !set.notes.is_empty() {
        line.push_str(&format!("  ({})", set.notes));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pending_set() {
        let set = SetRecord::new(2, "10", 60);
        assert_eq!(format_set(&set), "· Set 2  - x 10");
    }

    #[test]
    fn test_format_completed_set() {
        let mut set = SetRecord::new(1, "8", 90);
        set.completed = true;
        set.weight = "100".to_string();
        set.actual_rest_time = Some(95);
        set.notes = "paused reps".to_string();

        assert_eq!(
            format_set(&set),
            "✓ Set 1  100 x 8  rested 95s  (paused reps)"
        );
    }
}
