use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::lenient;
use super::plan::ExerciseTemplate;

/// Lifecycle of a single plan day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    #[default]
    Locked,
    Unlocked,
    InProgress,
    Completed,
    Ended,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Locked => "locked",
            DayStatus::Unlocked => "unlocked",
            DayStatus::InProgress => "in_progress",
            DayStatus::Completed => "completed",
            DayStatus::Ended => "ended",
        }
    }

    /// Whether the day may be started (or resumed)
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            DayStatus::Unlocked | DayStatus::InProgress | DayStatus::Ended
        )
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked set of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRecord {
    #[serde(default)]
    pub set_number: u32,

    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub weight: String,

    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub reps: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub notes: String,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient::optional_seconds")]
    pub rest_time: Option<u32>,

    #[serde(default, deserialize_with = "lenient::optional_seconds")]
    pub actual_rest_time: Option<u32>,
}

impl SetRecord {
    /// Fresh, not yet performed set
    pub fn new(set_number: u32, reps: &str, rest_time: u32) -> Self {
        Self {
            set_number,
            weight: String::new(),
            reps: reps.to_string(),
            completed: false,
            notes: String::new(),
            completed_at: None,
            rest_time: Some(rest_time),
            actual_rest_time: None,
        }
    }

    pub fn from_template(set_number: u32, template: &ExerciseTemplate) -> Self {
        Self::new(set_number, &template.reps, template.rest_seconds)
    }
}

/// Progress of one exercise within a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    pub sets: Vec<SetRecord>,
    pub exercise_notes: String,
    pub completed: bool,
}

impl ExerciseProgress {
    pub fn from_template(template: &ExerciseTemplate) -> Self {
        let sets = (1..=template.sets)
            .map(|n| SetRecord::from_template(n as u32, template))
            .collect();

        let mut progress = Self {
            sets,
            exercise_notes: String::new(),
            completed: false,
        };
        progress.refresh_completed();
        progress
    }

    pub fn from_sets(sets: Vec<SetRecord>, exercise_notes: String) -> Self {
        let mut progress = Self {
            sets,
            exercise_notes,
            completed: false,
        };
        progress.refresh_completed();
        progress
    }

    /// Re-derive `completed` from the sets. Must follow every set mutation.
    pub fn refresh_completed(&mut self) {
        self.completed = self.sets.iter().all(|set| set.completed);
    }

    /// Rewrite set numbers as 1..=len
    pub fn renumber(&mut self) {
        for (i, set) in self.sets.iter_mut().enumerate() {
            set.set_number = i as u32 + 1;
        }
    }

    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|set| set.completed).count()
    }
}

/// Written once when a day is completed or ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub user_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub duration: u64,
    pub was_completed: bool,
}

/// Progress of one plan day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayProgress {
    pub status: DayStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_time_spent: u64,
    pub attempts: u32,
    pub workout_summary: Option<WorkoutSummary>,
    pub exercises: Vec<ExerciseProgress>,
}

impl DayProgress {
    pub fn new(status: DayStatus, exercises: Vec<ExerciseProgress>) -> Self {
        Self {
            status,
            exercises,
            ..Default::default()
        }
    }

    pub fn from_templates(status: DayStatus, templates: &[ExerciseTemplate]) -> Self {
        Self::new(
            status,
            templates.iter().map(ExerciseProgress::from_template).collect(),
        )
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn completed_sets(&self) -> usize {
        self.exercises.iter().map(ExerciseProgress::completed_sets).sum()
    }
}
