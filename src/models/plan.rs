use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::lenient;
use super::progress::{DayStatus, SetRecord};

/// Training plan as stored by the plan service.
///
/// Only the schedule is interpreted; every other field is carried through
/// untouched so that saving progress never drops plan data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub schedule: Vec<PlanDay>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One scheduled workout day, with the progress fields the tracker embeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDay {
    #[serde(default)]
    pub exercises: Vec<PlanExercise>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_status: Option<DayStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_ended_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_was_completed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_attempts: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Exercise template inside a plan day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExercise {
    #[serde(default)]
    pub name: String,

    /// Target set count, or the recorded sets once progress has been saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<ExerciseSets>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<RepsTarget>,

    #[serde(
        default,
        deserialize_with = "lenient::optional_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub rest: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_completed: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExerciseSets {
    Count(u32),
    Records(Vec<SetRecord>),
}

impl<'de> Deserialize<'de> for ExerciseSets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Some(count) = lenient::whole_count(&value) {
            return Ok(ExerciseSets::Count(count));
        }

        match value {
            Value::Array(_) => serde_json::from_value(value)
                .map(ExerciseSets::Records)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a set count or recorded sets, got {}",
                other
            ))),
        }
    }
}

/// Target reps, either a plain count or free text such as "8-12" or "AMRAP".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RepsTarget {
    Count(u32),
    Text(String),
}

impl<'de> Deserialize<'de> for RepsTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(RepsTarget::Text(text)),
            Value::Number(n) => Ok(lenient::whole_count(&Value::Number(n.clone()))
                .map(RepsTarget::Count)
                .unwrap_or_else(|| RepsTarget::Text(n.to_string()))),
            other => Err(D::Error::custom(format!(
                "expected reps as a number or text, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RepsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepsTarget::Count(n) => write!(f, "{}", n),
            RepsTarget::Text(text) => f.write_str(text),
        }
    }
}

/// Fallback values for sets whose template does not say otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDefaults {
    pub reps: u32,
    pub rest_seconds: u32,
}

impl Default for SetDefaults {
    fn default() -> Self {
        Self {
            reps: 10,
            rest_seconds: 60,
        }
    }
}

/// Exercise template with every default resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseTemplate {
    pub sets: usize,
    pub reps: String,
    pub rest_seconds: u32,
}

impl ExerciseTemplate {
    pub fn resolve(exercise: &PlanExercise, defaults: &SetDefaults) -> Self {
        let reps = exercise
            .reps
            .as_ref()
            .map(ToString::to_string)
            .filter(|reps| !reps.is_empty())
            .unwrap_or_else(|| defaults.reps.to_string());

        Self {
            sets: exercise.target_sets(),
            reps,
            rest_seconds: exercise.rest.unwrap_or(defaults.rest_seconds),
        }
    }

    /// Template used when the plan has no exercise at the requested position.
    pub fn fallback(defaults: &SetDefaults) -> Self {
        Self {
            sets: 1,
            reps: defaults.reps.to_string(),
            rest_seconds: defaults.rest_seconds,
        }
    }
}

impl Plan {
    pub fn new(schedule: Vec<PlanDay>) -> Self {
        Self {
            schedule,
            extra: Map::new(),
        }
    }

    pub fn day(&self, day: usize) -> Option<&PlanDay> {
        self.schedule.get(day)
    }

    pub fn exercise(&self, day: usize, exercise: usize) -> Option<&PlanExercise> {
        self.day(day).and_then(|d| d.exercises.get(exercise))
    }

    pub fn exercise_mut(&mut self, day: usize, exercise: usize) -> Option<&mut PlanExercise> {
        self.schedule
            .get_mut(day)
            .and_then(|d| d.exercises.get_mut(exercise))
    }
}

impl PlanDay {
    pub fn new(exercises: Vec<PlanExercise>) -> Self {
        Self {
            exercises,
            ..Default::default()
        }
    }
}

impl PlanExercise {
    /// Build a template exercise with a numeric rep target
    pub fn new(name: &str, sets: u32, reps: u32, rest: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            sets: Some(ExerciseSets::Count(sets)),
            reps: Some(RepsTarget::Count(reps)),
            rest,
            ..Default::default()
        }
    }

    pub fn target_sets(&self) -> usize {
        match &self.sets {
            Some(ExerciseSets::Count(n)) => *n as usize,
            Some(ExerciseSets::Records(records)) => records.len(),
            None => 0,
        }
    }

    /// Recorded sets, present once the plan has been through a save.
    pub fn embedded_sets(&self) -> Option<&[SetRecord]> {
        match &self.sets {
            Some(ExerciseSets::Records(records)) => Some(records),
            _ => None,
        }
    }

    /// Configured rest between sets, if any.
    pub fn rest_seconds(&self) -> Option<u32> {
        self.rest.filter(|rest| *rest > 0)
    }
}
