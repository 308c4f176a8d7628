use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct SetEntry {
    pub reps: i32,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TemplateEntryInput {
    pub name: String,
    pub category: Option<String>,
    pub order: Option<i32>,
    pub target_sets: Option<i32>,
    pub target_reps_min: Option<i32>,
    pub target_reps_max: Option<i32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegisterStatus {
    Created,
    AlreadyExists,
}

impl RegisterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferReason {
    SingleMatch,
    BestOverlap,
}

#[derive(Clone, Debug, Serialize)]
pub struct SetLine {
    pub set: i32,
    pub reps: i32,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExerciseSets {
    pub exercise_id: i64,
    pub name: String,
    pub sets: Vec<SetLine>,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkoutSummary {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseSets>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TemplateRef {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TemplateEntry {
    pub exercise_id: i64,
    pub name: String,
    pub order: i32,
    pub target_sets: i32,
    pub target_reps_min: Option<i32>,
    pub target_reps_max: Option<i32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TemplateInfo {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercises: Option<Vec<TemplateEntry>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProgressEntry {
    pub exercise_id: i64,
    pub name: String,
    pub order: i32,
    pub target_sets: i32,
    pub target_reps_min: Option<i32>,
    pub target_reps_max: Option<i32>,
    pub sets_done: i64,
    pub sets_remaining: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TemplateProgress {
    pub completed: Vec<ProgressEntry>,
    pub remaining: Vec<ProgressEntry>,
    pub next: Option<ProgressEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PerformedWorkout {
    pub workout_id: i64,
    pub date: DateTime<Utc>,
    pub sets: Vec<SetLine>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LastPerformance {
    pub workout_id: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    pub sets: Vec<SetLine>,
}

impl LastPerformance {
    pub fn none() -> Self {
        Self {
            workout_id: None,
            date: None,
            sets: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Inference {
    Success {
        template: TemplateRef,
        reason: InferReason,
        progress: Option<TemplateProgress>,
        last_performance: LastPerformance,
    },
    NotFound {
        message: String,
        last_performance: LastPerformance,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Guidance {
    pub template_inference: Option<Inference>,
    pub template_id: Option<i64>,
    pub progress: Option<TemplateProgress>,
    pub last_performance: LastPerformance,
}
