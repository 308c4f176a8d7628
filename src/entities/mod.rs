pub mod active_workout;
pub mod exercise;
pub mod template;
pub mod template_exercise;
pub mod workout;
pub mod workout_set;
