use sea_orm::entity::prelude::*;

use super::{exercise, workout};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workout_sets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub set_number: i32,
    pub reps: i32,
    pub weight: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Workout,
    Exercise,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Workout => Entity::belongs_to(workout::Entity)
                .from(Column::WorkoutId)
                .to(workout::Column::Id)
                .into(),
            Self::Exercise => Entity::belongs_to(exercise::Entity)
                .from(Column::ExerciseId)
                .to(exercise::Column::Id)
                .into(),
        }
    }
}

impl Related<workout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workout.def()
    }
}

impl Related<exercise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exercise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
