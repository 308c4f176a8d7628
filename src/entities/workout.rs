use sea_orm::entity::prelude::*;

use super::workout_set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "workouts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub date: DateTimeUtc,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    WorkoutSet,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::WorkoutSet => Entity::has_many(workout_set::Entity).into(),
        }
    }
}

impl Related<workout_set::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkoutSet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
