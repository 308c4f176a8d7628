use sea_orm::entity::prelude::*;

use super::{template_exercise, workout_set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "exercises")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub category: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    WorkoutSet,
    TemplateExercise,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::WorkoutSet => Entity::has_many(workout_set::Entity).into(),
            Self::TemplateExercise => Entity::has_many(template_exercise::Entity).into(),
        }
    }
}

impl Related<workout_set::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkoutSet.def()
    }
}

impl Related<template_exercise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateExercise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
