use sea_orm::entity::prelude::*;

use super::{exercise, template};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "template_exercises")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub template_id: i64,
    pub exercise_id: i64,
    pub order_index: i32,
    pub target_sets: i32,
    pub target_reps_min: Option<i32>,
    pub target_reps_max: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Template,
    Exercise,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Template => Entity::belongs_to(template::Entity)
                .from(Column::TemplateId)
                .to(template::Column::Id)
                .into(),
            Self::Exercise => Entity::belongs_to(exercise::Entity)
                .from(Column::ExerciseId)
                .to(exercise::Column::Id)
                .into(),
        }
    }
}

impl Related<template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<exercise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exercise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
