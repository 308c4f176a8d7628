use sea_orm::entity::prelude::*;

use super::template_exercise;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    TemplateExercise,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::TemplateExercise => Entity::has_many(template_exercise::Entity).into(),
        }
    }
}

impl Related<template_exercise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateExercise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
