use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use url::Url;

use crate::entities::{active_workout, exercise, template, template_exercise, workout, workout_set};
use crate::error::AppError;

pub fn resolve_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("workouts.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path).map_err(|_| {
        AppError::InvalidArgument(format!("invalid sqlite path: {}", path.display()))
    })?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut exercise_stmt = schema.create_table_from_entity(exercise::Entity);
    exercise_stmt.if_not_exists();
    db.execute(builder.build(&exercise_stmt)).await?;

    let mut workout_stmt = schema.create_table_from_entity(workout::Entity);
    workout_stmt.if_not_exists();
    db.execute(builder.build(&workout_stmt)).await?;

    let mut set_stmt = schema.create_table_from_entity(workout_set::Entity);
    set_stmt.if_not_exists();
    db.execute(builder.build(&set_stmt)).await?;

    let mut template_stmt = schema.create_table_from_entity(template::Entity);
    template_stmt.if_not_exists();
    db.execute(builder.build(&template_stmt)).await?;

    let mut entry_stmt = schema.create_table_from_entity(template_exercise::Entity);
    entry_stmt.if_not_exists();
    db.execute(builder.build(&entry_stmt)).await?;

    let mut active_stmt = schema.create_table_from_entity(active_workout::Entity);
    active_stmt.if_not_exists();
    db.execute(builder.build(&active_stmt)).await?;

    let builder = db.get_database_backend();

    let mut name_index = Index::create()
        .name("idx_exercises_name")
        .table(exercise::Entity)
        .col(exercise::Column::Name)
        .unique()
        .to_owned();
    name_index.if_not_exists();
    db.execute(builder.build(&name_index)).await?;

    let mut category_index = Index::create()
        .name("idx_exercises_category")
        .table(exercise::Entity)
        .col(exercise::Column::Category)
        .to_owned();
    category_index.if_not_exists();
    db.execute(builder.build(&category_index)).await?;

    let mut date_index = Index::create()
        .name("idx_workouts_date")
        .table(workout::Entity)
        .col(workout::Column::Date)
        .to_owned();
    date_index.if_not_exists();
    db.execute(builder.build(&date_index)).await?;

    let mut set_index = Index::create()
        .name("idx_sets_workout_exercise")
        .table(workout_set::Entity)
        .col(workout_set::Column::WorkoutId)
        .col(workout_set::Column::ExerciseId)
        .to_owned();
    set_index.if_not_exists();
    db.execute(builder.build(&set_index)).await?;

    let mut set_exercise_index = Index::create()
        .name("idx_sets_exercise")
        .table(workout_set::Entity)
        .col(workout_set::Column::ExerciseId)
        .to_owned();
    set_exercise_index.if_not_exists();
    db.execute(builder.build(&set_exercise_index)).await?;

    let mut active_template_index = Index::create()
        .name("idx_templates_active")
        .table(template::Entity)
        .col(template::Column::Active)
        .to_owned();
    active_template_index.if_not_exists();
    db.execute(builder.build(&active_template_index)).await?;

    let mut entry_index = Index::create()
        .name("idx_template_exercises_template")
        .table(template_exercise::Entity)
        .col(template_exercise::Column::TemplateId)
        .to_owned();
    entry_index.if_not_exists();
    db.execute(builder.build(&entry_index)).await?;

    let mut session_index = Index::create()
        .name("idx_active_workout_session")
        .table(active_workout::Entity)
        .col(active_workout::Column::SessionId)
        .unique()
        .to_owned();
    session_index.if_not_exists();
    db.execute(builder.build(&session_index)).await?;

    Ok(())
}
