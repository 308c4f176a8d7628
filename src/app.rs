use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{active_workout, exercise, template, template_exercise, workout, workout_set};
use crate::error::AppError;
use crate::model::{
    ExerciseSets, Guidance, InferReason, Inference, LastPerformance, PerformedWorkout,
    ProgressEntry, RegisterStatus, SetEntry, SetLine, TemplateEntry, TemplateEntryInput,
    TemplateInfo, TemplateProgress, TemplateRef, WorkoutSummary,
};
use crate::util::normalize_name;

pub struct App {
    db: DatabaseConnection,
    session_id: String,
}

#[derive(Debug)]
pub struct LogOutcome {
    pub workout_id: i64,
    pub exercise: exercise::Model,
    pub sets_logged: usize,
}

impl App {
    pub fn new(db: DatabaseConnection, session_id: String) -> Self {
        Self { db, session_id }
    }

    pub async fn register_exercise(
        &self,
        name: &str,
        category: Option<&str>,
    ) -> Result<(exercise::Model, RegisterStatus), AppError> {
        let (model, created) = self
            .find_or_create_exercise_with_conn(&self.db, name, category)
            .await?;
        let status = if created {
            RegisterStatus::Created
        } else {
            RegisterStatus::AlreadyExists
        };
        Ok((model, status))
    }

    async fn find_or_create_exercise_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        name: &str,
        category: Option<&str>,
    ) -> Result<(exercise::Model, bool), AppError> {
        ensure_non_empty("exercise name", name)?;
        let normalized = normalize_name(name);
        if let Some(existing) = exercise::Entity::find()
            .filter(exercise::Column::Name.eq(normalized.as_str()))
            .one(db)
            .await?
        {
            // First registration wins.
            return Ok((existing, false));
        }
        let category = category
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let active = exercise::ActiveModel {
            name: Set(normalized),
            display_name: Set(name.trim().to_string()),
            category: Set(category),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let insert = exercise::Entity::insert(active).exec(db).await?;
        let created = exercise::Entity::find_by_id(insert.last_insert_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("exercise not found after insert".to_string()))?;
        Ok((created, true))
    }

    pub async fn search_exercises(
        &self,
        query: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<exercise::Model>, AppError> {
        let mut select = exercise::Entity::find();
        if let Some(query) = query {
            let normalized = normalize_name(query);
            if !normalized.is_empty() {
                select = select.filter(exercise::Column::Name.contains(&normalized));
            }
        }
        if let Some(category) = category {
            let category = category.trim().to_lowercase();
            if !category.is_empty() {
                select = select.filter(
                    Expr::expr(Func::lower(Expr::col(exercise::Column::Category))).eq(category),
                );
            }
        }
        Ok(select
            .order_by_asc(exercise::Column::DisplayName)
            .all(&self.db)
            .await?)
    }

    pub async fn get_workout(&self, id: i64) -> Result<workout::Model, AppError> {
        workout::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workout id {id}")))
    }

    pub async fn get_template(&self, id: i64) -> Result<template::Model, AppError> {
        template::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("template id {id}")))
    }

    pub async fn active_workout_id(&self) -> Result<Option<i64>, AppError> {
        let pointer = active_workout::Entity::find()
            .filter(active_workout::Column::SessionId.eq(self.session_id.as_str()))
            .one(&self.db)
            .await?;
        if let Some(pointer) = pointer {
            // A pointer to a vanished workout counts as no current workout.
            let workout = workout::Entity::find_by_id(pointer.workout_id)
                .one(&self.db)
                .await?;
            return Ok(workout.map(|model| model.id));
        }
        Ok(None)
    }

    pub async fn start_workout(&self, notes: Option<String>) -> Result<workout::Model, AppError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;
        let result: Result<workout::Model, AppError> = async {
            let active = workout::ActiveModel {
                date: Set(now),
                notes: Set(notes),
                created_at: Set(now),
                ..Default::default()
            };
            let insert = workout::Entity::insert(active).exec(&txn).await?;
            let model = workout::Entity::find_by_id(insert.last_insert_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("workout not found after insert".to_string()))?;

            active_workout::Entity::delete_many()
                .filter(active_workout::Column::SessionId.eq(self.session_id.as_str()))
                .exec(&txn)
                .await?;
            let pointer = active_workout::ActiveModel {
                session_id: Set(self.session_id.clone()),
                workout_id: Set(model.id),
                updated_at: Set(now),
                ..Default::default()
            };
            active_workout::Entity::insert(pointer).exec(&txn).await?;
            Ok(model)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn log_sets(
        &self,
        name: &str,
        entries: &[SetEntry],
        workout_id: Option<i64>,
    ) -> Result<LogOutcome, AppError> {
        ensure_non_empty("exercise name", name)?;
        validate_set_entries(entries)?;
        let workout_id = self.resolve_log_target(workout_id).await?;

        let txn = self.db.begin().await?;
        let result: Result<LogOutcome, AppError> = async {
            let (exercise, _) = self
                .find_or_create_exercise_with_conn(&txn, name, None)
                .await?;
            let last = workout_set::Entity::find()
                .filter(workout_set::Column::WorkoutId.eq(workout_id))
                .filter(workout_set::Column::ExerciseId.eq(exercise.id))
                .order_by_desc(workout_set::Column::SetNumber)
                .one(&txn)
                .await?;
            let start = last.map(|set| set.set_number).unwrap_or(0) + 1;
            let now = Utc::now();
            for (idx, entry) in entries.iter().enumerate() {
                let active = workout_set::ActiveModel {
                    workout_id: Set(workout_id),
                    exercise_id: Set(exercise.id),
                    set_number: Set(start + idx as i32),
                    reps: Set(entry.reps),
                    weight: Set(entry.weight),
                    notes: Set(entry.notes.clone()),
                    created_at: Set(now),
                    ..Default::default()
                };
                workout_set::Entity::insert(active).exec(&txn).await?;
            }
            Ok(LogOutcome {
                workout_id,
                exercise,
                sets_logged: entries.len(),
            })
        }
        .await;

        finalize_transaction(txn, result).await
    }

    async fn resolve_log_target(&self, explicit: Option<i64>) -> Result<i64, AppError> {
        if let Some(id) = explicit {
            let exists = workout::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .is_some();
            if !exists {
                return Err(AppError::NoActiveWorkout(format!(
                    "workout id {id} does not exist"
                )));
            }
            return Ok(id);
        }
        self.active_workout_id().await?.ok_or_else(|| {
            AppError::NoActiveWorkout("run 'workout start' or pass --workout-id".to_string())
        })
    }

    pub async fn workout_summary(
        &self,
        workout_id: Option<i64>,
    ) -> Result<WorkoutSummary, AppError> {
        let workout = match workout_id {
            Some(id) => self.get_workout(id).await?,
            None => {
                let id = self
                    .active_workout_id()
                    .await?
                    .ok_or_else(|| AppError::NotFound("no current workout".to_string()))?;
                self.get_workout(id).await?
            }
        };
        self.summary_with_conn(&self.db, &workout).await
    }

    async fn summary_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        workout: &workout::Model,
    ) -> Result<WorkoutSummary, AppError> {
        let sets = workout_set::Entity::find()
            .filter(workout_set::Column::WorkoutId.eq(workout.id))
            .order_by_asc(workout_set::Column::CreatedAt)
            .order_by_asc(workout_set::Column::Id)
            .all(db)
            .await?;

        let mut order: Vec<i64> = Vec::new();
        let mut grouped: HashMap<i64, Vec<SetLine>> = HashMap::new();
        for set in &sets {
            if !grouped.contains_key(&set.exercise_id) {
                order.push(set.exercise_id);
            }
            grouped.entry(set.exercise_id).or_default().push(set_line(set));
        }
        for lines in grouped.values_mut() {
            lines.sort_by_key(|line| line.set);
        }

        let names = self.exercise_map_with_conn(db, &order).await?;
        let mut exercises = Vec::new();
        for exercise_id in order {
            let model = names
                .get(&exercise_id)
                .ok_or_else(|| AppError::NotFound(format!("exercise id {exercise_id}")))?;
            let sets = grouped.remove(&exercise_id).unwrap_or_default();
            exercises.push(ExerciseSets {
                exercise_id,
                name: model.display_name.clone(),
                sets,
            });
        }

        Ok(WorkoutSummary {
            id: workout.id,
            date: workout.date,
            notes: workout.notes.clone(),
            exercises,
        })
    }

    async fn exercise_map_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[i64],
    ) -> Result<HashMap<i64, exercise::Model>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = exercise::Entity::find()
            .filter(exercise::Column::Id.is_in(ids.to_vec()))
            .all(db)
            .await?;
        Ok(models.into_iter().map(|model| (model.id, model)).collect())
    }

    pub async fn recent_workouts(&self, limit: u64) -> Result<Vec<WorkoutSummary>, AppError> {
        ensure_positive_limit(limit)?;
        let workouts = workout::Entity::find()
            .order_by_desc(workout::Column::Date)
            .order_by_desc(workout::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        let mut summaries = Vec::new();
        for workout in &workouts {
            summaries.push(self.summary_with_conn(&self.db, workout).await?);
        }
        Ok(summaries)
    }

    pub async fn end_workout(&self, notes: Option<String>) -> Result<WorkoutSummary, AppError> {
        let workout_id = self
            .active_workout_id()
            .await?
            .ok_or_else(|| AppError::NoActiveWorkout("nothing to end".to_string()))?;

        let txn = self.db.begin().await?;
        let result: Result<WorkoutSummary, AppError> = async {
            let workout = workout::Entity::find_by_id(workout_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("workout id {workout_id}")))?;
            let workout = if let Some(notes) = notes {
                let mut active: workout::ActiveModel = workout.into();
                active.notes = Set(Some(notes));
                active.update(&txn).await?
            } else {
                workout
            };
            let summary = self.summary_with_conn(&txn, &workout).await?;
            active_workout::Entity::delete_many()
                .filter(active_workout::Column::SessionId.eq(self.session_id.as_str()))
                .exec(&txn)
                .await?;
            Ok(summary)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn exercise_history(
        &self,
        name: &str,
        limit: u64,
    ) -> Result<(exercise::Model, Vec<PerformedWorkout>), AppError> {
        ensure_non_empty("exercise name", name)?;
        ensure_positive_limit(limit)?;
        let normalized = normalize_name(name);
        let exercise = exercise::Entity::find()
            .filter(exercise::Column::Name.eq(normalized.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("exercise '{}'", name.trim())))?;

        let sets = workout_set::Entity::find()
            .filter(workout_set::Column::ExerciseId.eq(exercise.id))
            .order_by_asc(workout_set::Column::SetNumber)
            .order_by_asc(workout_set::Column::Id)
            .all(&self.db)
            .await?;
        let mut workout_ids: Vec<i64> = Vec::new();
        let mut grouped: HashMap<i64, Vec<SetLine>> = HashMap::new();
        for set in &sets {
            workout_ids.push(set.workout_id);
            grouped.entry(set.workout_id).or_default().push(set_line(set));
        }

        let workouts = workout::Entity::find()
            .filter(workout::Column::Id.is_in(unique_ids(&workout_ids)))
            .order_by_desc(workout::Column::Date)
            .order_by_desc(workout::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        let mut history = Vec::new();
        for workout in workouts {
            let sets = grouped.remove(&workout.id).unwrap_or_default();
            history.push(PerformedWorkout {
                workout_id: workout.id,
                date: workout.date,
                sets,
            });
        }
        Ok((exercise, history))
    }

    async fn last_performance_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        exercise_id: i64,
        exclude_workout: Option<i64>,
    ) -> Result<LastPerformance, AppError> {
        let mut select =
            workout_set::Entity::find().filter(workout_set::Column::ExerciseId.eq(exercise_id));
        if let Some(workout_id) = exclude_workout {
            select = select.filter(workout_set::Column::WorkoutId.ne(workout_id));
        }
        let sets = select.all(db).await?;
        let workout_ids: Vec<i64> = sets.iter().map(|set| set.workout_id).collect();
        let latest = workout::Entity::find()
            .filter(workout::Column::Id.is_in(unique_ids(&workout_ids)))
            .order_by_desc(workout::Column::Date)
            .order_by_desc(workout::Column::Id)
            .one(db)
            .await?;
        let latest = match latest {
            Some(workout) => workout,
            None => return Ok(LastPerformance::none()),
        };
        let mut lines: Vec<SetLine> = sets
            .iter()
            .filter(|set| set.workout_id == latest.id)
            .map(set_line)
            .collect();
        lines.sort_by_key(|line| line.set);
        Ok(LastPerformance {
            workout_id: Some(latest.id),
            date: Some(latest.date),
            sets: lines,
        })
    }

    pub async fn create_template(
        &self,
        name: &str,
        entries: Vec<TemplateEntryInput>,
    ) -> Result<(template::Model, Vec<(String, i64)>), AppError> {
        ensure_non_empty("template name", name)?;
        if entries.is_empty() {
            return Err(AppError::InvalidArgument(
                "a template needs at least one exercise".to_string(),
            ));
        }
        for entry in &entries {
            ensure_non_empty("exercise name", &entry.name)?;
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let result: Result<(template::Model, Vec<(String, i64)>), AppError> = async {
            let template_active = template::ActiveModel {
                name: Set(name.trim().to_string()),
                active: Set(true),
                created_at: Set(now),
                ..Default::default()
            };
            let insert = template::Entity::insert(template_active).exec(&txn).await?;
            let model = template::Entity::find_by_id(insert.last_insert_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("template not found after insert".to_string()))?;

            let mut registered = Vec::new();
            for (idx, entry) in entries.into_iter().enumerate() {
                let (exercise, _) = self
                    .find_or_create_exercise_with_conn(&txn, &entry.name, entry.category.as_deref())
                    .await?;
                let link = template_exercise::ActiveModel {
                    template_id: Set(model.id),
                    exercise_id: Set(exercise.id),
                    order_index: Set(entry.order.unwrap_or((idx + 1) as i32)),
                    target_sets: Set(entry.target_sets.unwrap_or(3)),
                    target_reps_min: Set(entry.target_reps_min),
                    target_reps_max: Set(entry.target_reps_max),
                    created_at: Set(now),
                    ..Default::default()
                };
                template_exercise::Entity::insert(link).exec(&txn).await?;
                registered.push((entry.name.trim().to_string(), exercise.id));
            }
            Ok((model, registered))
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn list_templates(
        &self,
        include_inactive: bool,
        with_exercises: bool,
    ) -> Result<Vec<TemplateInfo>, AppError> {
        let mut select = template::Entity::find();
        if !include_inactive {
            select = select.filter(template::Column::Active.eq(true));
        }
        let templates = select
            .order_by_desc(template::Column::CreatedAt)
            .order_by_desc(template::Column::Id)
            .all(&self.db)
            .await?;

        let mut entries_by_template: HashMap<i64, Vec<TemplateEntry>> = HashMap::new();
        if with_exercises {
            let ids: Vec<i64> = templates.iter().map(|template| template.id).collect();
            entries_by_template = self.template_entries_map_with_conn(&self.db, &ids).await?;
        }

        let mut infos = Vec::new();
        for template in templates {
            let exercises = if with_exercises {
                Some(entries_by_template.remove(&template.id).unwrap_or_default())
            } else {
                None
            };
            infos.push(TemplateInfo {
                id: template.id,
                name: template.name,
                active: template.active,
                created_at: template.created_at,
                exercises,
            });
        }
        Ok(infos)
    }

    async fn template_entries_map_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        template_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TemplateEntry>>, AppError> {
        if template_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let links = template_exercise::Entity::find()
            .filter(template_exercise::Column::TemplateId.is_in(template_ids.to_vec()))
            .order_by_asc(template_exercise::Column::OrderIndex)
            .order_by_asc(template_exercise::Column::Id)
            .all(db)
            .await?;
        let exercise_ids: Vec<i64> = links.iter().map(|link| link.exercise_id).collect();
        let names = self
            .exercise_map_with_conn(db, &unique_ids(&exercise_ids))
            .await?;
        let mut grouped: HashMap<i64, Vec<TemplateEntry>> = HashMap::new();
        for link in links {
            let model = names
                .get(&link.exercise_id)
                .ok_or_else(|| AppError::NotFound(format!("exercise id {}", link.exercise_id)))?;
            grouped
                .entry(link.template_id)
                .or_default()
                .push(TemplateEntry {
                    exercise_id: link.exercise_id,
                    name: model.display_name.clone(),
                    order: link.order_index,
                    target_sets: link.target_sets,
                    target_reps_min: link.target_reps_min,
                    target_reps_max: link.target_reps_max,
                });
        }
        Ok(grouped)
    }

    async fn template_entries_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        template_id: i64,
    ) -> Result<Vec<TemplateEntry>, AppError> {
        let mut map = self
            .template_entries_map_with_conn(db, &[template_id])
            .await?;
        Ok(map.remove(&template_id).unwrap_or_default())
    }

    pub async fn template_progress(
        &self,
        template_id: i64,
        workout_id: Option<i64>,
    ) -> Result<(i64, TemplateProgress), AppError> {
        let template = self.get_template(template_id).await?;
        let workout = match workout_id {
            Some(id) => self.get_workout(id).await?,
            None => {
                let id = self.active_workout_id().await?.ok_or_else(|| {
                    AppError::NoActiveWorkout(
                        "run 'workout start' or pass --workout-id".to_string(),
                    )
                })?;
                self.get_workout(id).await?
            }
        };
        let progress = self
            .compute_progress_with_conn(&self.db, template.id, workout.id)
            .await?;
        Ok((workout.id, progress))
    }

    async fn compute_progress_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        template_id: i64,
        workout_id: i64,
    ) -> Result<TemplateProgress, AppError> {
        let entries = self.template_entries_with_conn(db, template_id).await?;
        if entries.is_empty() {
            return Ok(TemplateProgress {
                completed: Vec::new(),
                remaining: Vec::new(),
                next: None,
            });
        }

        let sets = workout_set::Entity::find()
            .filter(workout_set::Column::WorkoutId.eq(workout_id))
            .all(db)
            .await?;
        let mut counts: HashMap<i64, i64> = HashMap::new();
        for set in sets {
            *counts.entry(set.exercise_id).or_insert(0) += 1;
        }

        let mut completed = Vec::new();
        let mut remaining = Vec::new();
        for entry in entries {
            let sets_done = counts.get(&entry.exercise_id).copied().unwrap_or(0);
            let sets_remaining = (i64::from(entry.target_sets) - sets_done).max(0);
            let progress = ProgressEntry {
                exercise_id: entry.exercise_id,
                name: entry.name,
                order: entry.order,
                target_sets: entry.target_sets,
                target_reps_min: entry.target_reps_min,
                target_reps_max: entry.target_reps_max,
                sets_done,
                sets_remaining,
            };
            if sets_remaining == 0 {
                completed.push(progress);
            } else {
                remaining.push(progress);
            }
        }
        let next = remaining.first().cloned();
        Ok(TemplateProgress {
            completed,
            remaining,
            next,
        })
    }

    pub async fn infer_template(
        &self,
        name: &str,
        workout_id: Option<i64>,
    ) -> Result<Inference, AppError> {
        ensure_non_empty("exercise name", name)?;
        let workout_id = match workout_id {
            Some(id) => Some(self.get_workout(id).await?.id),
            None => self.active_workout_id().await?,
        };
        let normalized = normalize_name(name);
        let exercise = exercise::Entity::find()
            .filter(exercise::Column::Name.eq(normalized.as_str()))
            .one(&self.db)
            .await?;
        let exercise = match exercise {
            Some(model) => model,
            None => {
                return Ok(Inference::NotFound {
                    message: "No active template contains this exercise".to_string(),
                    last_performance: LastPerformance::none(),
                })
            }
        };
        self.infer_for_exercise_with_conn(&self.db, &exercise, workout_id)
            .await
    }

    async fn infer_for_exercise_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        exercise: &exercise::Model,
        workout_id: Option<i64>,
    ) -> Result<Inference, AppError> {
        let links = template_exercise::Entity::find()
            .filter(template_exercise::Column::ExerciseId.eq(exercise.id))
            .all(db)
            .await?;
        let template_ids: Vec<i64> = links.iter().map(|link| link.template_id).collect();
        let candidates = template::Entity::find()
            .filter(template::Column::Id.is_in(unique_ids(&template_ids)))
            .filter(template::Column::Active.eq(true))
            .order_by_asc(template::Column::CreatedAt)
            .order_by_asc(template::Column::Id)
            .all(db)
            .await?;

        let last_performance = self
            .last_performance_with_conn(db, exercise.id, workout_id)
            .await?;
        if candidates.is_empty() {
            return Ok(Inference::NotFound {
                message: "No active template contains this exercise".to_string(),
                last_performance,
            });
        }

        let (chosen, reason) = if candidates.len() == 1 {
            (&candidates[0], InferReason::SingleMatch)
        } else {
            let logged: HashSet<i64> = match workout_id {
                Some(id) => {
                    let sets = workout_set::Entity::find()
                        .filter(workout_set::Column::WorkoutId.eq(id))
                        .all(db)
                        .await?;
                    sets.into_iter().map(|set| set.exercise_id).collect()
                }
                None => HashSet::new(),
            };
            let candidate_ids: Vec<i64> =
                candidates.iter().map(|template| template.id).collect();
            let links = template_exercise::Entity::find()
                .filter(template_exercise::Column::TemplateId.is_in(candidate_ids))
                .all(db)
                .await?;
            let mut members: HashMap<i64, HashSet<i64>> = HashMap::new();
            for link in links {
                members
                    .entry(link.template_id)
                    .or_default()
                    .insert(link.exercise_id);
            }
            let mut chosen = &candidates[0];
            let mut best = overlap_score(members.get(&chosen.id), &logged);
            for candidate in candidates.iter().skip(1) {
                let score = overlap_score(members.get(&candidate.id), &logged);
                if score > best {
                    chosen = candidate;
                    best = score;
                }
            }
            (chosen, InferReason::BestOverlap)
        };

        let progress = match workout_id {
            Some(id) => Some(self.compute_progress_with_conn(db, chosen.id, id).await?),
            None => None,
        };
        Ok(Inference::Success {
            template: TemplateRef {
                id: chosen.id,
                name: chosen.name.clone(),
            },
            reason,
            progress,
            last_performance,
        })
    }

    pub async fn guidance_for(
        &self,
        exercise: &exercise::Model,
        workout_id: i64,
        template_id: Option<i64>,
    ) -> Result<Guidance, AppError> {
        let last_performance = self
            .last_performance_with_conn(&self.db, exercise.id, Some(workout_id))
            .await?;
        if let Some(template_id) = template_id {
            let progress = self
                .compute_progress_with_conn(&self.db, template_id, workout_id)
                .await?;
            return Ok(Guidance {
                template_inference: None,
                template_id: Some(template_id),
                progress: Some(progress),
                last_performance,
            });
        }
        let inference = self
            .infer_for_exercise_with_conn(&self.db, exercise, Some(workout_id))
            .await?;
        let (template_id, progress) = match &inference {
            Inference::Success {
                template, progress, ..
            } => (Some(template.id), progress.clone()),
            Inference::NotFound { .. } => (None, None),
        };
        Ok(Guidance {
            template_inference: Some(inference),
            template_id,
            progress,
            last_performance,
        })
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        if seen.insert(*id) {
            unique.push(*id);
        }
    }
    unique
}

fn set_line(set: &workout_set::Model) -> SetLine {
    SetLine {
        set: set.set_number,
        reps: set.reps,
        weight: set.weight,
        notes: set.notes.clone(),
    }
}

fn overlap_score(members: Option<&HashSet<i64>>, logged: &HashSet<i64>) -> usize {
    members
        .map(|set| set.intersection(logged).count())
        .unwrap_or(0)
}

fn validate_set_entries(entries: &[SetEntry]) -> Result<(), AppError> {
    if entries.is_empty() {
        return Err(AppError::InvalidArgument(
            "at least one set is required".to_string(),
        ));
    }
    for entry in entries {
        if entry.reps <= 0 {
            return Err(AppError::InvalidArgument(
                "reps must be greater than 0".to_string(),
            ));
        }
    }
    Ok(())
}

fn ensure_positive_limit(limit: u64) -> Result<(), AppError> {
    if limit == 0 {
        return Err(AppError::InvalidArgument(
            "limit must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidArgument(format!("{label} cannot be empty")));
    }
    Ok(())
}
