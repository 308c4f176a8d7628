mod app;
mod cli;
mod db;
mod entities;
mod error;
mod model;
mod util;

use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::{json, Value};

use crate::app::App;
use crate::cli::{
    Cli, Command, ExerciseCommand, ExerciseHistory, ExerciseRegister, ExerciseSearch,
    TemplateCommand, TemplateCreate, TemplateInfer, TemplateList, TemplateProgressArgs,
    WorkoutCommand, WorkoutEnd, WorkoutHistory, WorkoutLog, WorkoutStart, WorkoutSummaryArgs,
};
use crate::error::AppError;
use crate::model::{SetEntry, TemplateEntryInput};

const DATA_DIR_FLAG: &str = "--data-dir";
const SESSION_ID_FLAG: &str = "--session-id";
const CLAUDE_PLUGIN_ROOT_ENV: &str = "CLAUDE_PLUGIN_ROOT";
const DEFAULT_SESSION_ID: &str = "default";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let session_id = resolve_session_id(cli.session_id)?;
    let data_dir = resolve_data_dir(cli.data_dir)?;
    let db_path = db::resolve_db_path(&data_dir);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let app = App::new(db, session_id);

    match cli.command {
        Command::Exercise(command) => handle_exercise(&app, command).await,
        Command::Workout(command) => handle_workout(&app, command).await,
        Command::Template(command) => handle_template(&app, command).await,
    }
}

async fn handle_exercise(app: &App, command: ExerciseCommand) -> Result<(), AppError> {
    match command {
        ExerciseCommand::Register(args) => handle_exercise_register(app, args).await,
        ExerciseCommand::Search(args) => handle_exercise_search(app, args).await,
        ExerciseCommand::History(args) => handle_exercise_history(app, args).await,
    }
}

async fn handle_workout(app: &App, command: WorkoutCommand) -> Result<(), AppError> {
    match command {
        WorkoutCommand::Start(args) => handle_workout_start(app, args).await,
        WorkoutCommand::Log(args) => handle_workout_log(app, args).await,
        WorkoutCommand::Summary(args) => handle_workout_summary(app, args).await,
        WorkoutCommand::History(args) => handle_workout_history(app, args).await,
        WorkoutCommand::End(args) => handle_workout_end(app, args).await,
    }
}

async fn handle_template(app: &App, command: TemplateCommand) -> Result<(), AppError> {
    match command {
        TemplateCommand::Create(args) => handle_template_create(app, args).await,
        TemplateCommand::List(args) => handle_template_list(app, args).await,
        TemplateCommand::Progress(args) => handle_template_progress(app, args).await,
        TemplateCommand::Infer(args) => handle_template_infer(app, args).await,
    }
}

async fn handle_exercise_register(app: &App, args: ExerciseRegister) -> Result<(), AppError> {
    let (exercise, status) = app
        .register_exercise(&args.name, args.category.as_deref())
        .await?;
    print_json(&json!({
        "status": status.as_str(),
        "id": exercise.id,
        "name": exercise.display_name,
        "category": exercise.category,
    }))
}

async fn handle_exercise_search(app: &App, args: ExerciseSearch) -> Result<(), AppError> {
    let exercises = app
        .search_exercises(args.query.as_deref(), args.category.as_deref())
        .await?;
    let items: Vec<Value> = exercises
        .iter()
        .map(|exercise| {
            json!({
                "id": exercise.id,
                "name": exercise.display_name,
                "category": exercise.category,
            })
        })
        .collect();
    print_json(&json!({
        "status": "success",
        "count": items.len(),
        "exercises": items,
    }))
}

async fn handle_exercise_history(app: &App, args: ExerciseHistory) -> Result<(), AppError> {
    let (exercise, history) = app.exercise_history(&args.exercise, args.limit).await?;
    print_json(&json!({
        "status": "success",
        "exercise_id": exercise.id,
        "exercise_name": exercise.display_name,
        "count": history.len(),
        "history": history,
    }))
}

async fn handle_workout_start(app: &App, args: WorkoutStart) -> Result<(), AppError> {
    let workout = app.start_workout(args.notes).await?;
    print_json(&json!({
        "status": "success",
        "workout_id": workout.id,
        "message": "Started new workout session",
    }))
}

async fn handle_workout_log(app: &App, args: WorkoutLog) -> Result<(), AppError> {
    let request = parse_workout_log_args(&args.args)?;
    let outcome = app
        .log_sets(&args.exercise, &request.entries, request.workout_id)
        .await?;
    let message = format!(
        "Logged {} - {} set(s)",
        outcome.exercise.display_name, outcome.sets_logged
    );
    let mut result = json!({
        "status": "success",
        "workout_id": outcome.workout_id,
        "exercise_id": outcome.exercise.id,
        "exercise_name": outcome.exercise.display_name,
        "sets_logged": outcome.sets_logged,
        "message": message,
    });
    if request.guidance {
        let guidance = app
            .guidance_for(&outcome.exercise, outcome.workout_id, request.template_id)
            .await?;
        result["guidance"] = serde_json::to_value(&guidance)?;
    }
    print_json(&result)
}

async fn handle_workout_summary(app: &App, args: WorkoutSummaryArgs) -> Result<(), AppError> {
    let summary = app.workout_summary(args.workout_id).await?;
    print_json(&serde_json::to_value(&summary)?)
}

async fn handle_workout_history(app: &App, args: WorkoutHistory) -> Result<(), AppError> {
    let workouts = app.recent_workouts(args.limit).await?;
    print_json(&json!({
        "status": "success",
        "count": workouts.len(),
        "workouts": workouts,
    }))
}

async fn handle_workout_end(app: &App, args: WorkoutEnd) -> Result<(), AppError> {
    let summary = app.end_workout(args.notes).await?;
    print_json(&json!({
        "status": "success",
        "message": "Workout session ended",
        "summary": summary,
    }))
}

async fn handle_template_create(app: &App, args: TemplateCreate) -> Result<(), AppError> {
    let entries = parse_template_create_args(&args.args)?;
    let (template, registered) = app.create_template(&args.name, entries).await?;
    let items: Vec<Value> = registered
        .iter()
        .map(|(name, exercise_id)| {
            json!({
                "name": name,
                "exercise_id": exercise_id,
            })
        })
        .collect();
    print_json(&json!({
        "status": "success",
        "template_id": template.id,
        "name": template.name,
        "exercises": items,
    }))
}

async fn handle_template_list(app: &App, args: TemplateList) -> Result<(), AppError> {
    let templates = app.list_templates(args.all, args.with_exercises).await?;
    print_json(&json!({
        "status": "success",
        "count": templates.len(),
        "templates": templates,
    }))
}

async fn handle_template_progress(app: &App, args: TemplateProgressArgs) -> Result<(), AppError> {
    let (workout_id, progress) = app
        .template_progress(args.template_id, args.workout_id)
        .await?;
    print_json(&json!({
        "status": "success",
        "workout_id": workout_id,
        "template_id": args.template_id,
        "progress": progress,
    }))
}

async fn handle_template_infer(app: &App, args: TemplateInfer) -> Result<(), AppError> {
    let inference = app.infer_template(&args.exercise, args.workout_id).await?;
    print_json(&serde_json::to_value(&inference)?)
}

fn print_json(value: &Value) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(dir) = data_dir {
        if dir.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "{DATA_DIR_FLAG} is empty"
            )));
        }
        if dir.is_absolute() {
            return Ok(dir);
        }
        return Ok(std::env::current_dir()?.join(dir));
    }
    Ok(resolve_claude_home()?.join(".liftlog"))
}

fn resolve_claude_home() -> Result<PathBuf, AppError> {
    if let Ok(plugin_root) = std::env::var(CLAUDE_PLUGIN_ROOT_ENV) {
        if let Some(home) = find_claude_home(Path::new(&plugin_root)) {
            return Ok(home);
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(home) = find_claude_home(&exe_path) {
            return Ok(home);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".claude");
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    Err(AppError::InvalidArgument(
        "unable to resolve Claude home; set CLAUDE_PLUGIN_ROOT".to_string(),
    ))
}

fn find_claude_home(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(path) = current {
        if path.file_name().is_some_and(|name| name == ".claude") {
            return Some(path.to_path_buf());
        }
        current = path.parent();
    }
    None
}

fn resolve_session_id(session_id: Option<String>) -> Result<String, AppError> {
    let value = match session_id {
        Some(value) => value,
        None => return Ok(DEFAULT_SESSION_ID.to_string()),
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(format!(
            "{SESSION_ID_FLAG} is empty"
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Default)]
struct LogRequest {
    entries: Vec<SetEntry>,
    workout_id: Option<i64>,
    template_id: Option<i64>,
    guidance: bool,
}

fn parse_workout_log_args(args: &[String]) -> Result<LogRequest, AppError> {
    let mut request = LogRequest::default();
    let mut current: Option<SetEntry> = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--" => {
                idx += 1;
            }
            "--reps" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument("workout log --reps requires a value".to_string())
                })?;
                let reps = value.parse::<i32>().map_err(|_| {
                    AppError::InvalidArgument(format!(
                        "invalid reps '{value}', expected an integer"
                    ))
                })?;
                if let Some(entry) = current.take() {
                    request.entries.push(entry);
                }
                current = Some(SetEntry {
                    reps,
                    weight: None,
                    notes: None,
                });
                idx += 2;
            }
            "--weight" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument("workout log --weight requires a value".to_string())
                })?;
                let weight = value.parse::<f64>().map_err(|_| {
                    AppError::InvalidArgument(format!(
                        "invalid weight '{value}', expected a number"
                    ))
                })?;
                match current.as_mut() {
                    Some(entry) => entry.weight = Some(weight),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "workout log --weight must follow a --reps".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            "--notes" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument("workout log --notes requires a value".to_string())
                })?;
                match current.as_mut() {
                    Some(entry) => entry.notes = Some(value.to_string()),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "workout log --notes must follow a --reps".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            "--workout-id" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument(
                        "workout log --workout-id requires a value".to_string(),
                    )
                })?;
                let id = value.parse::<i64>().map_err(|_| {
                    AppError::InvalidArgument(format!(
                        "invalid workout id '{value}', expected an integer"
                    ))
                })?;
                request.workout_id = Some(id);
                idx += 2;
            }
            "--template-id" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument(
                        "workout log --template-id requires a value".to_string(),
                    )
                })?;
                let id = value.parse::<i64>().map_err(|_| {
                    AppError::InvalidArgument(format!(
                        "invalid template id '{value}', expected an integer"
                    ))
                })?;
                request.template_id = Some(id);
                idx += 2;
            }
            "--guidance" => {
                request.guidance = true;
                idx += 1;
            }
            unexpected => {
                return Err(AppError::InvalidArgument(format!(
                    "workout log unexpected argument: {unexpected}"
                )));
            }
        }
    }

    if let Some(entry) = current.take() {
        request.entries.push(entry);
    }
    if request.entries.is_empty() {
        return Err(AppError::InvalidArgument(
            "workout log requires at least one --reps".to_string(),
        ));
    }

    Ok(request)
}

fn parse_template_create_args(args: &[String]) -> Result<Vec<TemplateEntryInput>, AppError> {
    if args.is_empty() {
        return Err(AppError::InvalidArgument(
            "template create requires at least one --exercise".to_string(),
        ));
    }

    let mut entries = Vec::new();
    let mut current: Option<TemplateEntryInput> = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--" => {
                idx += 1;
            }
            "--exercise" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument(
                        "template create --exercise requires a value".to_string(),
                    )
                })?;
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
                current = Some(TemplateEntryInput {
                    name: value.to_string(),
                    category: None,
                    order: None,
                    target_sets: None,
                    target_reps_min: None,
                    target_reps_max: None,
                });
                idx += 2;
            }
            "--category" => {
                let value = args.get(idx + 1).ok_or_else(|| {
                    AppError::InvalidArgument(
                        "template create --category requires a value".to_string(),
                    )
                })?;
                match current.as_mut() {
                    Some(entry) => entry.category = Some(value.to_string()),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "template create --category must follow an --exercise".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            "--order" => {
                let order = parse_entry_number(args, idx, "--order")?;
                match current.as_mut() {
                    Some(entry) => entry.order = Some(order),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "template create --order must follow an --exercise".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            "--target-sets" => {
                let sets = parse_entry_number(args, idx, "--target-sets")?;
                match current.as_mut() {
                    Some(entry) => entry.target_sets = Some(sets),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "template create --target-sets must follow an --exercise".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            "--reps-min" => {
                let reps = parse_entry_number(args, idx, "--reps-min")?;
                match current.as_mut() {
                    Some(entry) => entry.target_reps_min = Some(reps),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "template create --reps-min must follow an --exercise".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            "--reps-max" => {
                let reps = parse_entry_number(args, idx, "--reps-max")?;
                match current.as_mut() {
                    Some(entry) => entry.target_reps_max = Some(reps),
                    None => {
                        return Err(AppError::InvalidArgument(
                            "template create --reps-max must follow an --exercise".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            unexpected => {
                return Err(AppError::InvalidArgument(format!(
                    "template create unexpected argument: {unexpected}"
                )));
            }
        }
    }

    if let Some(entry) = current.take() {
        entries.push(entry);
    }
    if entries.is_empty() {
        return Err(AppError::InvalidArgument(
            "template create requires at least one --exercise".to_string(),
        ));
    }

    Ok(entries)
}

fn parse_entry_number(args: &[String], idx: usize, flag: &str) -> Result<i32, AppError> {
    let value = args.get(idx + 1).ok_or_else(|| {
        AppError::InvalidArgument(format!("template create {flag} requires a value"))
    })?;
    value.parse::<i32>().map_err(|_| {
        AppError::InvalidArgument(format!("invalid {flag} '{value}', expected an integer"))
    })
}
