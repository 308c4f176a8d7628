use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, Statement};
use serde_json::Value;
use tempfile::TempDir;
use url::Url;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_liftlog"))
}

fn run_cmd_with_session(dir: &Path, session_id: Option<&str>, args: &[&str]) -> Output {
    let mut cmd = Command::new(bin_path());
    cmd.arg("--data-dir").arg(dir);
    if let Some(session_id) = session_id {
        cmd.arg("--session-id").arg(session_id);
    }
    cmd.args(args);
    cmd.output().expect("run command")
}

fn run_cmd(dir: &Path, args: &[&str]) -> Output {
    run_cmd_with_session(dir, Some("test-session"), args)
}

fn output_stdout(output: Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout utf8")
}

fn output_json(output: Output) -> Value {
    let stdout = output_stdout(output);
    serde_json::from_str(&stdout).expect("json output")
}

fn start_workout(dir: &Path) -> i64 {
    let value = output_json(run_cmd(dir, &["workout", "start"]));
    value["workout_id"].as_i64().expect("workout id")
}

fn start_workout_with_notes(dir: &Path, notes: &str) -> i64 {
    let value = output_json(run_cmd(dir, &["workout", "start", "--notes", notes]));
    value["workout_id"].as_i64().expect("workout id")
}

fn log_sets(dir: &Path, exercise: &str, set_args: &[&str]) -> Value {
    let mut args = vec!["workout", "log", exercise];
    args.extend_from_slice(set_args);
    output_json(run_cmd(dir, &args))
}

fn create_template(dir: &Path, name: &str, entry_args: &[&str]) -> i64 {
    let mut args = vec!["template", "create", name];
    args.extend_from_slice(entry_args);
    let value = output_json(run_cmd(dir, &args));
    value["template_id"].as_i64().expect("template id")
}

async fn open_db(dir: &Path) -> sea_orm::DatabaseConnection {
    let db_path = dir.join("workouts.db");
    let mut url = Url::from_file_path(&db_path).expect("db path");
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Database::connect(&sqlite_url).await.expect("connect db")
}

#[test]
fn exercise_register_reports_created_then_existing() {
    let dir = TempDir::new().expect("temp dir");
    let first = output_json(run_cmd(
        dir.path(),
        &["exercise", "register", "Bench Press", "--category", "chest"],
    ));
    assert_eq!(first["status"], "created");
    assert_eq!(first["name"], "Bench Press");
    assert_eq!(first["category"], "chest");
    let id = first["id"].as_i64().expect("exercise id");

    let second = output_json(run_cmd(
        dir.path(),
        &["exercise", "register", "  bench   PRESS ", "--category", "back"],
    ));
    assert_eq!(second["status"], "already_exists");
    assert_eq!(second["id"].as_i64(), Some(id));
    assert_eq!(second["name"], "Bench Press");
    assert_eq!(second["category"], "chest");
}

#[test]
fn exercise_register_rejects_blank_name() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["exercise", "register", "   "]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.trim(),
        "Error: Invalid argument: exercise name cannot be empty"
    );
}

#[test]
fn exercise_search_filters_by_query_and_category() {
    let dir = TempDir::new().expect("temp dir");
    output_json(run_cmd(
        dir.path(),
        &["exercise", "register", "Bench Press", "--category", "chest"],
    ));
    output_json(run_cmd(
        dir.path(),
        &["exercise", "register", "Overhead Press", "--category", "shoulders"],
    ));
    output_json(run_cmd(
        dir.path(),
        &["exercise", "register", "Squat", "--category", "legs"],
    ));

    let all = output_json(run_cmd(dir.path(), &["exercise", "search"]));
    assert_eq!(all["status"], "success");
    assert_eq!(all["count"], 3);

    let pressing = output_json(run_cmd(
        dir.path(),
        &["exercise", "search", "--query", "PRESS"],
    ));
    assert_eq!(pressing["count"], 2);
    assert_eq!(pressing["exercises"][0]["name"], "Bench Press");
    assert_eq!(pressing["exercises"][1]["name"], "Overhead Press");

    let chest = output_json(run_cmd(
        dir.path(),
        &["exercise", "search", "--query", "press", "--category", "CHEST"],
    ));
    assert_eq!(chest["count"], 1);
    assert_eq!(chest["exercises"][0]["name"], "Bench Press");
}

#[test]
fn workout_start_log_and_summary_roundtrip() {
    let dir = TempDir::new().expect("temp dir");
    let workout_id = start_workout(dir.path());

    let logged = log_sets(
        dir.path(),
        "Bench Press",
        &[
            "--reps", "8", "--weight", "100", "--notes", "felt strong", "--reps", "6",
        ],
    );
    assert_eq!(logged["status"], "success");
    assert_eq!(logged["workout_id"].as_i64(), Some(workout_id));
    assert_eq!(logged["exercise_name"], "Bench Press");
    assert_eq!(logged["sets_logged"], 2);
    assert_eq!(logged["message"], "Logged Bench Press - 2 set(s)");
    assert!(logged.get("guidance").is_none());

    let summary = output_json(run_cmd(dir.path(), &["workout", "summary"]));
    assert_eq!(summary["id"].as_i64(), Some(workout_id));
    assert!(summary["date"].is_string());
    let sets = &summary["exercises"][0]["sets"];
    assert_eq!(sets[0]["set"], 1);
    assert_eq!(sets[0]["reps"], 8);
    assert_eq!(sets[0]["weight"].as_f64(), Some(100.0));
    assert_eq!(sets[0]["notes"], "felt strong");
    assert_eq!(sets[1]["set"], 2);
    assert_eq!(sets[1]["reps"], 6);
    assert!(sets[1]["weight"].is_null());
}

#[test]
fn workout_log_continues_set_numbers_across_calls() {
    let dir = TempDir::new().expect("temp dir");
    start_workout(dir.path());
    log_sets(dir.path(), "Squat", &["--reps", "5", "--reps", "5"]);
    log_sets(dir.path(), "Squat", &["--reps", "3"]);

    let summary = output_json(run_cmd(dir.path(), &["workout", "summary"]));
    let sets = &summary["exercises"][0]["sets"];
    assert_eq!(sets.as_array().map(Vec::len), Some(3));
    assert_eq!(sets[2]["set"], 3);
    assert_eq!(sets[2]["reps"], 3);
}

#[test]
fn workout_log_without_session_errors() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["workout", "log", "Squat", "--reps", "5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.trim(),
        "Error: No active workout: run 'workout start' or pass --workout-id"
    );
}

#[test]
fn workout_log_reports_missing_explicit_workout() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(
        dir.path(),
        &["workout", "log", "Squat", "--reps", "5", "--workout-id", "9999"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.trim(),
        "Error: No active workout: workout id 9999 does not exist"
    );
}

#[test]
fn workout_log_rejects_zero_reps() {
    let dir = TempDir::new().expect("temp dir");
    start_workout(dir.path());
    let output = run_cmd(dir.path(), &["workout", "log", "Squat", "--reps", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.trim(),
        "Error: Invalid argument: reps must be greater than 0"
    );
}

#[test]
fn workout_log_requires_a_reps_flag() {
    let dir = TempDir::new().expect("temp dir");
    start_workout(dir.path());
    let output = run_cmd(dir.path(), &["workout", "log", "Squat", "--guidance"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("workout log requires at least one --reps"));
}

#[test]
fn workout_log_rejects_weight_before_reps() {
    let dir = TempDir::new().expect("temp dir");
    start_workout(dir.path());
    let output = run_cmd(
        dir.path(),
        &["workout", "log", "Squat", "--weight", "60", "--reps", "5"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("workout log --weight must follow a --reps"));
}

#[test]
fn workout_log_rejects_unexpected_argument() {
    let dir = TempDir::new().expect("temp dir");
    start_workout(dir.path());
    let output = run_cmd(
        dir.path(),
        &["workout", "log", "Squat", "--reps", "5", "--tempo", "slow"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("workout log unexpected argument: --tempo"));
}

#[test]
fn workout_summary_without_session_errors() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["workout", "summary"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: Not found: no current workout");
}

#[test]
fn workout_summary_reports_missing_workout() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["workout", "summary", "--workout-id", "9999"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: Not found: workout id 9999");
}

#[test]
fn workout_end_attaches_notes_and_clears_session() {
    let dir = TempDir::new().expect("temp dir");
    let workout_id = start_workout(dir.path());
    log_sets(dir.path(), "Deadlift", &["--reps", "5", "--weight", "140"]);

    let ended = output_json(run_cmd(
        dir.path(),
        &["workout", "end", "--notes", "Solid session"],
    ));
    assert_eq!(ended["status"], "success");
    assert_eq!(ended["message"], "Workout session ended");
    assert_eq!(ended["summary"]["id"].as_i64(), Some(workout_id));
    assert_eq!(ended["summary"]["notes"], "Solid session");
    assert_eq!(ended["summary"]["exercises"][0]["name"], "Deadlift");

    let output = run_cmd(dir.path(), &["workout", "end"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: No active workout: nothing to end");
}

#[test]
fn workout_history_lists_latest_first() {
    let dir = TempDir::new().expect("temp dir");
    start_workout_with_notes(dir.path(), "first");
    start_workout_with_notes(dir.path(), "second");
    start_workout_with_notes(dir.path(), "third");

    let history = output_json(run_cmd(
        dir.path(),
        &["workout", "history", "--limit", "2"],
    ));
    assert_eq!(history["status"], "success");
    assert_eq!(history["count"], 2);
    assert_eq!(history["workouts"][0]["notes"], "third");
    assert_eq!(history["workouts"][1]["notes"], "second");
}

#[test]
fn workout_history_rejects_zero_limit() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["workout", "history", "--limit", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.trim(),
        "Error: Invalid argument: limit must be greater than 0"
    );
}

#[test]
fn exercise_history_walks_past_workouts() {
    let dir = TempDir::new().expect("temp dir");
    let first = start_workout(dir.path());
    log_sets(dir.path(), "Bench Press", &["--reps", "8", "--weight", "95"]);
    output_json(run_cmd(dir.path(), &["workout", "end"]));

    let second = start_workout(dir.path());
    log_sets(dir.path(), "Bench Press", &["--reps", "8", "--weight", "100"]);
    output_json(run_cmd(dir.path(), &["workout", "end"]));

    let history = output_json(run_cmd(
        dir.path(),
        &["exercise", "history", "bench press"],
    ));
    assert_eq!(history["status"], "success");
    assert_eq!(history["exercise_name"], "Bench Press");
    assert_eq!(history["count"], 2);
    assert_eq!(history["history"][0]["workout_id"].as_i64(), Some(second));
    assert_eq!(history["history"][1]["workout_id"].as_i64(), Some(first));
    assert_eq!(history["history"][0]["sets"][0]["weight"].as_f64(), Some(100.0));
}

#[test]
fn exercise_history_reports_unknown_exercise() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(dir.path(), &["exercise", "history", "Deadlift"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: Not found: exercise 'Deadlift'");
}

#[test]
fn template_create_registers_exercises_and_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let value = output_json(run_cmd(
        dir.path(),
        &[
            "template",
            "create",
            "Push Day",
            "--exercise",
            "Bench Press",
            "--category",
            "chest",
            "--target-sets",
            "4",
            "--reps-min",
            "6",
            "--reps-max",
            "10",
            "--exercise",
            "Overhead Press",
        ],
    ));
    assert_eq!(value["status"], "success");
    assert_eq!(value["name"], "Push Day");
    assert_eq!(value["exercises"][0]["name"], "Bench Press");
    assert_eq!(value["exercises"][1]["name"], "Overhead Press");
    assert!(value["exercises"][0]["exercise_id"].is_i64());

    let listed = output_json(run_cmd(
        dir.path(),
        &["template", "list", "--with-exercises"],
    ));
    assert_eq!(listed["count"], 1);
    let entries = &listed["templates"][0]["exercises"];
    assert_eq!(entries[0]["order"], 1);
    assert_eq!(entries[0]["target_sets"], 4);
    assert_eq!(entries[0]["target_reps_min"], 6);
    assert_eq!(entries[1]["order"], 2);
    assert_eq!(entries[1]["target_sets"], 3);
    assert!(entries[1]["target_reps_min"].is_null());
}

#[test]
fn template_create_requires_an_exercise_flag() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(
        dir.path(),
        &["template", "create", "Push Day", "--category", "chest"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("template create --category must follow an --exercise"));
}

#[test]
fn template_create_rejects_bad_number() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(
        dir.path(),
        &[
            "template",
            "create",
            "Push Day",
            "--exercise",
            "Bench Press",
            "--target-sets",
            "lots",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid --target-sets 'lots', expected an integer"));
}

#[tokio::test]
async fn template_list_hides_inactive_unless_asked() {
    let dir = TempDir::new().expect("temp dir");
    let push_id = create_template(dir.path(), "Push Day", &["--exercise", "Bench Press"]);
    create_template(dir.path(), "Pull Day", &["--exercise", "Barbell Row"]);

    let db = open_db(dir.path()).await;
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        format!("UPDATE templates SET active = 0 WHERE id = {push_id};"),
    ))
    .await
    .expect("deactivate template");

    let active_only = output_json(run_cmd(dir.path(), &["template", "list"]));
    assert_eq!(active_only["count"], 1);
    assert_eq!(active_only["templates"][0]["name"], "Pull Day");
    assert!(active_only["templates"][0].get("exercises").is_none());

    let all = output_json(run_cmd(dir.path(), &["template", "list", "--all"]));
    assert_eq!(all["count"], 2);
    let names: Vec<&str> = all["templates"]
        .as_array()
        .expect("templates array")
        .iter()
        .map(|template| template["name"].as_str().expect("name"))
        .collect();
    assert!(names.contains(&"Push Day"));
    assert!(names.contains(&"Pull Day"));
}

#[test]
fn template_progress_splits_completed_and_remaining() {
    let dir = TempDir::new().expect("temp dir");
    let template_id = create_template(
        dir.path(),
        "Push Day",
        &[
            "--exercise",
            "Bench Press",
            "--target-sets",
            "2",
            "--exercise",
            "Overhead Press",
            "--target-sets",
            "3",
        ],
    );
    let workout_id = start_workout(dir.path());
    log_sets(dir.path(), "Bench Press", &["--reps", "8", "--reps", "8"]);

    let value = output_json(run_cmd(
        dir.path(),
        &["template", "progress", &template_id.to_string()],
    ));
    assert_eq!(value["status"], "success");
    assert_eq!(value["workout_id"].as_i64(), Some(workout_id));
    assert_eq!(value["template_id"].as_i64(), Some(template_id));
    let progress = &value["progress"];
    assert_eq!(progress["completed"][0]["name"], "Bench Press");
    assert_eq!(progress["completed"][0]["sets_done"], 2);
    assert_eq!(progress["remaining"][0]["name"], "Overhead Press");
    assert_eq!(progress["remaining"][0]["sets_remaining"], 3);
    assert_eq!(progress["next"]["name"], "Overhead Press");
}

#[test]
fn template_progress_without_session_errors() {
    let dir = TempDir::new().expect("temp dir");
    let template_id = create_template(dir.path(), "Push Day", &["--exercise", "Bench Press"]);
    let output = run_cmd(
        dir.path(),
        &["template", "progress", &template_id.to_string()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.trim(),
        "Error: No active workout: run 'workout start' or pass --workout-id"
    );
}

#[test]
fn template_progress_reports_missing_template() {
    let dir = TempDir::new().expect("temp dir");
    start_workout(dir.path());
    let output = run_cmd(dir.path(), &["template", "progress", "9999"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: Not found: template id 9999");
}

#[test]
fn template_infer_reports_single_match() {
    let dir = TempDir::new().expect("temp dir");
    create_template(
        dir.path(),
        "Push Day",
        &["--exercise", "Bench Press", "--exercise", "Overhead Press"],
    );
    start_workout(dir.path());

    let value = output_json(run_cmd(
        dir.path(),
        &["template", "infer", "bench press"],
    ));
    assert_eq!(value["status"], "success");
    assert_eq!(value["template"]["name"], "Push Day");
    assert_eq!(value["reason"], "single_match");
    assert!(value["progress"]["next"].is_object());
    assert!(value["last_performance"]["workout_id"].is_null());
    assert!(value["last_performance"]["sets"].as_array().is_some_and(Vec::is_empty));
}

#[test]
fn template_infer_reports_not_found() {
    let dir = TempDir::new().expect("temp dir");
    output_json(run_cmd(dir.path(), &["exercise", "register", "Plank"]));
    start_workout(dir.path());

    let value = output_json(run_cmd(dir.path(), &["template", "infer", "Plank"]));
    assert_eq!(value["status"], "not_found");
    assert_eq!(
        value["message"],
        "No active template contains this exercise"
    );
    assert!(value["last_performance"]["workout_id"].is_null());
}

#[test]
fn workout_log_guidance_embeds_inference() {
    let dir = TempDir::new().expect("temp dir");
    let template_id = create_template(
        dir.path(),
        "Push Day",
        &["--exercise", "Bench Press", "--target-sets", "3"],
    );
    start_workout(dir.path());

    let logged = log_sets(
        dir.path(),
        "Bench Press",
        &["--reps", "8", "--guidance"],
    );
    let guidance = &logged["guidance"];
    assert_eq!(guidance["template_inference"]["status"], "success");
    assert_eq!(guidance["template_inference"]["reason"], "single_match");
    assert_eq!(guidance["template_id"].as_i64(), Some(template_id));
    assert_eq!(guidance["progress"]["remaining"][0]["sets_done"], 1);
    assert_eq!(guidance["progress"]["remaining"][0]["sets_remaining"], 2);
    assert_eq!(guidance["progress"]["next"]["name"], "Bench Press");
    assert!(guidance["last_performance"]["workout_id"].is_null());
}

#[test]
fn workout_log_guidance_honors_explicit_template() {
    let dir = TempDir::new().expect("temp dir");
    let template_id = create_template(
        dir.path(),
        "Full Body",
        &["--exercise", "Squat", "--target-sets", "5"],
    );
    start_workout(dir.path());

    let logged = log_sets(
        dir.path(),
        "Squat",
        &[
            "--reps",
            "5",
            "--guidance",
            "--template-id",
            &template_id.to_string(),
        ],
    );
    let guidance = &logged["guidance"];
    assert!(guidance["template_inference"].is_null());
    assert_eq!(guidance["template_id"].as_i64(), Some(template_id));
    assert_eq!(guidance["progress"]["remaining"][0]["sets_done"], 1);
    assert_eq!(guidance["progress"]["remaining"][0]["sets_remaining"], 4);
}

#[test]
fn sessions_track_workouts_independently() {
    let dir = TempDir::new().expect("temp dir");
    let first = start_workout(dir.path());

    let output = run_cmd_with_session(
        dir.path(),
        Some("other-session"),
        &["workout", "summary"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim(), "Error: Not found: no current workout");

    let other = output_json(run_cmd_with_session(
        dir.path(),
        Some("other-session"),
        &["workout", "start"],
    ));
    let second = other["workout_id"].as_i64().expect("workout id");
    assert_ne!(first, second);

    let summary = output_json(run_cmd(dir.path(), &["workout", "summary"]));
    assert_eq!(summary["id"].as_i64(), Some(first));
}

#[test]
fn missing_session_id_falls_back_to_default() {
    let dir = TempDir::new().expect("temp dir");
    let started = output_json(run_cmd_with_session(
        dir.path(),
        None,
        &["workout", "start"],
    ));
    let workout_id = started["workout_id"].as_i64().expect("workout id");

    let summary = output_json(run_cmd_with_session(
        dir.path(),
        Some("default"),
        &["workout", "summary"],
    ));
    assert_eq!(summary["id"].as_i64(), Some(workout_id));
}

#[test]
fn empty_session_id_flag_errors() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd_with_session(dir.path(), Some("   "), &["workout", "start"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--session-id is empty"));
}

#[test]
fn relative_data_dir_resolves_against_cwd() {
    let dir = TempDir::new().expect("temp dir");
    let mut cmd = Command::new(bin_path());
    cmd.current_dir(dir.path());
    cmd.args([
        "--data-dir",
        "data",
        "--session-id",
        "test-session",
        "exercise",
        "register",
        "Bench Press",
    ]);
    let output = cmd.output().expect("run command");
    let value = output_json(output);
    assert_eq!(value["status"], "created");
    assert!(dir.path().join("data").join("workouts.db").exists());
}
