use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "liftlog",
    version,
    about = "Log workouts and track templates with SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Storage directory (defaults to <claude home>/.liftlog)"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "ID", help = "Session identifier")]
    pub session_id: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Exercise(ExerciseCommand),
    #[command(subcommand)]
    Workout(WorkoutCommand),
    #[command(subcommand)]
    Template(TemplateCommand),
}

#[derive(Subcommand, Debug)]
pub enum ExerciseCommand {
    Register(ExerciseRegister),
    Search(ExerciseSearch),
    History(ExerciseHistory),
}

#[derive(Subcommand, Debug)]
pub enum WorkoutCommand {
    Start(WorkoutStart),
    Log(WorkoutLog),
    Summary(WorkoutSummaryArgs),
    History(WorkoutHistory),
    End(WorkoutEnd),
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    Create(TemplateCreate),
    List(TemplateList),
    Progress(TemplateProgressArgs),
    Infer(TemplateInfer),
}

#[derive(Args, Debug)]
pub struct ExerciseRegister {
    pub name: String,
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExerciseSearch {
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExerciseHistory {
    pub exercise: String,
    #[arg(long, default_value_t = 3)]
    pub limit: u64,
}

#[derive(Args, Debug)]
pub struct WorkoutStart {
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct WorkoutLog {
    pub exercise: String,
    #[arg(
        value_name = "ARGS",
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Use --reps <n> [--weight <kg>] [--notes <text>] repeating per set, plus optional --workout-id <id>, --template-id <id> and --guidance"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct WorkoutSummaryArgs {
    #[arg(long, value_name = "ID")]
    pub workout_id: Option<i64>,
}

#[derive(Args, Debug)]
pub struct WorkoutHistory {
    #[arg(long, default_value_t = 10)]
    pub limit: u64,
}

#[derive(Args, Debug)]
pub struct WorkoutEnd {
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct TemplateCreate {
    pub name: String,
    #[arg(
        value_name = "ARGS",
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Use --exercise <name> [--category <c>] [--order <i>] [--target-sets <n>] [--reps-min <n>] [--reps-max <n>] repeating per exercise"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TemplateList {
    #[arg(long, help = "Include inactive templates")]
    pub all: bool,
    #[arg(long, help = "Attach each template's exercises")]
    pub with_exercises: bool,
}

#[derive(Args, Debug)]
pub struct TemplateProgressArgs {
    pub template_id: i64,
    #[arg(long, value_name = "ID")]
    pub workout_id: Option<i64>,
}

#[derive(Args, Debug)]
pub struct TemplateInfer {
    pub exercise: String,
    #[arg(long, value_name = "ID")]
    pub workout_id: Option<i64>,
}
