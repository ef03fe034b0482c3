//! Command-line surface over `resolution_core`.
//!
//! Each invocation opens the database, performs one use-case and exits.
//! Failed checklist writes print the reload hint and refetch before exit.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use resolution_core::db::open_db;
use resolution_core::{
    default_log_level, format_duration, init_logging, Board, DisplayTicker, GoalAggregate,
    GoalDetailsEdit, GoalId, GoalView, LogLevel, SqliteGoalRepository, SqliteSubtaskRepository,
    SubtaskId, SubtaskRepository, SyncError, SystemClock, TickControl, TimerTransition,
    DISPLAY_TICK,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::mpsc;

const DEFAULT_DB_FILE_NAME: &str = "resolution.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "resolution", version, about = "Track progress on ten weekend goals")]
struct Cli {
    /// SQLite database path.
    #[arg(long, global = true, env = "RESOLUTION_DB_PATH")]
    db: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "RESOLUTION_LOG_LEVEL")]
    log_level: Option<LogLevel>,
    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true, env = "RESOLUTION_LOG_DIR")]
    log_dir: Option<PathBuf>,
    /// Print JSON instead of text where supported.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check core linkage.
    Ping,
    /// List all goals with elapsed time and overall progress.
    Goals,
    /// Show one goal with its checklist.
    Show { goal: GoalId },
    /// Start a goal timer.
    Start { goal: GoalId },
    /// Stop a goal timer.
    Stop { goal: GoalId },
    /// Mark a goal complete (or incomplete with --undo).
    Complete {
        goal: GoalId,
        #[arg(long)]
        undo: bool,
    },
    /// Rename a goal or edit its description/notes.
    Describe {
        goal: GoalId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Append a subtask.
    Add { goal: GoalId, text: String },
    /// Flip a subtask's completion flag.
    Toggle { id: SubtaskId },
    /// Replace a subtask's text.
    Edit { id: SubtaskId, text: String },
    /// Delete a subtask.
    Delete { id: SubtaskId },
    /// Move a subtask to a final position.
    Move { id: SubtaskId, index: usize },
    /// Print the live elapsed time once per second.
    Watch {
        goal: GoalId,
        #[arg(long, default_value_t = 10)]
        ticks: u64,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Goals => "goals",
            Self::Show { .. } => "show",
            Self::Start { .. } => "start",
            Self::Stop { .. } => "stop",
            Self::Complete { .. } => "complete",
            Self::Describe { .. } => "describe",
            Self::Add { .. } => "add",
            Self::Toggle { .. } => "toggle",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::Move { .. } => "move",
            Self::Watch { .. } => "watch",
        }
    }

    /// Metadata-only `key=value` fields. Subtask text and goal details are
    /// never included.
    fn log_fields(&self) -> String {
        let name = self.name();
        match self {
            Self::Ping | Self::Goals => format!("command={name}"),
            Self::Show { goal }
            | Self::Start { goal }
            | Self::Stop { goal }
            | Self::Complete { goal, .. }
            | Self::Describe { goal, .. }
            | Self::Add { goal, .. }
            | Self::Watch { goal, .. } => format!("command={name} goal_id={goal}"),
            Self::Toggle { id } | Self::Edit { id, .. } | Self::Delete { id } => {
                format!("command={name} subtask_id={id}")
            }
            Self::Move { id, index } => {
                format!("command={name} subtask_id={id} index={index}")
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.unwrap_or_else(default_log_level);
        init_logging(level, log_dir).map_err(|err| anyhow!(err))?;
    }

    if matches!(cli.command, Command::Ping) {
        println!("resolution_core ping={}", resolution_core::ping());
        println!("resolution_core version={}", resolution_core::core_version());
        return Ok(());
    }

    let db_path = resolve_db_path(cli.db.clone());
    info!(
        "event=cli_command module=cli status=start {}",
        cli.command.log_fields()
    );
    let conn =
        open_db(&db_path).with_context(|| format!("failed to open {}", db_path.display()))?;
    run(&cli, &conn)
}

fn run(cli: &Cli, conn: &Connection) -> Result<()> {
    let goals = SqliteGoalRepository::try_new(conn)?;
    let subtasks = SqliteSubtaskRepository::try_new(conn)?;

    match &cli.command {
        Command::Ping => Ok(()),
        Command::Goals => {
            let board = Board::load(&goals, &SystemClock)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&board)?);
                return Ok(());
            }
            for goal in &board.goals {
                println!(
                    "{:>2} [{}] {} {:?} {}",
                    goal.id,
                    if goal.is_complete { "x" } else { " " },
                    format_duration(goal.elapsed_seconds),
                    goal.timer_phase,
                    goal.title
                );
            }
            println!(
                "{}/{} ({}%)",
                board.progress.completed,
                board.progress.total,
                board.progress.percent
            );
            Ok(())
        }
        Command::Show { goal } => {
            let aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            print_view(&aggregate.view(), cli.json)
        }
        Command::Start { goal } => {
            let mut aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            report_transition(aggregate.start_timer()?);
            Ok(())
        }
        Command::Stop { goal } => {
            let mut aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            report_transition(aggregate.stop_timer()?);
            Ok(())
        }
        Command::Complete { goal, undo } => {
            let mut aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            aggregate.set_complete(!undo)?;
            print_view(&aggregate.view(), cli.json)
        }
        Command::Describe {
            goal,
            title,
            description,
            notes,
        } => {
            let mut aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            aggregate.update_details(GoalDetailsEdit {
                title: title.clone(),
                description: description.clone(),
                notes: notes.clone(),
            })?;
            print_view(&aggregate.view(), cli.json)
        }
        Command::Add { goal, text } => {
            let mut aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            let created = aggregate.subtasks_mut().add(text.as_str())?;
            println!("added {} at position {}", created.id, created.sort_order);
            Ok(())
        }
        Command::Toggle { id } => {
            let mut aggregate = load_for_subtask(goals, subtasks, *id)?;
            let done = aggregate.subtasks_mut().toggle_complete(*id);
            finish_checklist_write(&mut aggregate, done.map(|_| ()), cli.json)
        }
        Command::Edit { id, text } => {
            let mut aggregate = load_for_subtask(goals, subtasks, *id)?;
            let edited = aggregate.subtasks_mut().edit_text(*id, text.as_str());
            finish_checklist_write(&mut aggregate, edited.map(|_| ()), cli.json)
        }
        Command::Delete { id } => {
            let mut aggregate = load_for_subtask(goals, subtasks, *id)?;
            let deleted = aggregate.subtasks_mut().delete(*id);
            finish_checklist_write(&mut aggregate, deleted.map(|_| ()), cli.json)
        }
        Command::Move { id, index } => {
            let mut aggregate = load_for_subtask(goals, subtasks, *id)?;
            let moved = aggregate.subtasks_mut().reorder(*id, *index);
            finish_checklist_write(&mut aggregate, moved.map(|_| ()), cli.json)
        }
        Command::Watch { goal, ticks } => {
            let aggregate = GoalAggregate::load(goals, subtasks, SystemClock, *goal)?;
            watch(&aggregate.view(), *ticks)
        }
    }
}

type CliAggregate<'conn> =
    GoalAggregate<SqliteGoalRepository<'conn>, SqliteSubtaskRepository<'conn>, SystemClock>;

fn load_for_subtask<'conn>(
    goals: SqliteGoalRepository<'conn>,
    subtasks: SqliteSubtaskRepository<'conn>,
    id: SubtaskId,
) -> Result<CliAggregate<'conn>> {
    let subtask = subtasks
        .get_subtask(id)?
        .ok_or_else(|| anyhow!("subtask not found: {id}"))?;
    Ok(GoalAggregate::load(
        goals,
        subtasks,
        SystemClock,
        subtask.goal_id,
    )?)
}

fn finish_checklist_write(
    aggregate: &mut CliAggregate<'_>,
    outcome: Result<(), SyncError>,
    json: bool,
) -> Result<()> {
    match outcome {
        Ok(()) => print_view(&aggregate.view(), json),
        Err(err) if err.requires_refresh() => {
            eprintln!("write failed: {err}; reloading authoritative order");
            aggregate.refresh()?;
            print_view(&aggregate.view(), json)?;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

fn report_transition(transition: TimerTransition) {
    match transition {
        TimerTransition::Started { .. } => println!("timer started"),
        TimerTransition::Stopped {
            total_time_seconds,
            interval_seconds,
        } => println!(
            "timer stopped: +{} (total {})",
            format_duration(interval_seconds),
            format_duration(total_time_seconds)
        ),
        TimerTransition::Unchanged(phase) => println!("timer already {phase:?}"),
    }
}

fn print_view(view: &GoalView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    println!(
        "#{} {}{}",
        view.goal.id,
        view.goal.title,
        if view.goal.is_complete { " (complete)" } else { "" }
    );
    println!(
        "timer {:?} {}",
        view.timer_phase,
        format_duration(view.elapsed_seconds)
    );
    println!(
        "subtasks {}/{}",
        view.completed_subtasks,
        view.subtasks.len()
    );
    for subtask in &view.subtasks {
        println!(
            "  {} [{}] {} {}",
            subtask.sort_order,
            if subtask.is_complete { "x" } else { " " },
            subtask.id,
            subtask.text
        );
    }
    Ok(())
}

fn watch(view: &GoalView, ticks: u64) -> Result<()> {
    let started_at = view.goal.timer_started_at;
    let total = view.goal.total_time_seconds;
    let (done_tx, done_rx) = mpsc::channel::<()>();

    println!("{}", format_duration(view.elapsed_seconds));
    let ticker = DisplayTicker::spawn(DISPLAY_TICK, move |tick| {
        let now_ms = resolution_core::Clock::now_ms(&SystemClock);
        println!(
            "{}",
            format_duration(resolution_core::elapsed_seconds(started_at, total, now_ms))
        );
        if tick >= ticks {
            let _ = done_tx.send(());
            return TickControl::Stop;
        }
        TickControl::Continue
    })?;

    if ticks > 0 {
        let _ = done_rx.recv();
    }
    ticker.cancel();
    Ok(())
}

fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
}
