//! pomobar - Pomodoro timer with daily goals
//!
//! "One tomato at a time."
//!
//! Usage:
//!   pomobar run [--start]             Run the timer in the foreground
//!   pomobar status [--json]           Show today's progress
//!   pomobar settings                  Show durations and goal
//!   pomobar settings set KEY VALUE    Change a setting
//!   pomobar settings language CODE    Switch display language (en, fr)
//!   pomobar tasks [list]              Show the task list
//!   pomobar tasks add TEXT            Add a task
//!   pomobar tasks toggle N            Mark task N done / not done
//!   pomobar tasks delete N            Remove task N
//!   pomobar tasks clear               Remove finished tasks
//!   pomobar reset-day                 Zero today's completed count

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pomobar::labels::{self, Label, Language};
use pomobar::prefs::{JsonPreferenceStore, SettingKey, Settings, SettingsSnapshot};
use pomobar::{
    DailyProgress, EventBus, SessionTimer, TaskStore, TimerEvent, TimerHandle, TimerService,
};
use pomobar_core::{format, Config, Paths};

/// Pomobar - Pomodoro timer with daily goals and a task list
#[derive(Parser)]
#[command(name = "pomobar")]
#[command(about = "Pomodoro timer with daily goals and a task list")]
#[command(version)]
#[command(after_help = r#"CADENCE:
    Work sessions alternate with short breaks. Every Nth completed work
    session (default 4) is followed by a long break instead.

DEFAULTS:
    work 25 min, short break 5 min, long break 15 min, daily goal 8

WHILE RUNNING (type a command and press Enter):
    p        start / pause
    r        reset the current session
    s        skip to the next session
    g N      jump to N percent of the session
    d        reset today's count
    q        quit

ENVIRONMENT:
    POMOBAR_HOME    keep config and data under this directory instead

EXAMPLES:
    pomobar run --start             # Start a work session right away
    pomobar settings set work 50    # 50-minute work sessions
    pomobar settings set goal 6     # Aim for 6 sessions a day
    pomobar tasks add "Review PR"   # Add a task
    pomobar tasks toggle 1          # Tick it off
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer in the foreground
    #[command(alias = "r")]
    Run {
        /// Start the first session immediately
        #[arg(long)]
        start: bool,
    },

    /// Show today's progress and configured durations
    #[command(alias = "st")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Manage the task list
    #[command(alias = "t")]
    Tasks {
        #[command(subcommand)]
        action: Option<TaskAction>,
    },

    /// Reset today's completed session count to zero
    ResetDay,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Change a setting (work, short-break, long-break, sessions, goal)
    Set {
        key: String,
        value: i64,
    },

    /// Switch display language
    Language {
        /// Language code (en, fr)
        code: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List tasks
    #[command(alias = "ls")]
    List,

    /// Add a task
    Add {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Toggle a task between done and not done
    Toggle {
        /// Task number (as shown by `tasks list`)
        number: usize,
    },

    /// Delete a task
    #[command(alias = "rm")]
    Delete {
        /// Task number (as shown by `tasks list`)
        number: usize,
    },

    /// Remove all finished tasks
    Clear,
}

const HOME_ENV: &str = "POMOBAR_HOME";

// ANSI color codes
const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const BLUE: &str = "\x1b[0;34m";
const CYAN: &str = "\x1b[0;36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn session_color(session: pomobar::SessionType) -> &'static str {
    match session {
        pomobar::SessionType::Work => RED,
        pomobar::SessionType::ShortBreak => GREEN,
        pomobar::SessionType::LongBreak => BLUE,
    }
}

fn main() -> Result<()> {
    // Logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = resolve_paths();

    match cli.command {
        Some(Commands::Run { start }) => {
            let config = load_config(&paths)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cmd_run(&paths, &config, start))
        }
        Some(Commands::Status { json }) => cmd_status(&paths, json),
        Some(Commands::Settings { action }) => match action {
            None => cmd_settings_show(&paths),
            Some(SettingsAction::Set { key, value }) => cmd_settings_set(&paths, &key, value),
            Some(SettingsAction::Language { code }) => cmd_settings_language(&paths, &code),
        },
        Some(Commands::Tasks { action }) => cmd_tasks(&paths, action.unwrap_or(TaskAction::List)),
        Some(Commands::ResetDay) => cmd_reset_day(&paths),
        None => cmd_status(&paths, false),
    }
}

/// Standard paths, or everything under $POMOBAR_HOME when set
fn resolve_paths() -> Paths {
    match std::env::var_os(HOME_ENV) {
        Some(base) if !base.is_empty() => Paths::with_base(std::path::Path::new(&base)),
        _ => Paths::new(),
    }
}

/// Load the runtime config, writing the defaults on first use
fn load_config(paths: &Paths) -> Result<Config> {
    let path = paths.config_file();
    if path.exists() {
        return Config::load(&path);
    }

    let config = Config::default();
    config.save(&path)?;
    debug!(path = %path.display(), "wrote default config");
    Ok(config)
}

fn open_settings(paths: &Paths) -> Result<Settings<JsonPreferenceStore>> {
    let store = JsonPreferenceStore::open(&paths.preferences_file())?;
    Ok(Settings::new(store))
}

/// Run the timer until `q`, end of input, or Ctrl-C
async fn cmd_run(paths: &Paths, config: &Config, auto_start: bool) -> Result<()> {
    let bus = EventBus::new(config.event_capacity);
    let mut events = bus.subscribe();

    let timer = SessionTimer::new(open_settings(paths)?, bus);
    let (service, handle) = TimerService::new(timer, Duration::from_millis(config.tick_millis));
    let task = service.spawn();

    println!("{}", color(BOLD, "POMOBAR"));
    println!("{}", color(DIM, "p start/pause, r reset, s skip, g N jump, d reset day, q quit"));
    println!();

    if auto_start {
        handle.start().await?;
    } else {
        render(&handle).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if !dispatch(&handle, line.trim()).await? {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(TimerEvent::Updated) => render(&handle).await?,
                Ok(TimerEvent::SessionCompleted(kind)) => {
                    let lang = handle.snapshot().await?.language;
                    println!();
                    println!("\x07{}", color(GREEN, labels::completion_notice(lang, kind)));
                }
                Ok(TimerEvent::DailyGoalReached) => {
                    let lang = handle.snapshot().await?.language;
                    println!();
                    println!("{}", color(BOLD, labels::label(lang, Label::GoalReached)));
                    println!("{}", labels::label(lang, Label::GoalReachedMessage));
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "status line fell behind"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!();
    handle.shutdown().await?;
    task.await.context("Timer service panicked")?;
    Ok(())
}

/// Apply one line typed while running; false means quit
async fn dispatch(handle: &TimerHandle, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        handle.toggle().await?;
        return Ok(true);
    };

    match word {
        "p" | "pause" | "start" => handle.toggle().await?,
        "r" | "reset" => handle.reset().await?,
        "s" | "skip" => handle.skip().await?,
        "d" | "reset-day" => handle.reset_day().await?,
        "g" | "goto" => match parts.next().and_then(|n| n.parse::<f64>().ok()) {
            Some(percent) => handle.set_progress(percent / 100.0).await?,
            None => println!("\n{} usage: g <0-100>", color(CYAN, "[info]")),
        },
        "q" | "quit" | "exit" => return Ok(false),
        other => println!("\n{} unknown command: {}", color(CYAN, "[info]"), other),
    }

    Ok(true)
}

/// Redraw the status line in place
async fn render(handle: &TimerHandle) -> Result<()> {
    let snap = handle.snapshot().await?;
    let progress = snap.daily_progress();

    let line = format!(
        "{}  {}  [{}]  {}",
        color(&format!("{}{}", BOLD, session_color(snap.session_type)), &snap.status_title),
        labels::session_name(snap.language, snap.session_type),
        format::progress_bar(snap.progress, 20),
        progress.headline(snap.language),
    );

    let mut stdout = std::io::stdout();
    if use_colors() {
        write!(stdout, "\r\x1b[2K{}", line)?;
    } else {
        writeln!(stdout, "{}", line)?;
    }
    stdout.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    date: String,
    completed_today: u32,
    progress: DailyProgress,
    settings: SettingsSnapshot,
}

/// Show today's progress
fn cmd_status(paths: &Paths, json: bool) -> Result<()> {
    let mut settings = open_settings(paths)?;
    let completed = settings.completed_today();
    let snapshot = settings.snapshot();
    let progress = DailyProgress::new(completed, snapshot.daily_goal);

    if json {
        let report = StatusReport {
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            completed_today: completed,
            progress,
            settings: snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let lang = snapshot.language;
    println!("{}", color(BOLD, "TODAY"));
    println!();
    println!(
        "  {} [{}] {}",
        color(CYAN, "Goal:"),
        format::progress_bar(progress.fraction(), 20),
        progress.headline(lang)
    );
    println!("  {}", progress.detail(lang));
    println!();
    print_settings(&snapshot);

    Ok(())
}

fn print_settings(snapshot: &SettingsSnapshot) {
    println!(
        "  {}        {}",
        color(CYAN, "Work:"),
        format::minutes(snapshot.work_minutes.into())
    );
    println!(
        "  {} {}",
        color(CYAN, "Short break:"),
        format::minutes(snapshot.short_break_minutes.into())
    );
    println!(
        "  {}  {}",
        color(CYAN, "Long break:"),
        format::minutes(snapshot.long_break_minutes.into())
    );
    println!(
        "  {}  every {} sessions",
        color(CYAN, "Long after:"),
        snapshot.sessions_until_long_break
    );
    println!("  {}  {} sessions", color(CYAN, "Daily goal:"), snapshot.daily_goal);
    println!(
        "  {}    {}",
        color(CYAN, "Language:"),
        snapshot.language.display_name()
    );
}

/// Show all settings with their accepted ranges
fn cmd_settings_show(paths: &Paths) -> Result<()> {
    let settings = open_settings(paths)?;

    println!("{}", color(BOLD, "SETTINGS"));
    println!();
    print_settings(&settings.snapshot());
    println!();
    println!("{}", color(DIM, "Ranges:"));
    for key in SettingKey::ALL {
        let (min, max) = key.bounds();
        println!(
            "  {:<24} {}-{} (default {})",
            key.name(),
            min,
            max,
            key.default_value()
        );
    }

    Ok(())
}

/// Change one setting
fn cmd_settings_set(paths: &Paths, key: &str, value: i64) -> Result<()> {
    let key: SettingKey = key.parse()?;
    let mut settings = open_settings(paths)?;
    settings.set(key, value)?;

    println!("{} {} = {}", color(GREEN, "[ok]"), key.name(), value);
    Ok(())
}

fn cmd_settings_language(paths: &Paths, code: &str) -> Result<()> {
    let language: Language = match code.parse() {
        Ok(language) => language,
        Err(e) => bail!(e),
    };
    let mut settings = open_settings(paths)?;
    settings.set_language(language)?;

    println!("{} Language: {}", color(GREEN, "[ok]"), language.display_name());
    Ok(())
}

/// Convert a 1-based task number to an index
fn task_index(number: usize) -> Result<usize> {
    if number == 0 {
        bail!("Task numbers start at 1");
    }
    Ok(number - 1)
}

fn cmd_tasks(paths: &Paths, action: TaskAction) -> Result<()> {
    let mut store = TaskStore::open(&paths.tasks_file())?;

    match action {
        TaskAction::List => {
            if store.is_empty() {
                println!("No tasks");
                println!();
                println!("Add one with: pomobar tasks add <text>");
                return Ok(());
            }

            println!(
                "{} ({} open)",
                color(BOLD, "TASKS"),
                store.pending_count()
            );
            println!();
            for (i, task) in store.tasks().iter().enumerate() {
                let text = format::truncate(&task.text, 60);
                if task.done {
                    println!("  {:>2}. [x] {}", i + 1, color(DIM, &text));
                } else {
                    println!("  {:>2}. [ ] {}", i + 1, text);
                }
            }
        }
        TaskAction::Add { text } => {
            let text = text.join(" ");
            if store.add(&text)? {
                println!("{} Added task #{}", color(GREEN, "[ok]"), store.len());
            } else {
                println!("{} Nothing to add", color(CYAN, "[info]"));
            }
        }
        TaskAction::Toggle { number } => {
            if store.toggle(task_index(number)?)? {
                println!("{} Toggled task #{}", color(GREEN, "[ok]"), number);
            } else {
                println!("{} No task #{}", color(CYAN, "[info]"), number);
            }
        }
        TaskAction::Delete { number } => {
            if store.delete(task_index(number)?)? {
                println!("{} Deleted task #{}", color(GREEN, "[ok]"), number);
            } else {
                println!("{} No task #{}", color(CYAN, "[info]"), number);
            }
        }
        TaskAction::Clear => {
            let removed = store.clear_completed()?;
            println!("{} Removed {} finished task(s)", color(GREEN, "[ok]"), removed);
        }
    }

    Ok(())
}

fn cmd_reset_day(paths: &Paths) -> Result<()> {
    let mut settings = open_settings(paths)?;
    settings.set_completed_today(0)?;

    println!("{} Today's count reset to 0", color(GREEN, "[ok]"));
    Ok(())
}
