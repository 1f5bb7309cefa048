mod init;
pub use init::cmd_init;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::store::JsonStore;
use crate::io::watcher::TaskFileWatcher;
use crate::io::workspace;
use crate::model::config::AppConfig;
use crate::model::message::{Command, NewTask, PanelEvent, Response};
use crate::model::task::Task;
use crate::ops::order;
use crate::ops::task_ops;
use crate::reminder::clock::{Clock, SystemClock};
use crate::service::{MoveTo, TaskService};
use crate::util::time::parse_when;

type CmdResult = Result<(), Box<dyn Error>>;

/// Quiet period after a task file change before reloading
const WATCH_SETTLE: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let dir = cli.workspace_dir.as_deref();
    let ws = || open_workspace(dir);

    match cli.command {
        // Runs before any workspace exists
        Commands::Init => cmd_init(dir),

        // Read commands
        Commands::List(args) => cmd_list(&ws()?, args, json).await,
        Commands::Show(args) => cmd_show(&ws()?, args, json).await,
        Commands::Stats => cmd_stats(&ws()?, json).await,
        Commands::Settings(args) => cmd_settings(&ws()?, args, json).await,
        Commands::Config(args) => cmd_config(&ws()?, args, json),

        // Write commands
        Commands::Add(args) => cmd_add(&ws()?, args, json).await,
        Commands::Status(args) => {
            let svc = open_service(&ws()?, false);
            svc.update_status(&args.id, args.status).await?;
            print_task(&svc, &args.id, json).await
        }
        Commands::Priority(args) => {
            let svc = open_service(&ws()?, false);
            svc.update_priority(&args.id, args.priority).await?;
            print_task(&svc, &args.id, json).await
        }
        Commands::Title(args) => {
            let svc = open_service(&ws()?, false);
            svc.update_text(&args.id, &args.text).await?;
            print_task(&svc, &args.id, json).await
        }
        Commands::Describe(args) => {
            let svc = open_service(&ws()?, false);
            svc.update_description(&args.id, &args.text).await?;
            print_task(&svc, &args.id, json).await
        }
        Commands::Due(args) => cmd_due(&ws()?, args, json).await,
        Commands::Remind(args) => cmd_remind(&ws()?, args, json).await,
        Commands::Mv(args) => cmd_mv(&ws()?, args, json).await,
        Commands::Rm(args) => cmd_rm(&ws()?, args, json).await,
        Commands::Sub(args) => cmd_sub(&ws()?, args, json).await,

        // Hosts
        Commands::Apply => cmd_apply(&ws()?).await,
        Commands::Watch => cmd_watch(&ws()?, json).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Workspace {
    data_dir: PathBuf,
    config: AppConfig,
}

fn start_dir(dir: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    match dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

fn open_workspace(dir: Option<&str>) -> Result<Workspace, Box<dyn Error>> {
    let data_dir = workspace::discover_workspace(&start_dir(dir)?)?;
    let config = config_io::load_config(&data_dir)?;
    Ok(Workspace { data_dir, config })
}

/// Log filter for this invocation: the workspace's `log.level`, or `warn`
/// outside a workspace or when the config cannot be read.
pub fn log_directive(dir: Option<&str>) -> String {
    open_workspace(dir)
        .map(|ws| ws.config.log.level)
        .unwrap_or_else(|_| "warn".to_string())
}

/// Build the task service. Only `tp watch` keeps the reminder scheduler
/// running; for every other command it is stopped before any await, so a
/// short-lived command never consumes a due reminder.
fn open_service(ws: &Workspace, reminders: bool) -> TaskService {
    let store = Arc::new(JsonStore::new(&ws.data_dir));
    let service = TaskService::new(store, Arc::new(SystemClock), ws.config.clone());
    if !reminders {
        service.dispose();
    }
    service
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_task(svc: &TaskService, id: &str, json: bool) -> CmdResult {
    if !json {
        return Ok(());
    }
    let tasks = svc.get_tasks().await?;
    let task = task_ops::find_task(&tasks, id).ok_or_else(|| format!("task not found: {}", id))?;
    print_json(task)
}

fn parse_times(inputs: &[String]) -> Result<Vec<i64>, Box<dyn Error>> {
    let now = SystemClock.now_ms();
    Ok(inputs
        .iter()
        .map(|s| parse_when(s, now))
        .collect::<Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

async fn cmd_list(ws: &Workspace, args: ListArgs, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let mut settings = svc.get_settings(args.view).await?;
    if let Some(group_by) = args.group_by {
        settings.group_by = group_by;
    }
    if let Some(sort) = args.sort {
        settings.sort_by = sort;
    }
    let hide_completed = settings.hide_completed && !args.all;

    let tasks: Vec<Task> = svc
        .get_tasks()
        .await?
        .into_iter()
        .filter(|t| is_visible(t, hide_completed))
        .collect();
    let sections = order::sections(&tasks, settings.group_by, settings.sort_by);
    let is_collapsed = |label: &str| settings.collapsed_sections.iter().any(|s| s == label);

    if json {
        let out: Vec<SectionJson> = sections
            .into_iter()
            .map(|(group, tasks)| SectionJson {
                group: group.label(),
                collapsed: is_collapsed(group.label()),
                tasks,
            })
            .collect();
        return print_json(&out);
    }

    let mut first = true;
    for (group, members) in sections {
        if members.is_empty() {
            continue;
        }
        if !first {
            println!();
        }
        first = false;
        for line in format_section(group, &members, is_collapsed(group.label())) {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn cmd_show(ws: &Workspace, args: ShowArgs, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let tasks = svc.get_tasks().await?;
    let task = task_ops::find_task(&tasks, &args.id)
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    if json {
        return print_json(task);
    }
    for line in format_task_detail(task) {
        println!("{}", line);
    }
    Ok(())
}

async fn cmd_stats(ws: &Workspace, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let stats = svc.statistics().await?;
    if json {
        print_json(&stats_to_json(&stats, &ws.config.stats))
    } else {
        println!("{}", format_stats(&stats, &ws.config.stats));
        Ok(())
    }
}

async fn cmd_settings(ws: &Workspace, args: SettingsArgs, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let mut settings = svc.get_settings(args.view).await?;

    if args.has_changes() {
        if let Some(mode) = args.mode {
            settings.view_mode = mode;
        }
        if let Some(group_by) = args.group_by {
            settings.group_by = group_by;
        }
        if let Some(sort) = args.sort {
            settings.sort_by = sort;
        }
        if let Some(hide) = args.hide_completed {
            settings.hide_completed = hide;
        }
        settings.collapsed_sections.retain(|s| !args.expand.contains(s));
        for section in args.collapse {
            if !settings.collapsed_sections.contains(&section) {
                settings.collapsed_sections.push(section);
            }
        }
        svc.save_settings(args.view, settings.clone()).await?;
    }

    if json {
        return print_json(&settings);
    }
    for line in format_settings(&settings) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_config(ws: &Workspace, args: ConfigCmd, json: bool) -> CmdResult {
    match args.action {
        None => {
            if json {
                print_json(&ws.config)
            } else {
                print!("{}", toml::to_string_pretty(&ws.config)?);
                Ok(())
            }
        }
        Some(ConfigAction::Set { key, value }) => {
            let (_, mut doc) = config_io::read_config(&ws.data_dir)?;
            config_io::set_config_value(&mut doc, &key, &value)?;
            config_io::write_config(&ws.data_dir, &doc)?;
            tracing::info!(%key, %value, "config updated");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

async fn cmd_add(ws: &Workspace, args: AddArgs, json: bool) -> CmdResult {
    let due_date = match args.due {
        Some(ref due) => parse_times(std::slice::from_ref(due))?.pop(),
        None => None,
    };
    let reminders = parse_times(&args.remind)?;

    let svc = open_service(ws, false);
    let task = svc
        .add_task(NewTask {
            text: args.text,
            priority: args.priority,
            status: args.status,
            description: args.description,
            due_date,
            reminders,
        })
        .await?;

    if json {
        print_json(&task)
    } else {
        println!("{}", task.id);
        Ok(())
    }
}

async fn cmd_due(ws: &Workspace, args: DueArgs, json: bool) -> CmdResult {
    let due_date = match args.when {
        Some(ref when) if !args.clear => parse_times(std::slice::from_ref(when))?.pop(),
        _ => None,
    };
    let svc = open_service(ws, false);
    svc.update_due_date(&args.id, due_date).await?;
    print_task(&svc, &args.id, json).await
}

async fn cmd_remind(ws: &Workspace, args: RemindArgs, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    if args.clear {
        svc.update_reminders(&args.id, Vec::new()).await?;
    } else {
        svc.add_reminders(&args.id, &parse_times(&args.when)?).await?;
    }
    print_task(&svc, &args.id, json).await
}

async fn cmd_mv(ws: &Workspace, args: MvArgs, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let to = MoveTo {
        group_by: args.group_by,
        status: args.status,
        priority: args.priority,
        before: args.before,
    };
    svc.move_task(&args.id, &to).await?;
    print_task(&svc, &args.id, json).await
}

async fn cmd_rm(ws: &Workspace, args: RmArgs, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let task = svc.delete_task(&args.id).await?;
    if json {
        return print_json(&task);
    }
    Ok(())
}

async fn cmd_sub(ws: &Workspace, args: SubCmd, json: bool) -> CmdResult {
    let svc = open_service(ws, false);
    let task_id = match args.action {
        SubAction::Add { task, text } => {
            let id = svc.add_subtask(&task, &text).await?;
            if !json {
                println!("{}", id);
            }
            task
        }
        SubAction::Toggle { task, sub } => {
            let completed = svc.toggle_subtask(&task, &sub).await?;
            if !json {
                println!("{}", if completed { "done" } else { "open" });
            }
            task
        }
        SubAction::Title { task, sub, text } => {
            svc.update_subtask_text(&task, &sub, &text).await?;
            task
        }
        SubAction::Rm { task, sub } => {
            svc.delete_subtask(&task, &sub).await?;
            task
        }
    };
    print_task(&svc, &task_id, json).await
}

// ---------------------------------------------------------------------------
// Hosts
// ---------------------------------------------------------------------------

/// One JSON command per stdin line, one JSON response per stdout line.
async fn cmd_apply(ws: &Workspace) -> CmdResult {
    let svc = open_service(ws, false);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Command>(&line) {
            Ok(command) => svc.handle(command).await,
            Err(e) => {
                tracing::warn!(error = %e, "rejected malformed command");
                Response::Error {
                    message: format!("invalid command: {}", e),
                }
            }
        };
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}

/// Own the reminder scheduler until interrupted. Reminders are printed as
/// they come due; with `--json` every panel event is printed as one line.
async fn cmd_watch(ws: &Workspace, json: bool) -> CmdResult {
    let svc = open_service(ws, true);
    let mut events = svc.subscribe();
    let mut watcher = TaskFileWatcher::start(&ws.data_dir)?;
    // last collection broadcast here; a file change matching it is our own write
    let mut known = svc.get_tasks().await?;
    tracing::info!(dir = %ws.data_dir.display(), "watching for reminders");

    loop {
        tokio::select! {
            // events first, so `known` is current before a file change is judged
            biased;
            event = events.recv() => match event {
                Ok(event) => {
                    if let PanelEvent::TasksChanged { tasks } = &event {
                        known = tasks.clone();
                    }
                    print_event(&event, json)?;
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            changed = watcher.changed(WATCH_SETTLE) => match changed {
                Some(path) => match svc.reload_if_changed(&known).await {
                    Ok(Some(_)) => tracing::debug!(path = %path.display(), "task file changed"),
                    Ok(None) => tracing::trace!("ignoring own write"),
                    Err(e) => tracing::error!(error = %e, "could not reload tasks"),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    svc.dispose();
    svc.scheduler().stopped().await;
    tracing::info!("stopped");
    Ok(())
}

fn print_event(event: &PanelEvent, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else if let PanelEvent::ReminderDue { task, reminders } = event {
        println!("{}", format_reminder(task, reminders));
    }
    Ok(())
}
