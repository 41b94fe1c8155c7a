use clap::Parser;
use clap::error::ErrorKind;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskview_cli::cli::{Cli, Command, ListArgs, collect_overrides};
use taskview_core::board::TaskBoard;
use taskview_core::config::{ClientConfig, load_config_with_fallback, merge_overrides};
use taskview_core::error::AppError;
use taskview_core::model::Task;
use taskview_core::notify::LogNotifier;
use taskview_core::remote::Table as RemoteTable;
use taskview_core::remote::memory::MemoryRowStore;
use taskview_core::storage::token_store::{
    JsonTokenStore, TokenStorage, purge_auth_artifacts, token_store_path,
};
use taskview_core::task_store::{TaskStore, format_instant, parse_instant};
use taskview_core::view::{TaskView, local_offset, now_in};
use time::{OffsetDateTime, UtcOffset};
use time::macros::format_description;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const SNAPSHOT_OWNER: &str = "snapshot";

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    tasks: Vec<Value>,
    #[serde(default)]
    categories: Vec<Value>,
}

#[derive(Tabled)]
struct TaskLine {
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Category")]
    category: String,
}

fn init_tracing(fallback_level: &str) {
    // RUST_LOG wins; an invalid value falls back to the configured level.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .or_else(|| EnvFilter::try_new(fallback_level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation("command", message)
}

fn load_snapshot(path: &Path) -> Result<Snapshot, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid snapshot {}: {}", path.display(), err))
    })
}

fn format_due(task: &Task, now: OffsetDateTime) -> String {
    let Some(due) = task.due_date else {
        return "-".to_string();
    };
    due.to_offset(now.offset())
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| due.to_string())
}

fn task_lines(board: &TaskBoard<MemoryRowStore>, tasks: &[Task], now: OffsetDateTime) -> Vec<TaskLine> {
    tasks
        .iter()
        .map(|task| TaskLine {
            title: task.title.clone(),
            priority: task.priority.as_str().to_string(),
            status: if task.completed { "completed" } else { "pending" }.to_string(),
            due: format_due(task, now),
            category: board
                .category_for(task)
                .map(|category| category.name.clone())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

fn print_view_plain(board: &TaskBoard<MemoryRowStore>, view: &TaskView, now: OffsetDateTime) {
    if let Some(empty) = board.empty_state(view) {
        println!("{}", empty.title());
        println!("{}", empty.description());
        return;
    }

    for (index, group) in view.groups().iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("{}", group.label);
        let mut table = Table::new(task_lines(board, &group.tasks, now));
        table.with(Style::rounded());
        println!("{table}");
    }
}

fn task_json(board: &TaskBoard<MemoryRowStore>, task: &Task) -> Result<Value, AppError> {
    let due_date = task.due_date.map(format_instant).transpose()?;
    Ok(serde_json::json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "priority": task.priority,
        "completed": task.completed,
        "due_date": due_date,
        "category": board.category_for(task).map(|category| serde_json::json!({
            "id": category.id,
            "name": category.name,
            "color": category.color,
        })),
    }))
}

fn print_view_json(board: &TaskBoard<MemoryRowStore>, view: &TaskView) -> Result<(), AppError> {
    let mut groups = Vec::with_capacity(view.groups().len());
    for group in view.groups() {
        let tasks = group
            .tasks
            .iter()
            .map(|task| task_json(board, task))
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(serde_json::json!({
            "label": group.label,
            "tasks": tasks,
        }));
    }

    let empty_state = board.empty_state(view).map(|empty| {
        serde_json::json!({
            "title": empty.title(),
            "description": empty.description(),
            "action": empty.action_label(),
        })
    });

    println!(
        "{}",
        serde_json::json!({
            "groups": groups,
            "empty_state": empty_state,
        })
    );
    Ok(())
}

fn run_list(args: &ListArgs, offset: UtcOffset, json: bool) -> Result<(), AppError> {
    let path = args.snapshot.as_ref().ok_or_else(|| {
        AppError::validation(
            "snapshot",
            "snapshot file is required (--snapshot or TASKVIEW_SNAPSHOT_PATH)",
        )
    })?;
    let criteria = args.criteria()?;
    let now = match args.now.as_deref() {
        Some(raw) => parse_instant("now", raw)?,
        None => now_in(offset),
    };

    let snapshot = load_snapshot(path)?;
    tracing::debug!(
        tasks = snapshot.tasks.len(),
        categories = snapshot.categories.len(),
        "loaded snapshot"
    );
    let remote = MemoryRowStore::new(SNAPSHOT_OWNER);
    remote.seed(RemoteTable::Tasks, snapshot.tasks);
    remote.seed(RemoteTable::Categories, snapshot.categories);

    let mut board = TaskBoard::new(TaskStore::new(remote), Arc::new(LogNotifier));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|err| AppError::io(err.to_string()))?;
    runtime.block_on(board.refresh())?;
    board.set_criteria(criteria);

    let view = board.view(now);
    if json {
        print_view_json(&board, &view)
    } else {
        print_view_plain(&board, &view, now);
        Ok(())
    }
}

fn run_purge(store: Option<PathBuf>, config: &ClientConfig, json: bool) -> Result<(), AppError> {
    let path = match store {
        Some(path) => path,
        None => token_store_path()?,
    };
    let store = JsonTokenStore::new(path);
    let storages: [&dyn TokenStorage; 1] = [&store];
    let report = purge_auth_artifacts(&storages, &config.token_key_rules());

    if let Some(err) = report.failures.into_iter().next() {
        return Err(err);
    }

    if json {
        println!("{}", serde_json::json!({ "removed": report.removed }));
    } else if report.removed.is_empty() {
        println!("No cached auth tokens found");
    } else {
        for key in &report.removed {
            println!("Removed {key}");
        }
    }
    Ok(())
}

fn run_command(cli: Cli, config: &ClientConfig, offset: UtcOffset) -> Result<(), AppError> {
    match cli.command {
        Command::List(args) => run_list(&args, offset, cli.json),
        Command::PurgeTokens { store } => run_purge(store, config, cli.json),
    }
}

fn resolve_config(cli: &Cli) -> Result<(ClientConfig, Option<AppError>), AppError> {
    let loaded = load_config_with_fallback();
    let overrides = collect_overrides(&cli.config_override)?;
    let config = merge_overrides(&loaded.config, &overrides)?;
    Ok((config, loaded.error))
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let (config, load_error) = match resolve_config(&cli) {
        Ok(resolved) => resolved,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);
    if let Some(err) = load_error {
        tracing::warn!(error = %err, "using default configuration");
    }
    // Read while still single-threaded; the runtime comes later.
    let offset = local_offset();

    if let Err(err) = run_command(cli, &config, offset) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
