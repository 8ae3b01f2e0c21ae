//! Command execution for the CLI.
//!
//! This module handles choosing a store, running commands through the view
//! controller, and producing output.

use crate::cli::{shell, Cli, Command};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::tasks::{RestTaskStore, SqliteTaskStore, TaskId, TaskStore};
use crate::templates;
use crate::view::{self, is_submittable, TaskList, TaskListState, ViewModel, MIN_TASK_LEN};
use std::path::Path;
use std::process::ExitCode;
use tera::Context;
use tokio::io::BufReader;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

/// Run a CLI command from the current directory.
pub async fn run(cli: Cli) -> CliOutput {
    match std::env::current_dir() {
        Ok(cwd) => run_in(cli, &cwd).await,
        Err(e) => error_output(format!("Cannot determine current directory: {e}")),
    }
}

/// Run a CLI command, resolving `.env` and `mytodo.yaml` relative to `base_dir`.
pub async fn run_in(cli: Cli, base_dir: &Path) -> CliOutput {
    if let Some(dir) = &cli.templates {
        if let Err(e) = templates::init_templates(Some(dir)) {
            return error_output(e.to_string());
        }
    }

    if !cli.command.needs_store() {
        return run_version();
    }

    let (store, notices) = match open_store(&cli, base_dir) {
        Ok(opened) => opened,
        Err(e) => return error_output(format!("Error opening task store: {e}")),
    };
    let list = TaskList::new(store);

    let mut output = match cli.command {
        Command::Shell => run_shell_cmd(list).await,
        command => run_one_shot(&list, command, cli.json).await,
    };
    output.stderr.splice(0..0, notices);
    output
}

/// Choose the task store for a command line.
///
/// `--sqlite` selects the local database. Otherwise the remote store is
/// configured from `.env`, the config file, and the environment. An
/// incomplete configuration is reported in the returned notices but does
/// not stop the store from being created.
///
/// # Errors
///
/// Returns an error if the config file or the local database cannot be opened.
pub fn open_store(cli: &Cli, base_dir: &Path) -> Result<(Box<dyn TaskStore>, Vec<String>)> {
    if let Some(path) = &cli.sqlite {
        tracing::debug!(path = %path.display(), "using local task database");
        return Ok((Box::new(SqliteTaskStore::open(path)?), Vec::new()));
    }

    let config = StoreConfig::resolve(cli.config.as_deref(), base_dir)?;
    tracing::debug!(?config, "resolved store configuration");

    let mut notices = Vec::new();
    if !config.warn_if_incomplete() {
        let config_path =
            cli.config.clone().unwrap_or_else(|| StoreConfig::config_path(base_dir));
        let mut context = Context::new();
        context.insert("missing", &config.missing());
        context.insert("config_path", &config_path.display().to_string());
        notices.push(templates::render("messages/not_configured.tera", &context)?);
    }

    Ok((Box::new(RestTaskStore::new(&config)?), notices))
}

// === Commands ===

fn run_version() -> CliOutput {
    success_output(format!("mytodo v{}", crate::VERSION))
}

async fn run_shell_cmd<S: TaskStore + 'static>(list: TaskList<S>) -> CliOutput {
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    match shell::run_shell(list, input, &mut output).await {
        Ok(()) => CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr: vec![] },
        Err(e) => error_output(format!("Shell error: {e}")),
    }
}

async fn run_one_shot<S: TaskStore>(list: &TaskList<S>, command: Command, json: bool) -> CliOutput {
    if let Command::Add { text } | Command::Edit { text, .. } = &command {
        if !is_submittable(text) {
            return error_output(format!(
                "Task text must be at least {MIN_TASK_LEN} characters long"
            ));
        }
    }

    list.load().await;

    match command {
        Command::List { hide_completed } => {
            if hide_completed {
                list.toggle_show_completed();
            }
        }
        Command::Add { text } => {
            list.set_input(text);
            list.submit().await;
        }
        Command::Edit { id, text } => {
            let id = TaskId::new(id);
            if let Some(output) = require_task(list, &id, json) {
                return output;
            }
            list.begin_edit(&id);
            list.set_input(text);
            list.submit().await;
        }
        Command::Toggle { id } => {
            let id = TaskId::new(id);
            if let Some(output) = require_task(list, &id, json) {
                return output;
            }
            list.toggle_completion(&id).await;
        }
        Command::Delete { id } => {
            let id = TaskId::new(id);
            if let Some(output) = require_task(list, &id, json) {
                return output;
            }
            list.delete(&id).await;
        }
        Command::Shell | Command::Version => {}
    }

    view_output(&list.snapshot(), json)
}

/// Check that a task is in the loaded list.
///
/// Returns the output to print instead of running the command: the view,
/// if loading failed, or a not-found message.
fn require_task<S: TaskStore>(list: &TaskList<S>, id: &TaskId, json: bool) -> Option<CliOutput> {
    let state = list.snapshot();
    if state.find(id).is_some() {
        return None;
    }
    if state.error_message.is_some() {
        return Some(view_output(&state, json));
    }
    Some(error_output(format!("Task not found: {id}")))
}

// === Output helpers ===

fn view_output(state: &TaskListState, json: bool) -> CliOutput {
    let rendered = if json {
        serde_json::to_string_pretty(&ViewModel::from_state(state)).map_err(Error::from)
    } else {
        view::render(state)
    };

    let exit_code =
        if state.error_message.is_some() { ExitCode::from(1) } else { ExitCode::SUCCESS };
    match rendered {
        Ok(text) => CliOutput { exit_code, stdout: vec![text], stderr: vec![] },
        Err(e) => error_output(e.to_string()),
    }
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn error_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
}
