//! Interactive shell over a task list view.
//!
//! Reads one command per line. Local changes are applied as soon as a
//! command is read. Store calls are spawned, so the shell keeps reading
//! while they are in flight; `wait` blocks until they are done.
//! End of input waits for outstanding calls and prints the final view;
//! `quit` tears the view down immediately.

use crate::error::Result;
use crate::tasks::{TaskId, TaskStore};
use crate::templates;
use crate::view::{self, TaskList, MIN_TASK_LEN};
use std::future::Future;
use tera::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::{JoinError, JoinSet};

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Replace the input text.
    Type(String),
    /// Submit the input.
    Save,
    /// Start editing a task.
    Edit(TaskId),
    /// Stop editing.
    Cancel,
    /// Flip a task's completion flag.
    Toggle(TaskId),
    /// Delete a task.
    Delete(TaskId),
    /// Show or hide finished tasks.
    Filter,
    /// Reload the list.
    Refresh,
    /// Print the view.
    Show,
    /// Wait for outstanding calls, then print the view.
    Wait,
    /// Print the command list.
    Help,
    /// Leave the shell.
    Quit,
}

/// Parse one input line.
///
/// Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// Returns a message for unknown commands or missing arguments.
pub fn parse_line(line: &str) -> std::result::Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) =
        line.split_once(char::is_whitespace).map_or((line, ""), |(w, r)| (w, r.trim_start()));
    let id = |usage: &str| {
        rest.split_whitespace().next().map(TaskId::new).ok_or_else(|| format!("usage: {usage}"))
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "type" => ShellCommand::Type(rest.to_string()),
        "save" => ShellCommand::Save,
        "edit" => ShellCommand::Edit(id("edit <id>")?),
        "cancel" => ShellCommand::Cancel,
        "toggle" => ShellCommand::Toggle(id("toggle <id>")?),
        "delete" => ShellCommand::Delete(id("delete <id>")?),
        "filter" => ShellCommand::Filter,
        "refresh" => ShellCommand::Refresh,
        "show" => ShellCommand::Show,
        "wait" => ShellCommand::Wait,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => return Err(format!("unknown command: {word} (type `help` for a list)")),
    };
    Ok(Some(command))
}

/// Run the shell until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if reading input, writing output, or rendering fails.
pub async fn run_shell<S, R, W>(list: TaskList<S>, input: R, output: &mut W) -> Result<()>
where
    S: TaskStore + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pending = JoinSet::new();
    say(output, "mytodo shell. Type `help` for commands.").await?;
    spawn(&mut pending, list.start_load());

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                say(output, &message).await?;
                continue;
            }
        };

        if command == ShellCommand::Quit {
            list.deactivate();
            pending.abort_all();
            return Ok(());
        }
        handle(&list, command, &mut pending, output).await?;

        while let Some(joined) = pending.try_join_next() {
            log_join_error(joined);
        }
    }

    drain(&mut pending).await;
    show(&list, output).await?;
    list.deactivate();
    Ok(())
}

async fn handle<S, W>(
    list: &TaskList<S>,
    command: ShellCommand,
    pending: &mut JoinSet<()>,
    output: &mut W,
) -> Result<()>
where
    S: TaskStore + 'static,
    W: AsyncWrite + Unpin,
{
    match command {
        ShellCommand::Type(text) => list.set_input(text),
        ShellCommand::Save => {
            if list.snapshot().can_submit() {
                spawn(pending, list.start_submit());
            } else {
                say(output, &format!("type at least {MIN_TASK_LEN} characters first")).await?;
            }
        }
        ShellCommand::Edit(id) => {
            if list.begin_edit(&id) {
                say(output, &format!("editing {id}: {}", list.snapshot().input_text)).await?;
            } else {
                say(output, &format!("task not found: {id}")).await?;
            }
        }
        ShellCommand::Cancel => list.cancel_edit(),
        ShellCommand::Toggle(id) => {
            if list.snapshot().find(&id).is_some() {
                spawn(pending, list.start_toggle(&id));
            } else {
                say(output, &format!("task not found: {id}")).await?;
            }
        }
        ShellCommand::Delete(id) => {
            if list.snapshot().find(&id).is_some() {
                spawn(pending, list.start_delete(&id));
            } else {
                say(output, &format!("task not found: {id}")).await?;
            }
        }
        ShellCommand::Filter => {
            list.toggle_show_completed();
            let message = if list.snapshot().show_completed {
                "showing finished tasks"
            } else {
                "hiding finished tasks"
            };
            say(output, message).await?;
        }
        ShellCommand::Refresh => spawn(pending, list.start_load()),
        ShellCommand::Show => show(list, output).await?,
        ShellCommand::Wait => {
            drain(pending).await;
            show(list, output).await?;
        }
        ShellCommand::Help => {
            let mut context = Context::new();
            context.insert("submit_label", list.snapshot().submit_label());
            say(output, &templates::render("shell/help.tera", &context)?).await?;
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}

/// Spawn the store call of a command whose local change is already applied.
fn spawn<F>(pending: &mut JoinSet<()>, call: Option<F>)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Some(call) = call {
        pending.spawn(call);
    }
}

async fn drain(pending: &mut JoinSet<()>) {
    while let Some(joined) = pending.join_next().await {
        log_join_error(joined);
    }
}

fn log_join_error(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "store call task failed");
    }
}

async fn show<S: TaskStore, W: AsyncWrite + Unpin>(list: &TaskList<S>, output: &mut W) -> Result<()> {
    say(output, &view::render(&list.snapshot())?).await
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        output.write_all(b"\n").await?;
    }
    output.flush().await?;
    Ok(())
}
