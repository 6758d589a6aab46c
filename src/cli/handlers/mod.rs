use std::sync::Arc;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::controller::{Control, TaskController};
use crate::gateway::{BoardError, RestStore, TaskGateway};
use crate::model::config::{BoardConfig, SessionConfig};
use crate::model::task::Identity;

type CmdResult = Result<String, Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Open the board against the configured store and run one command.
pub async fn dispatch(cli: Cli, config: &BoardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let identity = session_identity(&config.session)?;
    let store = RestStore::new(&config.store)?;
    let mut ctl = TaskController::new(Arc::new(store), config.paging);
    ctl.activate(Some(identity)).await?;

    let output = run_command(&mut ctl, cli.command, cli.json).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

/// Run a command against an activated controller and return what to print.
pub async fn run_command<G: TaskGateway + ?Sized>(
    ctl: &mut TaskController<G>,
    command: Commands,
    json: bool,
) -> CmdResult {
    match command {
        Commands::List(args) => cmd_list(ctl, args, json).await,
        Commands::Add(args) => cmd_add(ctl, args, json).await,
        Commands::Done(args) => cmd_toggle(ctl, args, true, json).await,
        Commands::Reopen(args) => cmd_toggle(ctl, args, false, json).await,
        Commands::Edit(args) => cmd_edit(ctl, args, json).await,
        Commands::Rm(args) => cmd_rm(ctl, args, json).await,
        Commands::Stats => cmd_stats(ctl, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The identity configured for this run. The CLI has no sign-in flow of
/// its own; the user id comes from `[session]`.
fn session_identity(session: &SessionConfig) -> Result<Identity, BoardError> {
    let id = session
        .user_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(BoardError::not_authenticated)?;
    Ok(Identity::new(id, session.email.clone().unwrap_or_default()))
}

fn join_title(words: &[String]) -> String {
    words.join(" ")
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_list<G: TaskGateway + ?Sized>(
    ctl: &mut TaskController<G>,
    args: ListArgs,
    json: bool,
) -> CmdResult {
    let mut controls = vec![
        Control::Search(args.search.unwrap_or_default()),
        Control::Status(args.status),
        Control::Sort(args.sort),
        Control::Page(args.page),
    ];
    if args.expand {
        controls.push(Control::ExpandPage);
    }
    for control in controls {
        ctl.dispatch(control).await?;
    }

    let view = ctl.view();
    if json {
        let out = ViewJson {
            status: ctl.status(),
            tasks: &view.visible,
            total_matching: view.total_matching,
            page: view.page,
            controls: ctl.controls(),
            stats: ctl.stats(),
        };
        Ok(serde_json::to_string_pretty(&out)?)
    } else {
        Ok(format_view(&view).join("\n"))
    }
}

async fn cmd_add<G: TaskGateway + ?Sized>(
    ctl: &mut TaskController<G>,
    args: AddArgs,
    json: bool,
) -> CmdResult {
    let task = ctl.add_task(&join_title(&args.title)).await?;
    if json {
        Ok(serde_json::to_string_pretty(&task)?)
    } else {
        Ok(format!("added {}", format_task_line(&task)))
    }
}

async fn cmd_toggle<G: TaskGateway + ?Sized>(
    ctl: &mut TaskController<G>,
    args: IdArgs,
    is_complete: bool,
    json: bool,
) -> CmdResult {
    let task = ctl.toggle_task(&args.id, is_complete).await?;
    if json {
        Ok(serde_json::to_string_pretty(&task)?)
    } else {
        Ok(format_task_line(&task))
    }
}

async fn cmd_edit<G: TaskGateway + ?Sized>(
    ctl: &mut TaskController<G>,
    args: EditArgs,
    json: bool,
) -> CmdResult {
    let task = ctl.edit_task(&args.id, &join_title(&args.title)).await?;
    if json {
        Ok(serde_json::to_string_pretty(&task)?)
    } else {
        Ok(format_task_line(&task))
    }
}

async fn cmd_rm<G: TaskGateway + ?Sized>(
    ctl: &mut TaskController<G>,
    args: IdArgs,
    json: bool,
) -> CmdResult {
    ctl.delete_task(&args.id).await?;
    if json {
        Ok(serde_json::to_string_pretty(&DeletedJson { deleted: &args.id })?)
    } else {
        Ok(format!("deleted {}", args.id))
    }
}

fn cmd_stats<G: TaskGateway + ?Sized>(ctl: &TaskController<G>, json: bool) -> CmdResult {
    let stats = ctl.stats();
    if json {
        Ok(serde_json::to_string_pretty(&stats)?)
    } else {
        Ok(format_stats(&stats))
    }
}
