//! ferry - copy, move and duplicate files and folders.
//!
//! Usage:
//!   ferry copy SRC... DEST     Copy into DEST (or onto DEST for one source)
//!   ferry move SRC... DEST     Move, renaming where possible
//!   ferry duplicate PATH...    Create "name (copy N)" next to each path
//!   ferry undo [--list]        Revert the most recent copy or move
//!   ferry --help               Show help

use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Context, Result};
use humansize::{format_size, DECIMAL};
use tracing_subscriber::EnvFilter;

use ferry_core::{default_undo_file, TransferConfig, TransferKind, VerifyMode};
use ferry_ops::{
    start_transfer, ConflictPolicy, CreateResponse, DecisionOracle, DecisionRequest, ErrorPolicy,
    NoopThumbnails, PolicyOracle, ReplaceResponse, SkipResponse, SpaceResponse, TransferEvent,
    TransferJob, TransferOutcome, UndoLog,
};

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Copy, move and duplicate files with conflict resolution",
    long_about = "ferry copies and moves files and folder trees.\n\n\
                  Moves are done as renames where possible and fall back to \
                  copy + delete across filesystems. Existing targets and \
                  failed entries are resolved interactively or by policy."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: TransferArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files and folders
    Copy {
        /// Sources followed by the destination
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// Move files and folders
    Move {
        /// Sources followed by the destination
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// Copy files and folders next to themselves
    Duplicate {
        /// Paths to duplicate
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Revert the most recent copy or move
    Undo {
        /// Show the history instead
        #[arg(long)]
        list: bool,
    },
}

#[derive(Args)]
struct TransferArgs {
    /// What to do when a target exists
    #[arg(long, global = true, value_enum, default_value = "ask")]
    on_conflict: OnConflict,

    /// What to do when an entry fails
    #[arg(long, global = true, value_enum, default_value = "ask")]
    on_error: OnError,

    /// Recreate missing folders when restoring from the trash
    #[arg(long, global = true)]
    create_parents: bool,

    /// Never move by renaming; always copy and delete
    #[arg(long, global = true)]
    no_rename: bool,

    /// Compare checksums of copied files
    #[arg(long, global = true)]
    verify: bool,

    /// Write files under a temporary name until complete
    #[arg(long, global = true)]
    partial: bool,

    /// Rewrite names that FAT filesystems reject
    #[arg(long, global = true)]
    fat_names: bool,

    /// Transfer configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Undo history file
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnConflict {
    Ask,
    Skip,
    Overwrite,
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnError {
    Ask,
    Skip,
    Cancel,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.options.verbose);

    let config = load_config(&cli.options)?;
    let (sources, targets, kind) = match cli.command {
        Command::Undo { list } => return run_undo(list, config, &cli.options).await,
        Command::Copy { paths } => split_destination(paths, TransferKind::Copy)?,
        Command::Move { paths } => split_destination(paths, TransferKind::Move)?,
        Command::Duplicate { paths } => {
            let paths = paths
                .iter()
                .map(|p| absolute(p))
                .collect::<Result<Vec<_>>>()?;
            (paths.clone(), paths, TransferKind::Copy)
        }
    };

    let job = TransferJob::new(sources, targets, kind)?.with_config(config);
    let outcome = run_job(job, &cli.options).await?;
    if let Err(e) = record_history(&cli.options, &outcome) {
        tracing::warn!("Failed to update the undo history: {e}");
    }

    if cli.options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(kind, &outcome);
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the config file, then apply command-line overrides.
fn load_config(args: &TransferArgs) -> Result<TransferConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => TransferConfig::default(),
    };

    if args.no_rename {
        config.direct_move = false;
    }
    if args.verify {
        config.verify = VerifyMode::Always;
    }
    if args.partial {
        config.use_partial = true;
    }
    if args.fat_names {
        config.fat_safe_names = true;
    }
    if let Err(e) = config.validate() {
        bail!("Invalid transfer configuration: {e}");
    }

    Ok(config)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {}", path.display()))
}

/// Split `SRC... DEST` into index-aligned source and target lists.
///
/// With several sources or an existing folder as destination, each source
/// lands inside it; otherwise the destination is the exact target.
fn split_destination(
    mut paths: Vec<PathBuf>,
    kind: TransferKind,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>, TransferKind)> {
    let Some(dest) = paths.pop() else {
        bail!("Missing destination");
    };
    let dest = absolute(&dest)?;
    let sources = paths
        .iter()
        .map(|p| absolute(p))
        .collect::<Result<Vec<_>>>()?;

    let into_folder = sources.len() > 1 || dest.is_dir();
    let targets = sources
        .iter()
        .map(|source| {
            if !into_folder {
                return Ok(dest.clone());
            }
            match source.file_name() {
                Some(name) => Ok(dest.join(name)),
                None => bail!("Can't determine the name of {}", source.display()),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((sources, targets, kind))
}

/// Answers for everything not asked on the terminal.
fn policy_for(args: &TransferArgs) -> PolicyOracle {
    let conflicts = match args.on_conflict {
        OnConflict::Ask | OnConflict::Skip => ConflictPolicy::Skip,
        OnConflict::Overwrite => ConflictPolicy::Overwrite,
        OnConflict::Rename => ConflictPolicy::Rename,
    };
    let errors = match args.on_error {
        OnError::Ask | OnError::Skip => ErrorPolicy::Skip,
        OnError::Cancel => ErrorPolicy::Cancel,
    };
    PolicyOracle::skip()
        .with_conflicts(conflicts)
        .with_errors(errors)
        .with_create_parents(args.create_parents)
}

/// Which questions go to the terminal as `(conflicts, errors)`.
///
/// Without a terminal every question is answered by policy.
fn prompts_for(args: &TransferArgs, interactive: bool) -> (bool, bool) {
    (
        interactive && args.on_conflict == OnConflict::Ask,
        interactive && args.on_error == OnError::Ask,
    )
}

async fn run_job(job: TransferJob, args: &TransferArgs) -> Result<TransferOutcome> {
    let interactive = std::io::stdin().is_terminal();
    let policy = policy_for(args);
    let (ask_conflicts, ask_errors) = prompts_for(args, interactive);
    let show_progress = !args.json && std::io::stderr().is_terminal();

    let mut handle = start_transfer(job, None, Arc::new(NoopThumbnails));
    let token = handle.token();
    let mut interrupted = false;

    loop {
        let event = tokio::select! {
            event = handle.next_event() => event,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                tracing::warn!("Interrupted, cancelling");
                token.cancel();
                continue;
            }
        };
        let Some(event) = event else { break };

        match event {
            TransferEvent::Percent(percent) => {
                if show_progress {
                    eprint!("\r{percent:6.2}%");
                }
            }
            TransferEvent::Info(message) => tracing::info!("{message}"),
            TransferEvent::NewFiles(_) => {}
            TransferEvent::Decision(request) => {
                answer(request, &policy, ask_conflicts, ask_errors, interactive).await;
            }
        }
    }

    if show_progress {
        eprintln!();
    }
    Ok(handle.join().await?)
}

async fn answer(
    request: DecisionRequest,
    policy: &PolicyOracle,
    ask_conflicts: bool,
    ask_errors: bool,
    interactive: bool,
) {
    match request {
        DecisionRequest::Replace {
            source,
            target,
            reply,
        } => {
            let response = if ask_conflicts {
                let question = format!(
                    "\"{}\" already exists. Replace it with \"{}\"?",
                    target.display(),
                    source.display()
                );
                prompt(
                    question,
                    vec![
                        ("y", ReplaceResponse::Yes),
                        ("a", ReplaceResponse::YesAll),
                        ("n", ReplaceResponse::No),
                        ("o", ReplaceResponse::NoAll),
                        ("r", ReplaceResponse::Rename),
                        ("t", ReplaceResponse::Retry),
                        ("c", ReplaceResponse::Cancel),
                    ],
                )
                .await
                .unwrap_or(ReplaceResponse::Cancel)
            } else {
                policy.ask_replace(&source, &target)
            };
            let _ = reply.send(response);
        }
        DecisionRequest::Skip { message, reply } => {
            let response = if ask_errors {
                prompt(
                    format!("{message}. Skip it?"),
                    vec![
                        ("s", SkipResponse::Skip),
                        ("a", SkipResponse::SkipAll),
                        ("r", SkipResponse::Retry),
                        ("c", SkipResponse::Cancel),
                    ],
                )
                .await
                .unwrap_or(SkipResponse::Cancel)
            } else {
                policy.ask_skip(&message)
            };
            let _ = reply.send(response);
        }
        DecisionRequest::Create { message, reply } => {
            let response = if policy.create_parents || !interactive {
                policy.ask_create(&message)
            } else {
                prompt(
                    format!("{message}. Create it?"),
                    vec![("y", CreateResponse::Yes), ("c", CreateResponse::Cancel)],
                )
                .await
                .unwrap_or(CreateResponse::Cancel)
            };
            let _ = reply.send(response);
        }
        DecisionRequest::NoSpace { message, reply } => {
            let response = if interactive {
                prompt(
                    format!("{message}. Copy anyway?"),
                    vec![("y", SpaceResponse::Continue), ("c", SpaceResponse::Cancel)],
                )
                .await
                .unwrap_or(SpaceResponse::Cancel)
            } else {
                SpaceResponse::Cancel
            };
            let _ = reply.send(response);
        }
    }
}

/// Ask on the terminal until one of `choices` is typed.
///
/// Returns `None` at end of input.
async fn prompt<T: Copy + Send + 'static>(
    question: String,
    choices: Vec<(&'static str, T)>,
) -> Option<T> {
    tokio::task::spawn_blocking(move || {
        let keys: Vec<_> = choices.iter().map(|(key, _)| *key).collect();
        let stdin = std::io::stdin();
        loop {
            eprint!("\n{question} [{}] ", keys.join("/"));
            let _ = std::io::stderr().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }

            let line = line.trim().to_lowercase();
            if let Some((_, value)) = choices.iter().find(|(key, _)| *key == line) {
                return Some(*value);
            }
        }
    })
    .await
    .ok()
    .flatten()
}

fn print_summary(kind: TransferKind, outcome: &TransferOutcome) {
    let verb = match kind {
        TransferKind::Copy => "Copied",
        TransferKind::Move => "Moved",
    };

    for path in &outcome.new_files {
        println!("{}", path.display());
    }
    eprintln!(
        "{verb} {} items ({})",
        outcome.new_files.len(),
        format_size(outcome.bytes_transferred, DECIMAL)
    );
}

fn history_path(args: &TransferArgs) -> Option<PathBuf> {
    args.history.clone().or_else(default_undo_file)
}

fn record_history(args: &TransferArgs, outcome: &TransferOutcome) -> Result<()> {
    let (Some(operation), Some(path)) = (&outcome.undo, history_path(args)) else {
        return Ok(());
    };

    let mut log = UndoLog::load(&path)?;
    log.push(operation.clone());
    log.save(&path)?;
    Ok(())
}

async fn run_undo(list: bool, config: TransferConfig, args: &TransferArgs) -> Result<()> {
    let Some(path) = history_path(args) else {
        bail!("No place for the undo history, pass --history");
    };
    let mut log = UndoLog::load(&path)?;

    if list {
        for entry in log.entries() {
            println!(
                "{:>4}  {}  {}",
                entry.id,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.operation.description()
            );
        }
        return Ok(());
    }

    let Some(entry) = log.pop() else {
        bail!("Nothing to undo");
    };
    let operation = entry.operation;
    if !operation.can_undo() {
        log.save(&path)?;
        bail!("{}", operation.undo_description());
    }

    eprintln!("{}", operation.undo_description());
    match operation.reverse_job() {
        Some(job) => {
            let outcome = run_job(job?.with_config(config), args).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_summary(TransferKind::Move, &outcome);
            }
        }
        None => {
            let removed = operation.remove_copies()?;
            eprintln!("Removed {removed} items");
        }
    }

    log.save(&path)?;
    Ok(())
}
