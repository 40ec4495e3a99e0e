//! repo-backup - command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_backup::commands::{format_progress, format_report, BackupCommand, ListCommand, RestoreCommand};
use repo_backup::fs::WalkOptions;
use repo_backup::remote::ObjectKind;
use repo_backup::transfer::progress::format_bytes;
use repo_backup::{utils, BatchExecutor, BatchResult, Config, GitHubClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Repository as owner/name (overrides config)
    #[arg(short, long)]
    repo: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the account the token belongs to
    Whoami,

    /// List repositories of the authenticated account
    Repos,

    /// Create a new backup repository
    CreateRepo {
        name: String,

        #[arg(long)]
        private: bool,
    },

    /// List one level of a remote directory
    Ls {
        #[arg(default_value = "")]
        dir: String,
    },

    /// Upload files and folders
    Backup {
        /// Remote directory to back up under
        #[arg(short, long)]
        prefix: Option<String>,

        /// Individual file to back up (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Folder to back up recursively (repeatable)
        #[arg(short = 'd', long = "folder")]
        folders: Vec<PathBuf>,
    },

    /// Download remote files into one local directory
    Restore {
        /// Local destination directory
        #[arg(long = "to", value_name = "DIR")]
        destination: PathBuf,

        #[arg(required = true)]
        remote_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(repo) = args.repo {
        config.remote.repository = Some(repo);
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    let client = GitHubClient::from_config(&config)?;

    match args.command {
        Command::Whoami => {
            let user = client.authenticated_user().await?;
            println!("{}", user.login);
        }
        Command::Repos => {
            for repo in client.list_repositories().await? {
                let visibility = if repo.private { "private" } else { "public" };
                println!("{}\t{}", repo.full_name, visibility);
            }
        }
        Command::CreateRepo { name, private } => {
            let repo = client.create_repository(&name, private).await?;
            println!("Created {}", repo.full_name);
        }
        Command::Ls { dir } => {
            let entries = ListCommand {
                dir,
                files_only: false,
            }
            .run(&client)
            .await?;
            for entry in entries {
                match entry.kind {
                    ObjectKind::Directory => println!("{}/", entry.path),
                    ObjectKind::File => println!("{}\t{}", entry.path, format_bytes(entry.size)),
                }
            }
        }
        Command::Backup {
            prefix,
            files,
            folders,
        } => {
            let command = BackupCommand {
                files,
                folders,
                prefix: prefix.unwrap_or_else(|| config.backup.default_prefix.clone()),
                walk_options: WalkOptions::with_excludes(config.backup.exclude_names.clone()),
            };
            let target = client
                .repository()
                .map(|r| r.to_string())
                .unwrap_or_default();

            let cancel = cancel_on_interrupt();
            let executor = BatchExecutor::with_cancel(&client, cancel);
            let result = command
                .run(&executor, |p| eprintln!("{}", format_progress(p)))
                .await?;

            println!("{}", format_report(&result, &target));
            return Ok(exit_code(&result));
        }
        Command::Restore {
            destination,
            remote_paths,
        } => {
            let target = destination.display().to_string();
            let command = RestoreCommand {
                remote_paths,
                destination,
            };

            let cancel = cancel_on_interrupt();
            let executor = BatchExecutor::with_cancel(&client, cancel);
            let result = command
                .run(&executor, |p| eprintln!("{}", format_progress(p)))
                .await?;

            println!("{}", format_report(&result, &target));
            return Ok(exit_code(&result));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Cancel the batch on Ctrl+C; the unit in flight still completes.
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received SIGINT (Ctrl+C), stopping after the current file");
            on_signal.cancel();
        }
    });
    token
}

/// Success only when every planned unit went through.
fn exit_code(result: &BatchResult) -> ExitCode {
    if result.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
