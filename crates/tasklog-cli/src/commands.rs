use anyhow::{Context, Result, anyhow};
use tasklog_storage::{QueryableBackend, StorageBackend, StorageConfig, open_backend};

use crate::args::{Cli, Commands};
use crate::config::{discover_project_dir, resolve_storage_config};
use crate::hook;

pub fn run(cli: Cli) -> Result<()> {
    let project_dir = discover_project_dir(cli.project_dir.as_deref())?;
    let config = resolve_storage_config(&project_dir, cli.backend.as_deref())?;

    match cli.command {
        Commands::Save => {
            let Some(event) = hook::read_hook_event(std::io::stdin().lock())? else {
                return Ok(());
            };

            let entry = hook::build_log_entry(&event);
            let backend = open_backend(&project_dir, &config)?;
            backend
                .append_entry(&entry)
                .context("failed to append entry")?;

            println!("Saved {} todos ({} backend)", entry.todos.len(), config.backend);
            Ok(())
        }

        Commands::History => {
            let backend = open_backend(&project_dir, &config)?;
            let history = backend.load_history()?;
            println!("{}", serde_json::to_string_pretty(&history)?);
            Ok(())
        }

        Commands::Session { session_id } => {
            let backend = open_backend(&project_dir, &config)?;
            let entries = queryable(backend.as_ref(), &config)?.entries_by_session(&session_id)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }

        Commands::Todos { status } => {
            let backend = open_backend(&project_dir, &config)?;
            let todos = queryable(backend.as_ref(), &config)?.todos_by_status(&status)?;
            println!("{}", serde_json::to_string_pretty(&todos)?);
            Ok(())
        }
    }
}

fn queryable<'a>(
    backend: &'a dyn StorageBackend,
    config: &StorageConfig,
) -> Result<&'a dyn QueryableBackend> {
    backend.as_queryable().ok_or_else(|| {
        anyhow!(
            "the {} backend does not support queries; use --backend sqlite",
            config.backend
        )
    })
}
