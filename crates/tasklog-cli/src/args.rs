use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tasklog")]
#[command(about = "Capture and inspect TodoWrite task events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project root used for resolving storage locations
    #[arg(long, global = true)]
    pub project_dir: Option<String>,

    /// Storage backend: "json" or "sqlite"
    #[arg(long, global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read one hook event from stdin and append it to the log
    Save,

    /// Print the full history as JSON
    History,

    /// Print all entries recorded for one session
    Session {
        /// Session identifier to look up
        session_id: String,
    },

    /// Print every todo with the given status
    Todos {
        /// Status label to match (e.g. "pending", "completed")
        status: String,
    },
}
