use clap::{Parser, Subcommand};

/// CLI истории снимков: прогон сценариев на in-memory хосте
#[derive(Parser, Debug)]
#[command(name = "phylohistory", version, about = "Tree view snapshot history")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Replay a scripted session against the in-memory tree host
    Replay {
        /// Script JSON: inline, "@path/to/file.json" or "-" for stdin
        #[arg(long)]
        script: String,
        /// Print the full report as one JSON object
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Exit with an error if any step failed
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Show the effective panel configuration (defaults + ENV + options)
    Config {
        /// Widget options JSON (inline, "@file" or "-"); e.g. '{"history":{"collapsed":false}}'
        #[arg(long)]
        options: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
