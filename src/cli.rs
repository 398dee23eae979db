use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use cvsearch::{ResumeField, embedder::EmbedderKind};

#[derive(Debug, Parser)]
#[command(
    name = "cvsearch",
    about = "Multi-field weighted semantic search over resumes"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Embedding backend (defaults to the one the store was built with)
    #[arg(long, value_enum, global = true)]
    pub embedder: Option<EmbedderKind>,

    /// Override the ColBERT model ID or local model path
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Embed resumes from a JSON-lines file into the store
    Ingest(IngestArgs),
    /// Search resumes across all fields
    Search(SearchArgs),
    /// Show a stored resume
    Get(GetArgs),
    /// Show store statistics
    Stats(StatsArgs),
    /// Manage field weights
    Weights {
        #[command(subcommand)]
        action: WeightsAction,
    },
    /// Manage the ColBERT model configuration
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Ingest --

#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// JSON-lines file with one resume record per line
    pub path: PathBuf,

    /// Clear the store before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output statistics as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "5", allow_negative_numbers = true)]
    pub count: i64,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// JSON file with field weights for this search only
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Include the full stored resume with every result
    #[arg(long)]
    pub full: bool,
}

// -- Get --

#[derive(Debug, Parser)]
pub struct GetArgs {
    /// Resume identifier
    pub resume_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Stats --

#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Weights --

#[derive(Debug, Subcommand)]
pub enum WeightsAction {
    /// Show the weights searches use by default
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist the weight of one field
    Set {
        /// Field name (summary, skills, work_history, project_history, education)
        #[arg(value_parser = parse_field)]
        field: ResumeField,
        /// Non-negative weight
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Clear stored weights (revert to defaults)
    Reset,
}

fn parse_field(s: &str) -> Result<ResumeField, String> {
    s.parse().map_err(|e: cvsearch::Error| e.to_string())
}

// -- Model --

#[derive(Debug, Subcommand)]
pub enum ModelAction {
    /// Show the currently resolved model
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist a default model ID or local path in config.redb
    Set {
        /// Model ID (HuggingFace) or local path
        model: String,
    },
    /// Clear the stored model setting (revert to default)
    Clear,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "cvsearch",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["cvsearch", "search", "rust engineer"]);
        assert!(cli.embedder.is_none());
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "rust engineer");
                assert_eq!(args.count, 5);
                assert!(!args.json);
                assert!(!args.full);
                assert!(args.weights.is_none());
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn negative_count_reaches_validation() {
        let cli = Cli::parse_from(["cvsearch", "search", "q", "-n", "-1"]);
        match cli.command {
            Command::Search(args) => assert_eq!(args.count, -1),
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "cvsearch",
            "ingest",
            "resumes.jsonl",
            "--reset",
            "--embedder",
            "hash",
            "-q",
        ]);
        assert_eq!(cli.embedder, Some(EmbedderKind::Hash));
        assert!(cli.quiet);
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.path, PathBuf::from("resumes.jsonl"));
                assert!(args.reset);
            }
            _ => panic!("expected ingest command"),
        }
    }

    #[test]
    fn parse_weights_set() {
        let cli =
            Cli::parse_from(["cvsearch", "weights", "set", "work_history", "0.4"]);
        match cli.command {
            Command::Weights {
                action: WeightsAction::Set { field, value },
            } => {
                assert_eq!(field, ResumeField::WorkHistory);
                assert_eq!(value, 0.4);
            }
            _ => panic!("expected weights set"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
