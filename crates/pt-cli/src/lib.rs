//! Project Tracking CLI Library
//!
//! Command-line client for the project tracking API used by GenPipes
//! pipelines.
//!
//! # Overview
//!
//! - **Session**: cookies survive between invocations in `~/.pt_cli`
//! - **Authentication**: login redirects are answered transparently and the
//!   request replayed (`auth`)
//! - **Responses**: JSON payloads, `DB_ACTION_*` envelopes and HTML pages are
//!   classified once (`api::classifier`)
//! - **Digest**: readset/pair manifests and JSON reports (`pt_cli digest`)
//! - **Ingest and modifications**: write routes (`pt_cli ingest`,
//!   `pt_cli edit|delete|...`)
//! - **Raw access**: any route (`pt_cli route`)

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use context::ProjectContext;
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use pt_common::LogLevel;
use std::path::PathBuf;

/// pt_cli - Project tracking database client
#[derive(Parser, Debug)]
#[command(name = "pt_cli")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Where the server is located, overrides `url_root` from connect.yaml.
    /// Should be of the "http(s)://location" form
    #[arg(long, env = "PT_CLI_URL_ROOT")]
    pub url_root: Option<String>,

    /// Project you are working on
    #[arg(long, env = "PT_CLI_PROJECT")]
    pub project: Option<String>,

    /// String to use in a post
    #[arg(long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// File to use in a post
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Set log level (TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, default_value = "INFO", value_parser = parse_log_level)]
    pub loglevel: LogLevel,

    /// Print the current client configuration and exit
    #[arg(long)]
    pub info: bool,

    /// Write server warnings to ./warning.log instead of stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the whole command reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

fn parse_log_level(s: &str) -> std::result::Result<LogLevel, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all available url/routes in the project tracking api. All these
    /// routes can be reached with the "route <url>" sub-command, all other
    /// sub-commands are convenience wrappers around these routes
    Help,

    /// Call any url described in help
    Route {
        /// Route relative to the server root
        url: String,
    },

    /// List all projects
    Projects,

    /// Operations pulling information from the database
    Digest {
        #[command(subcommand)]
        command: DigestCommand,
    },

    /// Operations pushing information into the database
    Ingest {
        #[command(subcommand)]
        command: IngestCommand,
    },

    /// Edit database records
    Edit(WriteArgs),

    /// Delete database records
    Delete(ModifyArgs),

    /// Undelete database records
    Undelete(ModifyArgs),

    /// Deprecate database records
    Deprecate(ModifyArgs),

    /// Undeprecate database records
    Undeprecate(ModifyArgs),

    /// Curate database records (permanent removal)
    Curate(ModifyArgs),
}

/// Digest subcommands
#[derive(Subcommand, Debug)]
pub enum DigestCommand {
    /// Return a GenPipes readset file in tsv format. Either use --input-json
    /// OR --sample_<name|id>/--readset_<name|id> + --endpoint arguments
    #[command(name = "readset_file")]
    ReadsetFile(ReadsetFileArgs),

    /// Return a GenPipes pair file in csv format. Either use --input-json
    /// OR --sample_<name|id>/--readset_<name|id> + --endpoint arguments
    #[command(name = "pair_file")]
    PairFile(PairFileArgs),

    /// Return unanalyzed samples or readsets, by name or ID
    Unanalyzed(UnanalyzedArgs),

    /// Return delivery information for samples or readsets
    Delivery(DeliveryArgs),
}

/// Ingest subcommands
#[derive(Subcommand, Debug)]
pub enum IngestCommand {
    /// Push run processing data into the database
    #[command(name = "run_processing")]
    RunProcessing(WriteArgs),

    /// Push a transfer of data (copy, rsync, mv, ...) into the database
    Transfer(WriteArgs),

    /// Push a GenPipes analysis into the database
    Genpipes(WriteArgs),

    /// Push a delivery into the database
    Delivery(WriteArgs),
}

/// Sample/readset selection shared by the digest commands
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Sample name(s) to be selected
    #[arg(long = "sample_name", num_args = 1..)]
    pub sample_name: Vec<String>,

    /// Readset name(s) to be selected
    #[arg(long = "readset_name", num_args = 1..)]
    pub readset_name: Vec<String>,

    /// Sample ID(s) to be selected, ranges allowed ("1,3-5")
    #[arg(long = "sample_id", num_args = 1..)]
    pub sample_id: Vec<String>,

    /// Readset ID(s) to be selected, ranges allowed ("1,3-5")
    #[arg(long = "readset_id", num_args = 1..)]
    pub readset_id: Vec<String>,

    /// Endpoint in which data is located
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Json file with sample/readset and endpoint to be selected
    #[arg(long = "input-json")]
    pub input_json: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReadsetFileArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Name of the readset file returned
    #[arg(short, long, default_value = "readset_file.tsv")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PairFileArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Name of the pair file returned
    #[arg(short, long, default_value = "pair_file.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DeliveryArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Name of the output file (default: terminal)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UnanalyzedArgs {
    /// Select sample names
    #[arg(long = "sample_name")]
    pub sample_name: bool,

    /// Select readset names
    #[arg(long = "readset_name")]
    pub readset_name: bool,

    /// Select sample IDs
    #[arg(long = "sample_id")]
    pub sample_id: bool,

    /// Select readset IDs
    #[arg(long = "readset_id")]
    pub readset_id: bool,

    /// Run name in which samples/readsets are
    #[arg(long = "run_name")]
    pub run_name: Option<String>,

    /// Run ID in which samples/readsets are
    #[arg(long = "run_id")]
    pub run_id: Option<String>,

    /// Experiment sequencing technology in which samples/readsets are
    #[arg(long = "experiment_sequencing_technology")]
    pub experiment_sequencing_technology: Option<String>,

    /// Endpoint in which data is located
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Name of the output file (default: terminal), formatted as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Input of the write routes
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Json file holding the records to push or modify
    #[arg(long = "input-json")]
    pub input_json: Option<PathBuf>,

    /// Run without committing anything to the database
    #[arg(long = "dry_run")]
    pub dry_run: bool,
}

/// Cascade options of the modification routes
#[derive(Args, Debug, Clone, Default)]
pub struct CascadeArgs {
    /// Apply to children and parents; supersedes --cascade_up/--cascade_down
    #[arg(long)]
    pub cascade: bool,

    /// Apply to parents
    #[arg(long = "cascade_up")]
    pub cascade_up: bool,

    /// Apply to children
    #[arg(long = "cascade_down")]
    pub cascade_down: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ModifyArgs {
    #[command(flatten)]
    pub write: WriteArgs,

    #[command(flatten)]
    pub cascade: CascadeArgs,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_digest_selectors_parse() {
        let cli = Cli::try_parse_from([
            "pt_cli",
            "--project",
            "moh",
            "digest",
            "readset_file",
            "--sample_id",
            "1,3-5",
            "8",
            "--endpoint",
            "beluga",
        ])
        .unwrap();

        let Some(Commands::Digest {
            command: DigestCommand::ReadsetFile(args),
        }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(args.selection.sample_id, vec!["1,3-5", "8"]);
        assert_eq!(args.output, PathBuf::from("readset_file.tsv"));
        assert_eq!(cli.project.as_deref(), Some("moh"));
    }

    #[test]
    fn test_data_and_data_file_conflict() {
        let err = Cli::try_parse_from(["pt_cli", "--data", "{}", "--data-file", "x.json", "projects"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_modification_flags() {
        let cli = Cli::try_parse_from([
            "pt_cli",
            "delete",
            "--input-json",
            "mod.json",
            "--dry_run",
            "--cascade_down",
        ])
        .unwrap();

        let Some(Commands::Delete(args)) = cli.command else {
            panic!("wrong command");
        };
        assert!(args.write.dry_run);
        assert!(args.cascade.cascade_down);
        assert!(!args.cascade.cascade);
    }

    #[test]
    fn test_loglevel_accepts_long_names() {
        let cli = Cli::try_parse_from(["pt_cli", "--loglevel", "WARNING", "projects"]).unwrap();
        assert_eq!(cli.loglevel, LogLevel::Warn);
        assert!(Cli::try_parse_from(["pt_cli", "--loglevel", "LOUD", "projects"]).is_err());
    }
}
