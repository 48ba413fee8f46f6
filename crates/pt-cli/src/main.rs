//! pt_cli - Main entry point

use clap::{CommandFactory, Parser};
use pt_cli::api::endpoints::{Ingest, Modification};
use pt_cli::api::{ClientOptions, RouteClient, WarningSink};
use pt_cli::auth::CredentialSource;
use pt_cli::commands::{digest, info, ingest, input, modify, route};
use pt_cli::progress::Progress;
use pt_cli::session::{SessionContext, SessionStore};
use pt_cli::{Cli, Commands, Config, DigestCommand, IngestCommand, ProjectContext, Result};
use pt_common::logging::{init_logging, LogConfig};
use std::io::Write;
use std::process;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    // Logs go to stderr so that only the server payload reaches stdout
    let log_config = LogConfig::with_level(cli.loglevel);
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

/// Load the configuration, then run the requested command
async fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::discover()?;
    config.apply_overrides(cli.url_root.as_deref(), cli.project.as_deref());

    let mut out = std::io::stdout();

    if cli.info {
        info::run(&config, &mut out)?;
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let data = input::global_data(cli.data.as_deref(), cli.data_file.as_deref())?;
    let base_url = config.base_url()?;
    let session = SessionContext::open(SessionStore::new(&config.session_file), &base_url);
    let client = RouteClient::new(
        session,
        ClientOptions {
            timeout: config.timeout(),
            max_auth_attempts: config.max_auth_attempts,
            credentials: CredentialSource::new(config.user.clone(), config.password.clone()),
            warnings: WarningSink::for_quiet(cli.quiet),
            progress: Progress::new(cli.quiet),
        },
    )?;
    let mut ctx = ProjectContext::new(config.project.clone(), client, data);

    let result = dispatch(&mut ctx, command, &mut out).await;
    if let Err(e) = ctx.finish() {
        warn!("Could not save session: {}", e);
    }
    result?;

    // Keep pipes happy
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

async fn dispatch(ctx: &mut ProjectContext, command: Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Help => route::help(ctx, out).await,
        Commands::Route { url } => route::route(ctx, &url, out).await,
        Commands::Projects => route::projects(ctx, out).await,

        Commands::Digest { command } => match command {
            DigestCommand::ReadsetFile(args) => digest::readset_file(ctx, &args).await,
            DigestCommand::PairFile(args) => digest::pair_file(ctx, &args).await,
            DigestCommand::Unanalyzed(args) => digest::unanalyzed(ctx, &args, out).await,
            DigestCommand::Delivery(args) => digest::delivery(ctx, &args, out).await,
        },

        Commands::Ingest { command } => {
            let (kind, args) = match command {
                IngestCommand::RunProcessing(args) => (Ingest::RunProcessing, args),
                IngestCommand::Transfer(args) => (Ingest::Transfer, args),
                IngestCommand::Genpipes(args) => (Ingest::GenPipes, args),
                IngestCommand::Delivery(args) => (Ingest::Delivery, args),
            };
            ingest::run(ctx, kind, &args, out).await
        }

        Commands::Edit(args) => modify::run(ctx, Modification::Edit, &args, None, out).await,
        Commands::Delete(args) => {
            modify::run(ctx, Modification::Delete, &args.write, Some(&args.cascade), out).await
        }
        Commands::Undelete(args) => {
            modify::run(ctx, Modification::Undelete, &args.write, Some(&args.cascade), out).await
        }
        Commands::Deprecate(args) => {
            modify::run(ctx, Modification::Deprecate, &args.write, Some(&args.cascade), out).await
        }
        Commands::Undeprecate(args) => {
            modify::run(ctx, Modification::Undeprecate, &args.write, Some(&args.cascade), out).await
        }
        Commands::Curate(args) => {
            modify::run(ctx, Modification::Curate, &args.write, Some(&args.cascade), out).await
        }
    }
}
