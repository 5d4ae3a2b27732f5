use anyhow::Context;
use clap::Parser;
use env_logger::{Env, Target};
use flamescope::cli::{Cli, Command};
use flamescope::error::exit_code;
use log::LevelFilter;
use std::fs::File;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(err) = e.downcast_ref::<flamescope::Error>() {
                ExitCode::from(err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Validate CLI arguments
    cli.validate()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Invalid arguments")?;

    init_logging(&cli)?;

    match cli.command {
        Command::View {
            file,
            query_id,
            sql,
            direction,
            refresh,
        } => {
            let profile_path = match file {
                Some(f) => f,
                None => {
                    // Find most recent profile
                    flamescope::commands::list::most_recent_profile(std::path::Path::new("."))?
                        .ok_or_else(|| anyhow::anyhow!("No profiles found. Run 'flamescope list' to see available profiles."))?
                }
            };
            flamescope::commands::view::run(&profile_path, query_id, sql, direction, refresh)?;
        }
        Command::Fold { file, direction } => {
            flamescope::commands::view::run_folded(&file, direction)?;
        }
        Command::Import {
            db,
            file,
            query_id,
            replace,
        } => {
            flamescope::commands::import::run(&db, &file, &query_id, replace)?;
        }
        Command::Top {
            file,
            query_id,
            top,
            threshold,
        } => {
            flamescope::commands::top::run(&file, query_id.as_deref(), top, threshold)?;
        }
        Command::List { dir } => {
            flamescope::commands::list::run(dir.as_deref())?;
        }
        Command::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "flamescope", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Logs go to `--log-file` when given. Without one, interactive commands
/// stay silent so log lines never land on the TUI.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_env(
        Env::new()
            .filter_or("FLAMESCOPE_LOG", "info")
            .write_style("FLAMESCOPE_LOG_STYLE"),
    );

    if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    } else if cli.command.is_interactive() {
        builder.filter_level(LevelFilter::Off);
    }

    builder.init();
    Ok(())
}
