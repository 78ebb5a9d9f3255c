//! boothsync CLI entry point.

use boothsync::cli::commands;
use boothsync::cli::commands::init::InitOptions;
use boothsync::cli::{Cli, Commands, selected_kinds};
use boothsync::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let home = cli.home.as_deref();
    let remote = cli.remote.as_deref();

    match &cli.command {
        Commands::Init {
            remote_dir,
            template_dir,
            settings_path,
            policy,
            force,
        } => {
            let options = InitOptions {
                remote_dir: remote_dir.clone().or_else(|| cli.remote.clone()),
                template_dir: template_dir.clone(),
                settings_path: settings_path.clone(),
                policy: *policy,
                force: *force,
            };
            commands::init::execute(home, options, json)
        }
        Commands::Version => commands::version::execute(json),
        Commands::Device => commands::device::execute(home, json),

        // Sync
        Commands::Sync { kind } => {
            commands::sync::execute(home, remote, &selected_kinds(*kind), json, cli.quiet)
        }
        Commands::Status { kind } => {
            commands::status::execute(home, remote, &selected_kinds(*kind), json)
        }

        // Local state
        Commands::Manifest { command } => commands::manifest::execute(command, home, json),
        Commands::Settings { command } => commands::settings::execute(command, home, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
