// src/main.rs

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use treesync::cli::{Cli, Commands};
use treesync::config::ConfigBuilder;
use treesync::errors::Error;
use treesync::progress::default_sink;
use treesync::signal::setup_signal_handler;
use treesync::status::write_status;
use treesync::sync::write_summary;
use treesync::{clear_cache, run, status};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. Default to 'info' if RUST_LOG is not set.
    let directive = if cli.command.verbose() {
        "treesync=debug"
    } else {
        "treesync=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    log::debug!("Starting treesync v{}...", env!("CARGO_PKG_VERSION"));

    // Panic hook so a crash never dumps request details or tokens.
    std::panic::set_hook(Box::new(|info| {
        let msg = match info.payload().downcast_ref::<&str>() {
            Some(s) => *s,
            None => "Box<Any>",
        };
        eprintln!(
            "Application Error: {}",
            msg.replace(env!("CARGO_MANIFEST_DIR"), "<redacted>")
                .replace(std::path::MAIN_SEPARATOR, "/")
        );
    }));

    match cli.command {
        Commands::Sync(args) => {
            let config = ConfigBuilder::from_cli(args).build()?;
            log::debug!("Configuration built successfully: {:?}", config);

            let token = setup_signal_handler()?;
            let progress = default_sink(config.show_progress && !config.json);

            match run(&config, &token, progress.as_ref()) {
                Ok(report) => {
                    let mut stdout = std::io::stdout().lock();
                    if config.json {
                        serde_json::to_writer_pretty(&mut stdout, &report)?;
                        writeln!(stdout)?;
                    } else {
                        write_summary(&mut stdout, &report.summary)?;
                        for failure in &report.failures {
                            writeln!(stdout, "  failed: {} ({})", failure.path, failure.error)?;
                        }
                    }
                    stdout.flush()?;
                    if !report.success {
                        std::process::exit(1);
                    }
                }
                Err(Error::Interrupted) => {
                    eprintln!("\nOperation cancelled.");
                    std::process::exit(130);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status(args) => {
            let config = ConfigBuilder::from_cli(args).build()?;
            let report = status(&config)?;
            let mut stdout = std::io::stdout().lock();
            if config.json {
                serde_json::to_writer_pretty(&mut stdout, &report)?;
                writeln!(stdout)?;
            } else {
                write_status(&mut stdout, &report)?;
            }
            stdout.flush()?;
            if !report.connected {
                std::process::exit(1);
            }
        }
        Commands::ClearCache(args) => {
            let local = args
                .local_path
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Missing required value: --local (or TREESYNC_LOCAL_PATH)"))?;
            let count = clear_cache(std::path::Path::new(&local))?;
            println!("Cleared {} cached entries in {}", count, local);
        }
    }

    Ok(())
}
