use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, CombinedLogger, Config as LogConfig, TermLogger, TerminalMode, WriteLogger};

use mnemonic_recover::config::{Cli, Config};

fn init_logging() -> anyhow::Result<()> {
    let log_file = std::fs::File::create("recovery.log")?;
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            LogConfig::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Debug, LogConfig::default(), log_file),
    ])?;
    Ok(())
}

fn main() {
    if let Err(e) = init_logging() {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let config = match Config::from_cli(cli) {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("interrupt received, finishing in-flight chunks and saving progress");
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        error!("failed to install interrupt handler: {e}");
        std::process::exit(1);
    }

    match mnemonic_recover::run(config, stop_flag) {
        Ok(outcome) => {
            if outcome.matches.is_empty() {
                info!(
                    "run finished: {} candidates checked, no match found",
                    outcome.candidates_checked
                );
            } else {
                info!("run finished: {} match(es) found", outcome.matches.len());
            }
            std::process::exit(0);
        }
        Err(e) => {
            error!("fatal error: {e}");
            std::process::exit(1);
        }
    }
}
