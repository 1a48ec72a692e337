mod commands;
mod config;
mod keys;
mod logger;

use clap::{ColorChoice, Parser};
use colored::Colorize;
use commands::{Args, Commands};
use gicut_cri::Cancellation;
use log::{error, warn};
use logger::Logger;
use std::{
    io::{IsTerminal, stdout},
    process,
    sync::atomic::{AtomicBool, Ordering},
};

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    colored::control::set_override(match args.color {
        ColorChoice::Always => true,
        ColorChoice::Auto => stdout().is_terminal(),
        ColorChoice::Never => false,
    });

    Logger::init(args.log_level)?;

    let cancellation = Cancellation::new();
    let handler = cancellation.clone();
    let stopping = AtomicBool::new(false);

    ctrlc::set_handler(move || {
        if stopping.swap(true, Ordering::SeqCst) {
            error!("Ctrl+C received, force exiting.");
            process::exit(1);
        }

        warn!("Ctrl+C received, stopping gracefully.");
        handler.cancel();
    })?;

    match args.command {
        Commands::Decrypt(args) => args.execute(&cancellation)?,
        Commands::Demux(args) => args.execute(&cancellation)?,
        Commands::Key(args) => args.execute()?,
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".bold().red(), e);
        process::exit(1);
    }
}
