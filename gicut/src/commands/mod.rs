mod decrypt;
mod demux;
mod key;

pub use decrypt::Decrypt;
pub use demux::Demux;
pub use key::Key;

use clap::{ColorChoice, Parser, Subcommand};
use log::LevelFilter;

/// Extract and decrypt video and audio streams from CRI USM cutscene files.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Maximum level of log messages printed.
    /// possible values: [off, error, warn, info, debug, trace]
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Decrypt(Decrypt),
    Demux(Demux),
    Key(Key),
}
