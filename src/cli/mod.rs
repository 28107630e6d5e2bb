// src/cli/mod.rs
// Command-line entry points for extraction and log maintenance

pub mod archive_log;
pub mod extract;
pub mod family_types;
pub mod init_settings;
pub mod usage;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::extraction::Stage;
use crate::settings::{io::load_settings_from_file, PipelineSettings};

#[derive(Parser)]
#[command(name = "householdgen")]
#[command(about = "Householdgen - recovers household and weather tables from model run logs", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to app_settings.json in the config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract tables for one paired stage from a run log
    Extract {
        /// weather-range, weather or family-consumption
        #[arg(long)]
        stage: Stage,
        /// Run log to read
        #[arg(long)]
        log: PathBuf,
        /// Directory the tables are written to
        #[arg(long)]
        out: PathBuf,
        /// Number of pairs the caller expects
        #[arg(long)]
        expect: Option<usize>,
        /// Also write the stage report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Split family roster replies into one JSON file per country
    FamilyTypes {
        /// Run log to read
        #[arg(long)]
        log: PathBuf,
        /// Directory the roster files are written to
        #[arg(long)]
        out: PathBuf,
        /// File name template; the country placeholder is substituted
        #[arg(long)]
        template: Option<String>,
    },

    /// Token and timing summary of a log file or a directory of logs
    Usage {
        /// Log file, or directory searched for .txt logs
        path: PathBuf,
    },

    /// Copy the working log to a stage log
    ArchiveLog {
        /// Working log
        #[arg(long)]
        from: PathBuf,
        /// Archive path without the .txt extension
        #[arg(long)]
        to: PathBuf,
        /// Truncate the working log afterwards
        #[arg(long)]
        clear: bool,
    },

    /// Write the current (or default) settings to the settings file
    InitSettings,
}

/// Loads and validates settings for a command.
pub fn load_settings(config: Option<&Path>) -> Result<PipelineSettings> {
    let settings: PipelineSettings = load_settings_from_file(config)?;
    settings.validate()?;
    Ok(settings)
}

/// Runs the parsed command.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Extract {
            stage,
            log,
            out,
            expect,
            report,
        } => extract::run(config, stage, &log, &out, expect, report.as_deref()),
        Commands::FamilyTypes { log, out, template } => {
            family_types::run(config, &log, &out, template.as_deref())
        }
        Commands::Usage { path } => usage::run(&path),
        Commands::ArchiveLog { from, to, clear } => archive_log::run(&from, &to, clear),
        Commands::InitSettings => init_settings::run(config),
    }
}
