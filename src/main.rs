//! # icon-array: The Main Entry Point
//!
//! Command Line Interface (CLI) parsing, logging initialization and dispatch.
//!
//! The tool turns `icon.png` into `icon.h` / `icon.cpp`, a C++ header and
//! source pair holding the image's raw RGBA pixels as `ICON_DATA`, so an
//! application can embed its icon without reading a file at runtime.
//! Run without arguments it does exactly that in the current directory.

use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use log::{info, error, LevelFilter};
use simplelog::{Config, SimpleLogger};

mod assets;
mod config;
mod emitter;
mod generator;
mod inspect;
mod invariants;

use assets::DiskAssets;
use config::{GeneratorConfig, Overrides};

/// The primary Command Line Interface (CLI) configuration.
#[derive(Parser)]
#[command(name = "icon-array")]
#[command(about = "Embed a PNG icon as a C++ RGBA byte array", long_about = None)]
struct Cli {
    /// The sub-command to execute. Defaults to `generate` with default paths.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Turn on verbose logging.
    ///
    /// - `-v`: Debug
    /// - `-vv`: Trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the icon and (re)write the header and source artifacts.
    Generate {
        #[command(flatten)]
        paths: PathArgs,

        /// Print what would be generated without touching any file.
        #[arg(long)]
        dry_run: bool,
    },
    /// Verify that the artifacts on disk match the icon.
    ///
    /// Exits with status 1 when an artifact is missing or stale.
    Check {
        #[command(flatten)]
        paths: PathArgs,
    },
}

/// Where to read the icon and write the artifacts.
#[derive(Args, Default)]
struct PathArgs {
    /// JSON config file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The PNG to embed [default: icon.png].
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory [default: beside the input].
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// File name of the declaration artifact [default: icon.h].
    #[arg(long)]
    header: Option<String>,

    /// File name of the definition artifact [default: icon.cpp].
    #[arg(long)]
    source: Option<String>,
}

impl PathArgs {
    fn resolve(self) -> anyhow::Result<GeneratorConfig> {
        GeneratorConfig::resolve(
            self.config.as_deref(),
            Overrides {
                input: self.input,
                out_dir: self.out_dir,
                header: self.header,
                source: self.source,
            },
        )
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Logging failure shouldn't stop code generation.
    let _ = SimpleLogger::init(log_level, Config::default());

    let (paths, dry_run, check_only) = match cli.command {
        Some(Commands::Generate { paths, dry_run }) => (paths, dry_run, false),
        Some(Commands::Check { paths }) => (paths, false, true),
        None => (PathArgs::default(), false, false),
    };

    let config = match paths.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if check_only {
        match generator::check(&config, &DiskAssets) {
            Ok(outcome) if outcome.is_up_to_date() => info!("Artifacts are up to date."),
            Ok(_) => {
                error!("Artifacts are out of date. Run 'icon-array generate' to refresh them.");
                std::process::exit(1);
            }
            Err(e) => {
                error!("Check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    match generator::generate(&config, &DiskAssets, dry_run) {
        Ok(report) if !report.written => {
            println!("--- DRY RUN: {:?} would contain ---", report.header_path);
            print!("{}", report.artifacts.declaration);
            println!(
                "--- DRY RUN: {:?} would hold {} values for a {}x{} icon ({} bytes of text) ---",
                report.source_path,
                report.byte_len,
                report.width,
                report.height,
                report.artifacts.definition.len()
            );
        }
        Ok(_) => {}
        Err(e) => {
            error!("Failed to generate icon arrays: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_default_generate() {
        let cli = Cli::try_parse_from(["icon-array"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn generate_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "icon-array", "generate", "-i", "art/logo.png", "--header", "logo.h", "--dry-run", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Some(Commands::Generate { paths, dry_run }) = cli.command else {
            panic!("expected generate");
        };
        assert!(dry_run);

        let config = paths.resolve().unwrap();
        assert_eq!(config.input, PathBuf::from("art/logo.png"));
        assert_eq!(config.header_path(), std::path::Path::new("art").join("logo.h"));
        assert_eq!(config.source, "icon.cpp");
    }

    #[test]
    fn bad_artifact_name_is_rejected() {
        let cli = Cli::try_parse_from(["icon-array", "check", "--source", "sub/icon.cpp"]).unwrap();
        let Some(Commands::Check { paths }) = cli.command else {
            panic!("expected check");
        };
        assert!(paths.resolve().is_err());
    }
}
