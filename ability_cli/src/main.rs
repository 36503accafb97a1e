mod input;
mod logging;

use std::path::{Path, PathBuf};

use ability_core::{
    group_rules, CompressError, CompressionReport, CompressorConfig, Polarity, RuleCompressor,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, Level};

use input::{load_rules, RuleEntry};

#[derive(Debug, Parser)]
#[command(name = "ability-cli", version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compress a rule file and print the surviving rules as JSON
    Compress {
        /// Rule file (.json or .toml)
        #[arg(long)]
        rules: PathBuf,

        /// Compressor config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Decision applied when no rule matches
        #[arg(long)]
        default_decision: Option<Polarity>,

        /// Compress groups in parallel
        #[arg(long)]
        parallel: bool,

        /// Include the removal report in the output
        #[arg(long)]
        report: bool,
    },
    /// Validate a rule file and list its groups
    Check {
        /// Rule file (.json or .toml)
        #[arg(long)]
        rules: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    rules: Vec<RuleEntry>,
    report: &'a CompressionReport,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let result = match cli.command {
        Commands::Compress {
            rules,
            config,
            default_decision,
            parallel,
            report,
        } => resolve_config(config.as_deref(), default_decision, parallel)
            .and_then(|config| compress_file(&rules, config, report)),
        Commands::Check { rules } => check_file(&rules),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load the config file, if any, and apply flag overrides.
fn resolve_config(
    path: Option<&Path>,
    default_decision: Option<Polarity>,
    parallel: bool,
) -> Result<CompressorConfig, CompressError> {
    let mut config = match path {
        Some(path) => CompressorConfig::from_file(path)?,
        None => CompressorConfig::default(),
    };
    if let Some(decision) = default_decision {
        config = config.with_default_decision(decision);
    }
    if parallel {
        config = config.with_parallel(true);
    }
    Ok(config)
}

fn compress_file(
    path: &Path,
    config: CompressorConfig,
    with_report: bool,
) -> Result<String, CompressError> {
    let rules = load_rules(path)?;
    info!(path = %path.display(), rules = rules.len(), "Loaded rule file");

    let compressed = RuleCompressor::new(config).compress(&rules)?;
    let entries: Vec<RuleEntry> = compressed.rules.iter().map(|&rule| rule.into()).collect();

    let output = if with_report {
        serde_json::to_string_pretty(&ReportOutput {
            rules: entries,
            report: &compressed.report,
        })?
    } else {
        serde_json::to_string_pretty(&entries)?
    };
    Ok(output)
}

fn check_file(path: &Path) -> Result<String, CompressError> {
    let rules = load_rules(path)?;
    let groups = group_rules(&rules);

    let mut lines = Vec::with_capacity(groups.len() + 1);
    for group in &groups {
        group.validate()?;
        lines.push(format!("{}: {} rules", group.key(), group.len()));
    }
    lines.push(format!("{} rules in {} groups, OK", rules.len(), groups.len()));
    Ok(lines.join("\n"))
}
