//! Command-line interface for swbk.
//!
//! Provides commands for converting emoscroll backups and scraped iCity
//! entries into swbk bundles, inspecting bundles, and showing configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::adapters::{build_archive, DiarySource, EmoscrollSource, ICitySource};
use crate::archive::{list_entries, list_tree, ExportSummary, ExportTarget, ZipExport};
use crate::config;

/// swbk - Convert diary exports into swbk bundles
#[derive(Parser, Debug)]
#[command(name = "swbk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert an emoscroll backup (.esm)
    Emoscroll {
        /// Backup file
        backup: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Convert scraped iCity entries (JSON array of {text, datetime, photos})
    Icity {
        /// Scraped entries file
        entries: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// List the files of a bundle (zip or folder)
    Inspect {
        /// Bundle path
        path: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Export options shared by the conversion commands
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output path (defaults to <output_dir>/export_<unix time>.zip)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a plain folder instead of a zip
    #[arg(long)]
    pub folder: bool,

    /// Scratch directory for zip exports
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Remove the scratch directory after a zip export
    #[arg(long)]
    pub cleanup: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Emoscroll { backup, export } => {
                let source = EmoscrollSource::open(&backup)
                    .with_context(|| format!("Failed to open backup: {}", backup.display()))?;
                convert(&source, export).await
            }
            Commands::Icity { entries, export } => {
                let settings = &config::config()?.icity;
                let source = ICitySource::from_file(&entries, settings)
                    .with_context(|| format!("Failed to load entries: {}", entries.display()))?;
                convert(&source, export).await
            }
            Commands::Inspect { path } => inspect(&path),
            Commands::Config => show_config(),
        }
    }
}

/// Collect diaries from `source` and export them
async fn convert(source: &dyn DiarySource, args: ExportArgs) -> Result<()> {
    let cfg = config::config()?;

    eprintln!("📥 Reading {} export...", source.name());
    let archive = build_archive(source, None)
        .await
        .with_context(|| format!("Failed to read {} export", source.name()))?;

    let target = export_target(cfg, &args, archive.time as i64);
    let summary = archive.export(target).context("Failed to export archive")?;

    print_summary(&summary);
    Ok(())
}

/// Pick the export destination from CLI args and configuration
fn export_target(cfg: &config::ResolvedConfig, args: &ExportArgs, started: i64) -> ExportTarget {
    if args.folder {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| cfg.output_dir.join(format!("export_{}", started)));
        return ExportTarget::Folder(path);
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| cfg.default_output(started));
    let mut options = ZipExport::new(path).with_cleanup(args.cleanup || cfg.cleanup_scratch);
    if let Some(dir) = args.scratch_dir.clone().or_else(|| cfg.scratch_dir.clone()) {
        options = options.with_scratch_dir(dir);
    }
    ExportTarget::Zip(options)
}

fn print_summary(summary: &ExportSummary) {
    eprintln!("\n✅ Export complete!");
    match &summary.archive_path {
        Some(path) => eprintln!("   Archive: {}", path.display()),
        None => eprintln!("   Folder: {}", summary.root.display()),
    }
    eprintln!("   Diaries: {}", summary.records.len());
    eprintln!(
        "   Media: {} written, {} shared, {} skipped",
        summary.media_written, summary.media_reused, summary.media_skipped
    );
}

/// List the files of a zip or folder bundle
fn inspect(path: &Path) -> Result<()> {
    let entries = if path.is_dir() {
        list_tree(path)?
    } else {
        list_entries(path).with_context(|| format!("Failed to read zip: {}", path.display()))?
    };

    for entry in &entries {
        println!("{}", entry);
    }
    eprintln!("\nTotal: {} files", entries.len());

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("swbk configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Export:");
    println!("  Output dir:      {}", cfg.output_dir.display());
    println!(
        "  Scratch dir:     {}",
        cfg.scratch_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(next to the zip)".to_string())
    );
    println!("  Cleanup scratch: {}", cfg.cleanup_scratch);
    println!();
    println!("iCity:");
    println!("  User-Agent: {}", cfg.icity.user_agent);
    println!("  Referer:    {}", cfg.icity.referer);

    Ok(())
}
