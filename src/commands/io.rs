//! Import and export command handlers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stockpile::config::StockpileConfig;
use stockpile::io::archive::{archive_size, probe_archive};
use stockpile::io::{
    CancellationToken, ExportLayout, ExportOptions, ExportService, ImportOptions, ImportService,
    Progress, Stage,
};
use stockpile::storage::SqliteStore;
use stockpile::{Error, Result};

/// Prints a single updating progress line.
fn print_progress(progress: &Progress) {
    print!(
        "\r[{:>3}%] {:<12} {:<60}",
        progress.percent,
        progress.stage.as_str(),
        progress.message
    );
    if progress.stage == Stage::Complete {
        println!();
    }
    let _ = std::io::stdout().flush();
}

/// Executes the export command.
pub fn cmd_export(
    config: &StockpileConfig,
    output_dir: Option<PathBuf>,
    layout: &str,
    cancel: CancellationToken,
) -> Result<()> {
    let layout = layout.parse::<ExportLayout>()?;
    let store = Arc::new(SqliteStore::new(&config.database_path)?);
    let service = ExportService::new(store, config.clone());

    let mut options = ExportOptions::default()
        .with_layout(layout)
        .with_cancellation(cancel);
    options.output_dir = output_dir;

    let result = service.export(&options, Some(&print_progress))?;

    println!();
    println!("Export completed:");
    println!("  Layout:        {}", result.layout);
    println!("  Path:          {}", result.path.display());
    println!("  Items:         {}", result.items);
    println!("  Transactions:  {}", result.transactions);
    println!("  Images:        {}", result.images_copied);
    if result.images_failed > 0 {
        println!("  Images failed: {}", result.images_failed);
    }
    if let Some(bytes) = result.archive_bytes {
        println!("  Archive size:  {bytes} bytes");
    }
    Ok(())
}

/// Executes the import command.
pub fn cmd_import(config: &StockpileConfig, path: &Path, cancel: CancellationToken) -> Result<()> {
    let store = Arc::new(SqliteStore::new(&config.database_path)?);
    let service = ImportService::new(store, config);
    let options = ImportOptions::default().with_cancellation(cancel);

    let result = match service.import_from_path(path, &options, Some(&print_progress)) {
        Ok(result) => result,
        Err(e) if e.needs_manual_extraction() => {
            println!();
            println!("This archive is too large to import directly.");
            println!("Extract it with any ZIP tool, then run:");
            println!("  stockpile import <extracted-folder>");
            return Err(e);
        },
        Err(e) => return Err(e),
    };

    println!();
    println!("{}", result.summary());

    print_messages("Warnings", &result.warnings);
    print_messages("Errors", &result.errors);
    if result.suppressed_messages > 0 {
        println!();
        println!("({} further messages were not recorded)", result.suppressed_messages);
    }
    Ok(())
}

/// Executes the probe command.
pub fn cmd_probe(config: &StockpileConfig, archive: &Path) -> Result<()> {
    let limit = config.transfer.archive_memory_limit;
    let safe = probe_archive(archive, limit)?;
    let size = archive_size(archive)?;

    if safe {
        println!(
            "{}: {size} bytes, within the {limit} byte limit; safe to import directly.",
            archive.display()
        );
        Ok(())
    } else {
        Err(Error::ArchiveTooLarge { size, limit })
    }
}

fn print_messages(title: &str, messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    println!();
    println!("{title} ({}):", messages.len());
    for message in messages.iter().take(10) {
        println!("  - {message}");
    }
    if messages.len() > 10 {
        println!("  ... and {} more", messages.len() - 10);
    }
}
