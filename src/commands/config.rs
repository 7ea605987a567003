//! Config command handler.

use stockpile::config::StockpileConfig;

/// Config command.
pub fn cmd_config(config: &StockpileConfig, show: bool) {
    if !show {
        println!("Use --show to display the current configuration.");
        return;
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Data Directory: {}", config.data_dir.display());
    println!("Database: {}", config.database_path.display());
    println!("Image Store: {}", config.image_dir.display());
    println!("Export Directory: {}", config.export_dir.display());
    println!("Staging Root: {}", config.staging_root.display());
    println!();

    let t = &config.transfer;
    println!("Transfer:");
    println!("  Write Batch Size: {}", t.write_batch_size);
    println!("  Item Yield Interval: {}", t.item_yield_interval);
    println!("  Transaction Yield Interval: {}", t.transaction_yield_interval);
    println!("  Image Yield Interval: {}", t.image_yield_interval);
    println!("  Batch Pause: {}ms", t.batch_pause.as_millis());
    println!("  Compression Level: {}", t.compression_level);
    println!(
        "  Archive Memory Limit: {} MiB",
        t.archive_memory_limit / (1024 * 1024)
    );
    println!();

    println!("Logging:");
    println!("  Filter: {}", config.logging.filter);
    println!("  Format: {:?}", config.logging.format);
    println!(
        "  File: {}",
        config
            .logging
            .file
            .as_ref()
            .map_or_else(|| "(stderr)".to_string(), |p| p.display().to_string())
    );
}
