//! # colloquy-logs CLI
//!
//! Command-line interface for the colloquy-logs library.

use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use colloquy_logs::cli::{Args, Command, ConvertArgs, MergeArgs};
use colloquy_logs::config::IncomingOnlyPolicy;
use colloquy_logs::convert::Converter;
use colloquy_logs::merge::merge_trees;
use colloquy_logs::LogError;

fn main() {
    let args = <Args as ClapParser>::parse();

    if let Err(e) = init_tracing(args.log_level()) {
        eprintln!("⚠️  Logging unavailable: {}", e);
    }

    if let Err(e) = run(&args) {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

fn run(args: &Args) -> Result<(), LogError> {
    println!("📦 colloquy-logs v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match &args.command {
        Command::Convert(convert) => run_convert(convert),
        Command::Merge(merge) => run_merge(merge),
    }
}

fn run_convert(args: &ConvertArgs) -> Result<(), LogError> {
    let start = Instant::now();
    let converter = Converter::new(args.to_config());

    println!("📂 Source:   {}", args.source.display());
    println!("🌐 Network:  {}", converter.config().network);
    println!("💾 Output:   {}", converter.converted_root(&args.source).display());
    println!();

    println!("⏳ Converting transcripts...");
    let report = converter.run(&args.source)?;

    println!();
    println!("✅ Done! Logs saved to {}", report.converted_root.display());

    println!();
    println!("📊 Summary:");
    println!("   Converted: {} transcripts", report.converted.len());
    println!("   Lines:     {}", report.total_lines());
    if report.total_skipped() > 0 {
        println!("   Skipped:   {} entries", report.total_skipped());
    }
    if !report.failed.is_empty() {
        println!("   Failed:    {} transcripts", report.failed.len());
        for failed in &report.failed {
            println!("     ⚠️  {}: {}", failed.source.display(), failed.reason);
        }
    }

    println!();
    println!("⚡ Total time: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn run_merge(args: &MergeArgs) -> Result<(), LogError> {
    let start = Instant::now();
    let config = args.to_config();

    println!("📚 Reference: {}", args.reference.display());
    println!("📥 Incoming:  {}", args.incoming.display());
    match &config.output_dir {
        Some(dir) => println!("💾 Output:    {}", dir.display()),
        None => println!(
            "💾 Output:    in place (backups: {})",
            if config.backup { "on" } else { "off" }
        ),
    }
    if config.parallel && cfg!(feature = "parallel") {
        println!("🧵 Mode:      Parallel");
    }
    println!();

    println!("🔀 Merging logs...");
    let report = merge_trees(&args.reference, &args.incoming, &config)?;
    let totals = report.totals();

    println!();
    println!("✅ Done! {} of {} files updated", report.files_written(), report.merged.len());

    println!();
    println!("📊 Summary:");
    println!("   Reference:  {} lines", totals.reference_lines);
    println!("   Incoming:   {} lines", totals.incoming_lines);
    println!(
        "   Duplicates: {} ({:.1}% of incoming)",
        totals.duplicates,
        totals.duplicate_ratio()
    );
    println!("   Added:      {} lines", totals.added());
    if totals.unparsed > 0 {
        println!("   Unparsed:   {} lines", totals.unparsed);
    }
    if totals.out_of_order() > 0 {
        println!("   ⚠️  Out of order: {} lines", totals.out_of_order());
    }

    if !report.incoming_only.is_empty() {
        println!();
        match config.incoming_only {
            IncomingOnlyPolicy::Copy => {
                println!("📋 Copied {} incoming-only files", report.copied.len());
            }
            IncomingOnlyPolicy::Report => {
                println!("📋 {} incoming-only files (not merged):", report.incoming_only.len());
                for file in &report.incoming_only {
                    println!("   {}", file.relative.display());
                }
            }
            IncomingOnlyPolicy::Ignore => {}
        }
    }

    println!();
    println!("⚡ Total time: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}
