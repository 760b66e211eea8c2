//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use anyhow::Context;
use anyhow::Result;
use repack_core::ExtractOptions;
use repack_core::extract_archive;
use std::env;

pub fn execute(args: &ExtractArgs) -> Result<()> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let options = ExtractOptions {
        filter: args.filter.into(),
    };

    let report = add_archive_context(
        extract_archive(&args.archive, &output_dir, &options),
        &args.archive,
    )?;

    println!(
        "Extracted {} items ({} files, {} directories, {} links) to {}",
        report.total_items(),
        report.files_extracted,
        report.directories_created,
        report.symlinks_created + report.hardlinks_created,
        output_dir.display()
    );

    if report.has_blocked() {
        println!("Blocked {} members:", report.blocked.len());
        for blocked in &report.blocked {
            match &blocked.link_target {
                Some(target) => println!(
                    "  {} ({}, target {})",
                    blocked.name.display(),
                    blocked.classification,
                    target.display()
                ),
                None => println!("  {} ({})", blocked.name.display(), blocked.classification),
            }
        }
    }

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(())
}
