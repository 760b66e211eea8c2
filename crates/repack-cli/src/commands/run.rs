//! Run (repack) command implementation.

use crate::cli::RunArgs;
use crate::error::add_archive_context;
use anyhow::Result;
use repack_core::ExtractOptions;
use repack_core::RepackRequest;
use repack_core::repack::repack;

pub fn execute(args: &RunArgs) -> Result<()> {
    let request = RepackRequest {
        model_archive: args.model_archive.clone(),
        code_dir: args.code_dir.clone(),
        inference_script: args.inference_script.clone(),
        dependencies: args.dependencies.clone(),
        copy_source_tree: args.source_dir,
        output_dir: args.output_dir.clone(),
        options: ExtractOptions {
            filter: args.filter.into(),
        },
    };

    let report = add_archive_context(repack(&request), &args.model_archive)?;

    println!(
        "Repacked {} into {} ({} files merged, {} archive members blocked)",
        args.model_archive.display(),
        args.output_dir.display(),
        report.files_merged,
        report.extraction.blocked.len()
    );

    for warning in &report.extraction.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(())
}
