//! Model archive repacking.
//!
//! Merges a previously produced model archive with user-supplied inference
//! code into a single output tree. The archive is untrusted input and goes
//! through the safe-extraction path; everything after that is sequential
//! file-copy orchestration. The caller archives the output directory itself;
//! no archive is created here.

use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use crate::ExtractionError;
use crate::Result;
use crate::config::ExtractOptions;
use crate::extract::extract_reader;
use crate::filter::TracingSink;
use crate::report::ExtractionReport;

/// One repack invocation.
///
/// All paths are explicit; the surrounding pipeline's directory conventions
/// are the caller's concern.
#[derive(Debug, Clone)]
pub struct RepackRequest {
    /// The previously produced model archive (gzip-compressed tar).
    pub model_archive: PathBuf,

    /// Directory holding the uploaded user code.
    pub code_dir: PathBuf,

    /// Entry point script, relative to `code_dir`.
    pub inference_script: PathBuf,

    /// Dependency files or directories, relative to `code_dir`.
    pub dependencies: Vec<PathBuf>,

    /// Copy the whole code directory into `code/` instead of just the entry
    /// point script.
    pub copy_source_tree: bool,

    /// Directory the merged tree is written into (created if missing,
    /// existing contents merged).
    pub output_dir: PathBuf,

    /// Extraction options for the model archive.
    pub options: ExtractOptions,
}

/// Outcome of a repack run.
#[derive(Debug, Clone)]
pub struct RepackReport {
    /// Report from extracting the model archive.
    pub extraction: ExtractionReport,

    /// Files copied into the output directory by the final merge.
    pub files_merged: usize,
}

/// Runs the repack workflow.
///
/// Steps, in order:
///
/// 1. stage the model archive into a scratch directory,
/// 2. safely extract it into a `src/` staging tree,
/// 3. place the inference script (or the whole code directory) under
///    `src/code/`,
/// 4. copy dependencies into `src/code/lib/` — a directory dependency means
///    the upload flattened the original layout, so the whole code directory
///    is mirrored into `lib/` instead and remaining dependencies are skipped,
/// 5. merge `src/` into the output directory, merging existing directories.
///
/// # Errors
///
/// Any I/O failure aborts the run; blocked archive members do not (they are
/// reported in the returned [`RepackReport`]).
pub fn repack(request: &RepackRequest) -> Result<RepackReport> {
    let staging = TempDir::new()?;

    // Work on a local copy of the archive, as the original may live on
    // storage that does not support rereads.
    let local_archive = staging.path().join("local.tar.gz");
    fs::copy(&request.model_archive, &local_archive)?;

    let src_dir = staging.path().join("src");
    let code_dir = src_dir.join("code");
    fs::create_dir_all(&code_dir)?;

    debug!(archive = %request.model_archive.display(), "extracting model archive");
    let archive = File::open(&local_archive)?;
    let extraction = extract_reader(archive, &src_dir, &request.options, &mut TracingSink)?;

    if request.copy_source_tree {
        // The archive may have shipped its own code/ directory; the
        // user-supplied tree replaces it wholesale.
        if code_dir.exists() {
            fs::remove_dir_all(&code_dir)?;
        }
        copy_tree(&request.code_dir, &code_dir)?;
    } else {
        let entry_point = request.code_dir.join(&request.inference_script);
        let dest = code_dir.join(&request.inference_script);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&entry_point, &dest)?;
    }

    copy_dependencies(request, &code_dir)?;

    let files_merged = copy_tree(&src_dir, &request.output_dir)?;
    debug!(files = files_merged, output = %request.output_dir.display(), "merge complete");

    Ok(RepackReport {
        extraction,
        files_merged,
    })
}

fn copy_dependencies(request: &RepackRequest, code_dir: &Path) -> Result<()> {
    for dependency in &request.dependencies {
        let actual = request.code_dir.join(dependency);
        let lib_dir = code_dir.join("lib");

        if actual.is_file() {
            fs::create_dir_all(&lib_dir)?;
            let file_name = actual.file_name().ok_or_else(|| {
                ExtractionError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("dependency has no file name: {}", dependency.display()),
                ))
            })?;
            fs::copy(&actual, lib_dir.join(file_name))?;
        } else {
            // A directory dependency: the upload flattened the original
            // layout, so the whole code directory stands in for it.
            if lib_dir.exists() {
                fs::remove_dir_all(&lib_dir)?;
            }
            copy_tree(&request.code_dir, &lib_dir)?;
            break;
        }
    }

    Ok(())
}

/// Copies `src` into `dst` with merge semantics: directories that already
/// exist are reused, files are overwritten. Symlinks are followed, so the
/// output tree contains plain files only.
///
/// Returns the number of files copied.
fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| std::io::Error::other("walked entry outside copy root"))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}
