//! Archive extraction with safety filtering.
//!
//! Two interchangeable implementations satisfy the extraction contract; the
//! choice between them is made once per call (see
//! [`FilterStrategy`](crate::config::FilterStrategy)), not scattered through
//! the member loop:
//!
//! - the **delegated** path hands each entry to the `tar` crate's own
//!   unpacker, whose containment policy confines entry paths and link
//!   targets to the destination;
//! - the **member** path runs this crate's classifier
//!   ([`filter::classify`](crate::filter::classify)) and writes only the
//!   members proven safe, reporting each blocked member individually.

use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::ExtractionError;
use crate::Result;
use crate::config::ExtractOptions;
use crate::config::FilterStrategy;
use crate::filter::DiagnosticSink;
use crate::filter::TracingSink;
use crate::filter::classify;
use crate::report::ExtractionReport;
use crate::resolve::normalize_lexical;
use crate::types::ArchiveMember;
use crate::types::BaseDir;
use crate::types::MemberKind;

/// Whether the linked `tar` crate provides its own extraction containment
/// policy for `Auto` to prefer.
///
/// Single point to flip if a future unpacker loses that policy; everything
/// else treats strategy selection as opaque.
const fn delegated_filter_available() -> bool {
    true
}

fn select_strategy(options: &ExtractOptions) -> FilterStrategy {
    match options.filter {
        FilterStrategy::Auto => {
            if delegated_filter_available() {
                FilterStrategy::Delegated
            } else {
                FilterStrategy::Members
            }
        }
        explicit => explicit,
    }
}

/// Extracts a gzip-compressed tar archive file to `dest`.
///
/// Convenience wrapper over [`extract_reader`] that opens the file and sends
/// diagnostics to the `tracing` log.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or read, if a path
/// needed for a safety decision cannot be resolved, or if writing a safe
/// member fails.
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    dest: Q,
    options: &ExtractOptions,
) -> Result<ExtractionReport> {
    let file = File::open(archive_path.as_ref())?;
    extract_reader(file, dest.as_ref(), options, &mut TracingSink)
}

/// Extracts a gzip-compressed tar stream to `dest`.
///
/// This is the collaborator interface: the caller owns opening and closing
/// the handle; this function's side effect is the populated directory. The
/// destination must already exist and be writable. Members are processed
/// strictly in archive order, synchronously; a blocked member never
/// half-writes.
///
/// # Errors
///
/// Returns an error if the stream is not a readable gzip-tar archive, if a
/// safety decision cannot be made ([`ExtractionError::Resolution`]), or if
/// writing a safe member fails (fail-closed; there is no partial-archive
/// tolerance).
pub fn extract_reader<R: Read>(
    reader: R,
    dest: &Path,
    options: &ExtractOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<ExtractionReport> {
    let base = BaseDir::new(dest)?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    match select_strategy(options) {
        FilterStrategy::Members => extract_with_member_filter(&mut archive, &base, sink),
        _ => extract_delegated(&mut archive, &base),
    }
}

/// Delegated strategy: every entry goes through the platform unpacker.
///
/// The unpacker refuses entries whose path leaves the destination and errors
/// on link targets that escape it, so a malicious archive aborts the pass
/// here rather than being skipped member by member.
fn extract_delegated<R: Read>(
    archive: &mut tar::Archive<R>,
    base: &BaseDir,
) -> Result<ExtractionReport> {
    let mut report = ExtractionReport::new();

    let entries = archive
        .entries()
        .map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;
        let member = ArchiveMember::from_entry(&entry)?;
        let size = entry.size();

        if entry.unpack_in(base.as_path())? {
            debug!(member = %member.name().display(), "extracted");
            count_member(&mut report, member.kind(), size);
        } else {
            report.add_warning(format!(
                "refused by platform filter: {}",
                member.name().display()
            ));
        }
    }

    Ok(report)
}

/// Member-filter strategy: classify each member, write only the safe ones.
///
/// Classification happens against the filesystem state at the time the
/// member is reached, so a directory that an earlier member created as a
/// symlink is seen as what it resolves to, not as what the archive called
/// it.
fn extract_with_member_filter<R: Read>(
    archive: &mut tar::Archive<R>,
    base: &BaseDir,
    sink: &mut dyn DiagnosticSink,
) -> Result<ExtractionReport> {
    let mut report = ExtractionReport::new();

    let entries = archive
        .entries()
        .map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ExtractionError::InvalidArchive(e.to_string()))?;
        let member = ArchiveMember::from_entry(&entry)?;

        let classification = classify(&member, base)?;
        if !classification.is_safe() {
            sink.member_blocked(&member, classification);
            report.record_blocked(&member, classification);
            continue;
        }

        write_member(&mut entry, &member, base, &mut report)?;
    }

    Ok(report)
}

fn count_member(report: &mut ExtractionReport, kind: &MemberKind, size: u64) {
    match kind {
        MemberKind::File => {
            report.files_extracted += 1;
            report.bytes_written += size;
        }
        MemberKind::Directory => report.directories_created += 1,
        MemberKind::Symlink { .. } => report.symlinks_created += 1,
        MemberKind::Hardlink { .. } => report.hardlinks_created += 1,
        MemberKind::Other => {}
    }
}

/// Writes one safe member under the base directory.
///
/// Standard extraction semantics: directories created as needed, file
/// contents streamed, links created pointing at their declared targets.
/// Hardlink targets follow the archive convention of being relative to the
/// archive root, so they are joined to the base after lexical normalization.
fn write_member<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    member: &ArchiveMember,
    base: &BaseDir,
    report: &mut ExtractionReport,
) -> Result<()> {
    let dest_path = base.join_path(member.name());

    match member.kind() {
        MemberKind::Directory => {
            fs::create_dir_all(&dest_path)?;
            report.directories_created += 1;
        }
        MemberKind::File => {
            create_parent(&dest_path)?;
            let mut out = File::create(&dest_path)?;
            let bytes = std::io::copy(entry, &mut out)?;

            #[cfg(unix)]
            if let Some(mode) = member.mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
            }

            report.files_extracted += 1;
            report.bytes_written += bytes;
        }
        MemberKind::Symlink { target } => {
            create_parent(&dest_path)?;

            #[cfg(unix)]
            {
                std::os::unix::fs::symlink(target, &dest_path)?;
                report.symlinks_created += 1;
            }

            #[cfg(not(unix))]
            {
                let _ = target;
                report.add_warning(format!(
                    "symlink not supported on this platform: {}",
                    member.name().display()
                ));
            }
        }
        MemberKind::Hardlink { target } => {
            create_parent(&dest_path)?;

            let normalized = normalize_lexical(target);
            let link_source = if normalized.is_absolute() {
                normalized
            } else {
                base.join_path(&normalized)
            };
            fs::hard_link(&link_source, &dest_path)?;
            report.hardlinks_created += 1;
        }
        MemberKind::Other => {
            report.add_warning(format!(
                "unsupported member kind skipped: {}",
                member.name().display()
            ));
        }
    }

    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::filter::NoopSink;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn gz_archive<F>(build: F) -> Vec<u8>
    where
        F: FnOnce(&mut tar::Builder<GzEncoder<Vec<u8>>>),
    {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        build(&mut builder);
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }

    fn append_file(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        // Write the name directly into the GNU header so fixtures can carry
        // path-traversal names like `../b.txt`; `set_path`/`append_data` reject
        // `..`, which would prevent building these malicious-archive fixtures.
        let name_bytes = path.as_bytes();
        let gnu = header.as_gnu_mut().unwrap();
        gnu.name[..name_bytes.len()].copy_from_slice(name_bytes);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    fn append_symlink(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, path: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        builder.append_link(&mut header, path, target).unwrap();
    }

    #[test]
    fn test_extract_members_plain_files() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_file(b, "a.txt", b"alpha");
            append_file(b, "sub/c.txt", b"gamma");
        });

        let options = ExtractOptions::with_member_filter();
        let report = extract_reader(&data[..], temp.path(), &options, &mut NoopSink).unwrap();

        assert_eq!(report.files_extracted, 2);
        assert!(!report.has_blocked());
        assert_eq!(
            fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "alpha"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("sub/c.txt")).unwrap(),
            "gamma"
        );
    }

    #[test]
    fn test_extract_members_blocks_traversal() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_file(b, "a.txt", b"alpha");
            append_file(b, "../b.txt", b"escape");
            append_file(b, "sub/c.txt", b"gamma");
        });

        let options = ExtractOptions::with_member_filter();
        let report = extract_reader(&data[..], temp.path(), &options, &mut NoopSink).unwrap();

        assert_eq!(report.files_extracted, 2);
        assert_eq!(report.blocked.len(), 1);
        assert!(temp.path().join("a.txt").exists());
        assert!(temp.path().join("sub/c.txt").exists());
        assert!(!temp.path().parent().unwrap().join("b.txt").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_members_blocks_escaping_symlink() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_symlink(b, "ok", "../../secret");
            append_file(b, "kept.txt", b"kept");
        });

        let options = ExtractOptions::with_member_filter();
        let report = extract_reader(&data[..], temp.path(), &options, &mut NoopSink).unwrap();

        assert_eq!(report.symlinks_created, 0);
        assert_eq!(report.blocked.len(), 1);
        // symlink_metadata, so even a dangling link would be seen
        assert!(temp.path().join("ok").symlink_metadata().is_err());
        assert!(temp.path().join("kept.txt").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_extract_members_creates_safe_symlink() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_file(b, "target.txt", b"contents");
            append_symlink(b, "link", "target.txt");
        });

        let options = ExtractOptions::with_member_filter();
        let report = extract_reader(&data[..], temp.path(), &options, &mut NoopSink).unwrap();

        assert_eq!(report.symlinks_created, 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("link")).unwrap(),
            "contents"
        );
    }

    fn append_hardlink(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, path: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Link);
        header.set_size(0);
        builder.append_link(&mut header, path, target).unwrap();
    }

    #[test]
    fn test_extract_members_creates_hardlink() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_file(b, "orig.txt", b"shared");
            append_hardlink(b, "copy.txt", "orig.txt");
        });

        let options = ExtractOptions::with_member_filter();
        let report = extract_reader(&data[..], temp.path(), &options, &mut NoopSink).unwrap();

        assert_eq!(report.hardlinks_created, 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("copy.txt")).unwrap(),
            "shared"
        );
    }

    #[test]
    fn test_extract_members_preserves_order_and_dirs() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
            b.append_data(&mut header, "nested/dir/", &[][..]).unwrap();
            append_file(b, "nested/dir/file.txt", b"x");
        });

        let options = ExtractOptions::with_member_filter();
        let report = extract_reader(&data[..], temp.path(), &options, &mut NoopSink).unwrap();

        assert_eq!(report.directories_created, 1);
        assert_eq!(report.files_extracted, 1);
        assert!(temp.path().join("nested/dir/file.txt").exists());
    }

    #[test]
    fn test_extract_delegated_plain_files() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_file(b, "a.txt", b"alpha");
            append_file(b, "sub/c.txt", b"gamma");
        });

        // Auto resolves to the delegated strategy.
        let report =
            extract_reader(&data[..], temp.path(), &ExtractOptions::default(), &mut NoopSink)
                .unwrap();

        assert_eq!(report.files_extracted, 2);
        assert!(temp.path().join("a.txt").exists());
        assert!(temp.path().join("sub/c.txt").exists());
    }

    #[test]
    fn test_extract_delegated_never_writes_outside() {
        let temp = TempDir::new().unwrap();
        let data = gz_archive(|b| {
            append_file(b, "../b.txt", b"escape");
            append_file(b, "a.txt", b"alpha");
        });

        let result = extract_reader(
            &data[..],
            temp.path(),
            &ExtractOptions::default(),
            &mut NoopSink,
        );

        // The platform filter either refuses the entry or aborts the pass;
        // in no case does the file land outside the destination.
        assert!(!temp.path().parent().unwrap().join("b.txt").exists());
        if let Ok(report) = result {
            assert!(report.has_warnings());
        }
    }

    #[test]
    fn test_extract_invalid_stream() {
        let temp = TempDir::new().unwrap();
        let result = extract_reader(
            &b"not a gzip stream"[..],
            temp.path(),
            &ExtractOptions::default(),
            &mut NoopSink,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_nonexistent_dest() {
        let data = gz_archive(|b| append_file(b, "a.txt", b"alpha"));
        let result = extract_reader(
            &data[..],
            Path::new("/nonexistent/dest/dir"),
            &ExtractOptions::default(),
            &mut NoopSink,
        );
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(
            select_strategy(&ExtractOptions::default()),
            FilterStrategy::Delegated
        );
        assert_eq!(
            select_strategy(&ExtractOptions::with_member_filter()),
            FilterStrategy::Members
        );
        assert_eq!(
            select_strategy(&ExtractOptions {
                filter: FilterStrategy::Delegated,
            }),
            FilterStrategy::Delegated
        );
    }
}
