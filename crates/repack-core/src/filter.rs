//! Member classification and the safe-extraction filter.
//!
//! Every member of an untrusted archive maps to exactly one
//! [`Classification`]. Safe members proceed to extraction; blocked members
//! are reported through a [`DiagnosticSink`] and skipped. A member is
//! atomically included or excluded — there is no partial extraction of a
//! single member.

use std::path::Path;

use tracing::warn;

use crate::Result;
use crate::resolve::resolve_under;
use crate::types::ArchiveMember;
use crate::types::BaseDir;

/// Outcome of classifying one archive member.
///
/// Per member the state machine is linear and terminal: unclassified, then
/// exactly one of these. There are no retries and no re-classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The member's resolved location and (for links) resolved target both
    /// stay within the base directory.
    Safe,

    /// The member's resolved location escapes the base directory.
    BlockedPath,

    /// The symlink's resolved target escapes the base directory.
    BlockedSymlink,

    /// The hardlink's resolved target escapes the base directory.
    BlockedHardlink,
}

impl Classification {
    /// Returns `true` for members that may be extracted.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Safe)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::BlockedPath => write!(f, "illegal path"),
            Self::BlockedSymlink => write!(f, "symlink target outside base directory"),
            Self::BlockedHardlink => write!(f, "hardlink target outside base directory"),
        }
    }
}

/// Receives one diagnostic per blocked member.
///
/// Injected rather than global so the filter is testable without capturing
/// process-wide log output.
pub trait DiagnosticSink {
    /// Called once for each member excluded from extraction.
    fn member_blocked(&mut self, member: &ArchiveMember, classification: Classification);
}

/// Default sink: one `tracing` warning per blocked member, carrying the
/// member name and, for links, the declared target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn member_blocked(&mut self, member: &ArchiveMember, classification: Classification) {
        match classification {
            Classification::BlockedSymlink | Classification::BlockedHardlink => {
                let target = member.link_target().unwrap_or_else(|| Path::new(""));
                warn!(
                    member = %member.name().display(),
                    target = %target.display(),
                    "member blocked: {classification}"
                );
            }
            _ => {
                warn!(member = %member.name().display(), "member blocked: {classification}");
            }
        }
    }
}

/// Sink that discards all diagnostics.
#[derive(Debug, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn member_blocked(&mut self, _member: &ArchiveMember, _classification: Classification) {}
}

/// Classifies a single member against the base directory.
///
/// Two-stage check:
///
/// 1. **Path check** — the member name, resolved against the base, must stay
///    within the base directory.
/// 2. **Link check** (symlinks and hardlinks only) — the declared target,
///    resolved against the canonical directory that will contain the link
///    (`tip`), must also stay within the base directory. A link's *name* can
///    be perfectly safe while its *target* points at `/etc/passwd`; once such
///    a link exists on disk, later readers follow it out of the sandbox, so
///    neither check alone is sufficient.
///
/// Containment is compared with `Path::starts_with`, which matches whole
/// components only — `/out` is never treated as a prefix of `/outside`.
///
/// # Errors
///
/// Returns an error when resolution itself fails
/// ([`ExtractionError::Resolution`](crate::ExtractionError::Resolution));
/// a member whose safety cannot be determined is never classified `Safe`.
pub fn classify(member: &ArchiveMember, base: &BaseDir) -> Result<Classification> {
    let resolved = resolve_under(base.as_path(), member.name())?;
    if !resolved.starts_with(base.as_path()) {
        return Ok(Classification::BlockedPath);
    }

    if let Some(target) = member.link_target() {
        // Targets are interpreted relative to the directory containing the
        // link, which may itself resolve elsewhere if an earlier member
        // created it as a symlink.
        let link_dir = member.name().parent().unwrap_or_else(|| Path::new(""));
        let tip = resolve_under(base.as_path(), link_dir)?;
        let target_resolved = resolve_under(&tip, target)?;

        if !target_resolved.starts_with(base.as_path()) {
            return Ok(if member.kind().is_symlink() {
                Classification::BlockedSymlink
            } else {
                Classification::BlockedHardlink
            });
        }
    }

    Ok(Classification::Safe)
}

/// Filters a member list down to the subset that is safe to extract.
///
/// Order is preserved. One diagnostic is emitted per blocked member. The
/// result is computed eagerly; running the filter twice over the same
/// members with no intervening filesystem change yields the same
/// classifications.
///
/// # Errors
///
/// Propagates resolution failures; everything else is a classification, not
/// an error.
pub fn safe_members(
    members: &[ArchiveMember],
    base: &BaseDir,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<ArchiveMember>> {
    let mut safe = Vec::with_capacity(members.len());

    for member in members {
        let classification = classify(member, base)?;
        if classification.is_safe() {
            safe.push(member.clone());
        } else {
            sink.member_blocked(member, classification);
        }
    }

    Ok(safe)
}
