//! Archive member description.

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;

/// Kind of an archive member.
///
/// Link variants carry the target path exactly as declared in the archive.
/// Declared targets are attacker-controlled and have NOT been validated;
/// they must pass classification before anything is created on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Regular file.
    File,

    /// Directory.
    Directory,

    /// Symbolic link.
    Symlink {
        /// The declared link target (not yet validated).
        target: PathBuf,
    },

    /// Hard link.
    Hardlink {
        /// The declared link target (not yet validated).
        target: PathBuf,
    },

    /// Anything else the tar format can carry (fifo, device, ...).
    Other,
}

impl MemberKind {
    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if this is a symlink.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink { .. })
    }

    /// Returns `true` if this is a hardlink.
    #[must_use]
    pub const fn is_hardlink(&self) -> bool {
        matches!(self, Self::Hardlink { .. })
    }
}

/// One entry from an archive's table of contents.
///
/// Immutable once read; its lifetime is a single extraction pass. The `name`
/// is the relative path exactly as declared in the archive and is treated as
/// attacker-controlled everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    name: PathBuf,
    kind: MemberKind,
    mode: Option<u32>,
}

impl ArchiveMember {
    /// Creates a member from its declared name and kind.
    #[must_use]
    pub fn new(name: impl Into<PathBuf>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mode: None,
        }
    }

    /// Sets the file mode declared in the archive.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Reads name, kind and mode out of a tar entry header.
    pub(crate) fn from_entry<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Self> {
        let name = entry.path()?.into_owned();
        let header = entry.header();

        let entry_type = header.entry_type();
        let kind = if entry_type.is_symlink() {
            MemberKind::Symlink {
                target: link_target(entry, &name)?,
            }
        } else if entry_type.is_hard_link() {
            MemberKind::Hardlink {
                target: link_target(entry, &name)?,
            }
        } else if entry_type.is_dir() {
            MemberKind::Directory
        } else if entry_type.is_file() {
            MemberKind::File
        } else {
            MemberKind::Other
        };

        Ok(Self {
            name,
            kind,
            mode: header.mode().ok(),
        })
    }

    /// The relative path declared in the archive.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// The member kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    /// The file mode declared in the archive, if any.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    /// The declared link target for symlink and hardlink members.
    #[must_use]
    pub fn link_target(&self) -> Option<&Path> {
        match &self.kind {
            MemberKind::Symlink { target } | MemberKind::Hardlink { target } => {
                Some(target.as_path())
            }
            _ => None,
        }
    }
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>, name: &Path) -> Result<PathBuf> {
    entry
        .link_name()?
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| {
            ExtractionError::InvalidArchive(format!(
                "link member without a target: {}",
                name.display()
            ))
        })
}
