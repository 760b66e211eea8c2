//! Core types for the extraction filter.
//!
//! `BaseDir` is a validated newtype: it can only be constructed through
//! validation and is always a canonical absolute path, so containment
//! comparisons never mix normalized and unnormalized forms.

pub mod base_dir;
pub mod member;

pub use base_dir::BaseDir;
pub use member::ArchiveMember;
pub use member::MemberKind;
