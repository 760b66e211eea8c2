//! Safe archive-extraction filter and model-archive repacking.
//!
//! `repack-core` decides, member by member, whether extracting an untrusted
//! gzip-compressed tar archive to a target directory could escape that
//! directory via path traversal, symlink redirection, or hard-link
//! redirection, and extracts only the members proven safe. On top of that
//! filter sits the repack workflow: merging a previously produced model
//! archive with a user-supplied inference script and dependency files into a
//! new output tree.
//!
//! # Examples
//!
//! ```no_run
//! use repack_core::ExtractOptions;
//! use repack_core::extract_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ExtractOptions::default();
//! let report = extract_archive("model.tar.gz", "/output/dir", &options)?;
//! println!(
//!     "extracted {} items, blocked {}",
//!     report.total_items(),
//!     report.blocked.len()
//! );
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod repack;
pub mod report;
pub mod resolve;
pub mod types;

// Re-export main API types
pub use config::ExtractOptions;
pub use config::FilterStrategy;
pub use error::ExtractionError;
pub use error::Result;
pub use extract::extract_archive;
pub use extract::extract_reader;
pub use filter::Classification;
pub use filter::DiagnosticSink;
pub use filter::NoopSink;
pub use filter::TracingSink;
pub use filter::classify;
pub use filter::safe_members;
pub use repack::RepackReport;
pub use repack::RepackRequest;
pub use report::BlockedMember;
pub use report::ExtractionReport;
pub use resolve::resolve_under;

// Re-export types module for easier access
pub use types::ArchiveMember;
pub use types::BaseDir;
pub use types::MemberKind;
