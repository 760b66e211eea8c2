//! Extraction configuration.

/// How the safety filter implementation is chosen for an extraction call.
///
/// Two interchangeable implementations satisfy the same contract (extract
/// only the members proven to stay within the base directory):
///
/// - **Delegated** — the containment policy built into the linked `tar`
///   crate's unpacker. Preferred when available, because the platform policy
///   also covers attack classes outside this crate's scope (device files,
///   setuid bits).
/// - **Members** — this crate's member-by-member classifier, which reports
///   each blocked member individually. The fallback for environments where
///   the delegated policy is unavailable, and the choice when per-member
///   diagnostics are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterStrategy {
    /// Pick the delegated policy when available, else the member filter.
    #[default]
    Auto,

    /// Always delegate to the platform unpacker's policy.
    Delegated,

    /// Always run the member classifier.
    Members,
}

/// Options for one extraction call.
///
/// The defaults are the safe configuration; there is deliberately no switch
/// for tolerating write failures — a safe member that cannot be written
/// aborts the pass (fail-closed).
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Safety filter selection.
    pub filter: FilterStrategy,
}

impl ExtractOptions {
    /// Options forcing the member classifier, for callers that need
    /// per-member blocked diagnostics in the report.
    #[must_use]
    pub fn with_member_filter() -> Self {
        Self {
            filter: FilterStrategy::Members,
        }
    }
}
