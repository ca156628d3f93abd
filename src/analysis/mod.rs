//! Project classification
//!
//! The [`ProjectAnalyzer`] asks the inference service for a
//! [`ProjectDescriptor`] and falls back to a filename-table detector when the
//! service is unavailable or replies with something unusable. Descriptors are
//! reused across runs through a [`DescriptorCache`] keyed by repository and
//! revision prefix.

mod analyzer;
mod cache;
mod descriptor;
pub mod fallback;
mod snapshot;

pub use analyzer::{AnalysisServiceError, ProjectAnalyzer};
pub use cache::{
    revision_prefix_matches, CacheEntry, CacheError, DescriptorCache, FileDescriptorCache,
    MemoryDescriptorCache, REVISION_PREFIX_LEN,
};
pub use descriptor::{
    AnalysisOutcome, Confidence, DatabaseKind, DescriptorSource, KnownDeployment,
    LanguageFamily, ProjectDescriptor, ResourceTier,
};
pub(crate) use snapshot::truncate_bytes;
pub use snapshot::ProjectSnapshot;
