//! Deployable artifacts generated from a project descriptor

mod bundle;
pub mod fixups;
mod generator;
pub mod infra_vars;
mod store;
pub mod templates;

pub use bundle::{ArtifactBundle, ArtifactKind};
pub use generator::{
    parse_sections, ArtifactGenerator, GeneratedArtifacts, GenerationServiceError,
    GenerationSource,
};
pub use store::{ArtifactStore, ArtifactStoreError};
