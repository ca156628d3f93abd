//! Obtaining a working copy of the target repository

mod fetcher;
mod reference;
mod secrets;

pub use fetcher::{FetchError, GitFetcher, SourceFetcher};
pub use reference::{CheckoutHandle, SourceReference};
pub use secrets::{ChainedSecretStore, EnvSecretStore, SecretError, SecretStore, SsmSecretStore};
