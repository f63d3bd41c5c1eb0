//! Provider error taxonomy.
//!
//! Errors crossing the provider boundary fall into four classes: pod specs
//! that cannot be projected onto the remote schema, credential material
//! that cannot be decoded, container groups that do not exist remotely,
//! and everything the remote service or a lister reports. The tracker
//! converts [`ProviderError::NotFound`] into a terminated pod status; all
//! other operations surface errors unchanged.

use thiserror::Error;

use crate::client::CcsError;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The pod spec cannot be projected onto the remote schema.
    #[error("{0}")]
    Validation(String),

    /// Registry credential material could not be decoded.
    #[error("{0}")]
    Auth(String),

    /// The remote container group does not exist.
    #[error("container group {0} was not found")]
    NotFound(String),

    /// The remote service rejected the request, or a collaborator failed.
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl From<CcsError> for ProviderError {
    fn from(err: CcsError) -> Self {
        match err {
            CcsError::NotFound(name) => ProviderError::NotFound(name),
            other => ProviderError::Remote(anyhow::Error::new(other)),
        }
    }
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}
