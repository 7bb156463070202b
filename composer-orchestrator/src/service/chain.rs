//! Koji job chain
//!
//! A Koji compose is one koji-init job, one build job per image and a
//! koji-finalize job that depends on the init job first and then on every
//! build, in image order.

use uuid::Uuid;

use crate::service::error::ComposerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KojiChain {
    pub finalize: Uuid,
    pub init: Uuid,
    /// Never empty
    builds: Vec<Uuid>,
}

impl KojiChain {
    /// Reads the chain from the dependencies of a finalize job
    pub fn from_finalize(finalize: Uuid, dependencies: &[Uuid]) -> Result<Self, ComposerError> {
        match dependencies {
            [init, builds @ ..] if !builds.is_empty() => Ok(Self {
                finalize,
                init: *init,
                builds: builds.to_vec(),
            }),
            _ => Err(ComposerError::MalformedChain {
                id: finalize,
                dependencies: dependencies.len(),
            }),
        }
    }

    pub fn builds(&self) -> &[Uuid] {
        &self.builds
    }

    /// Dependencies a finalize job must be enqueued with
    pub fn finalize_dependencies(init: Uuid, builds: &[Uuid]) -> Vec<Uuid> {
        std::iter::once(init).chain(builds.iter().copied()).collect()
    }
}
