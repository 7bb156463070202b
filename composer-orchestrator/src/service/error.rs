//! Service errors
//!
//! Every failure of a compose operation, grouped into a small set of kinds
//! that decide how it is reported.

use composer_core::domain::image::UploadType;
use composer_core::domain::job::JobKind;
use uuid::Uuid;

use crate::repository::StoreError;

/// How an error is surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong
    MalformedInput,
    NotFound,
    /// The request is well-formed but asks for something not supported
    Unsupported,
    /// The stored jobs do not have the shape this service expects
    InvariantViolation,
    /// The job store refused a new job
    Enqueue,
}

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    // Malformed input
    #[error("invalid compose id: {0}")]
    InvalidComposeId(String),

    #[error("request body could not be decoded: {0}")]
    BodyDecoding(String),

    #[error("exactly one of image_request and image_requests must be set")]
    InvalidNumberOfImageBuilds,

    #[error("the image request has no upload target")]
    MissingUploadTarget,

    #[error("upload options do not match upload type {upload_type:?}: {reason}")]
    InvalidUploadOptions {
        upload_type: UploadType,
        reason: String,
    },

    #[error("repository needs one of baseurl, mirrorlist or metalink")]
    InvalidRepository,

    #[error("repository enables check_gpg without a gpgkey")]
    NoGpgKey,

    #[error("local save is not enabled on this server")]
    LocalSaveNotEnabled,

    // Not found
    #[error("compose {0} not found")]
    ComposeNotFound(Uuid),

    // Unsupported
    #[error("unsupported distribution: {0}")]
    UnsupportedDistribution(String),

    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("upload type {0:?} cannot be requested")]
    UnsupportedUploadType(UploadType),

    #[error("job {id} is of type {kind}, which is not valid here")]
    InvalidJobType { id: Uuid, kind: JobKind },

    #[error("compose {0} has not finished successfully")]
    ComposeBadState(Uuid),

    #[error("compose {id} has {count} upload targets, exactly one is needed")]
    SeveralUploadTargets { id: Uuid, count: usize },

    #[error("images delivered to {0} cannot be cloned")]
    UnsupportedCloneTarget(String),

    // Invariant violations
    #[error("unknown upload target: {0}")]
    UnknownUploadTarget(String),

    #[error("koji compose {id} has {dependencies} dependencies, at least 2 are needed")]
    MalformedChain { id: Uuid, dependencies: usize },

    #[error("job {id} is malformed: {reason}")]
    MalformedJob { id: Uuid, reason: String },

    #[error("build job {0} finished successfully without osbuild output")]
    MissingBuildOutput(Uuid),

    #[error("no manifest found for build job {0}")]
    MissingManifest(Uuid),

    #[error("job {0} is referenced by a compose but does not exist")]
    MissingJob(Uuid),

    #[error("job store error: {0}")]
    Store(StoreError),

    // Enqueue
    #[error("failed to enqueue {kind} job: {source}")]
    Enqueue {
        kind: JobKind,
        #[source]
        source: StoreError,
    },
}

impl ComposerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposerError::InvalidComposeId(_)
            | ComposerError::BodyDecoding(_)
            | ComposerError::InvalidNumberOfImageBuilds
            | ComposerError::MissingUploadTarget
            | ComposerError::InvalidUploadOptions { .. }
            | ComposerError::InvalidRepository
            | ComposerError::NoGpgKey
            | ComposerError::LocalSaveNotEnabled => ErrorKind::MalformedInput,
            ComposerError::ComposeNotFound(_) => ErrorKind::NotFound,
            ComposerError::UnsupportedDistribution(_)
            | ComposerError::UnsupportedArchitecture(_)
            | ComposerError::UnsupportedUploadType(_)
            | ComposerError::InvalidJobType { .. }
            | ComposerError::ComposeBadState(_)
            | ComposerError::SeveralUploadTargets { .. }
            | ComposerError::UnsupportedCloneTarget(_) => ErrorKind::Unsupported,
            ComposerError::UnknownUploadTarget(_)
            | ComposerError::MalformedChain { .. }
            | ComposerError::MalformedJob { .. }
            | ComposerError::MissingBuildOutput(_)
            | ComposerError::MissingManifest(_)
            | ComposerError::MissingJob(_)
            | ComposerError::Store(_) => ErrorKind::InvariantViolation,
            ComposerError::Enqueue { .. } => ErrorKind::Enqueue,
        }
    }
}

/// A job missing from the store is only "not found" when it is the one the
/// caller asked for, see [`Workers::compose_kind`]; anywhere else the stored
/// jobs are inconsistent.
///
/// [`Workers::compose_kind`]: crate::service::workers::Workers::compose_kind
impl From<StoreError> for ComposerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ComposerError::MissingJob(id),
            StoreError::Malformed { id, reason } => ComposerError::MalformedJob { id, reason },
            StoreError::KindMismatch {
                id,
                expected,
                found,
            } => ComposerError::MalformedJob {
                id,
                reason: format!("expected a {expected} job, found {found}"),
            },
            err @ StoreError::Database(_) => ComposerError::Store(err),
        }
    }
}

impl From<composer_core::dto::upload::UnknownUploadTarget> for ComposerError {
    fn from(err: composer_core::dto::upload::UnknownUploadTarget) -> Self {
        ComposerError::UnknownUploadTarget(err.0)
    }
}
