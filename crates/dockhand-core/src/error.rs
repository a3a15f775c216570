use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid {field} '{value}': {reason}")]
    InvalidPathSegment {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid repository URL '{0}': only public http(s) repositories are supported")]
    InvalidRepositoryUrl(String),

    #[error(
        "unknown registry '{0}'. Use \"GitHub Container Registry (GHCR)\" or \"Docker Hub\""
    )]
    UnknownRegistry(String),

    #[error("cannot derive an image name from '{0}'")]
    UnderivableImageName(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
