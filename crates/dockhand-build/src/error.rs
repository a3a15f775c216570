use dockhand_core::Stage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Fetch failed: {reason}")]
    FetchFailed { reason: String },

    #[error("Build descriptor not found: {0}")]
    DescriptorMissing(PathBuf),

    #[error("Build failed ({})", exit_label(.exit_code))]
    BuildFailed {
        exit_code: Option<i32>,
        tail: Vec<String>,
    },

    #[error("Login to {registry} failed: {reason}")]
    LoginFailed { registry: String, reason: String },

    #[error("Push of {reference} failed: {reason}")]
    PushFailed { reference: String, reason: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl BuildError {
    /// Stage the error is attributed to in the pipeline result.
    pub fn stage(&self) -> Stage {
        match self {
            BuildError::FetchFailed { .. } | BuildError::Io(_) => Stage::Fetch,
            BuildError::DescriptorMissing(_) | BuildError::BuildFailed { .. } => Stage::Build,
            BuildError::LoginFailed { .. } => Stage::Login,
            BuildError::PushFailed { .. } => Stage::Push,
            BuildError::Spawn { stage, .. } => *stage,
        }
    }

    /// Caller-facing message, including the tail of the build output.
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DescriptorMissing(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!(
                    "The repository has no {} at its root, so there is nothing to build.",
                    name
                )
            }
            BuildError::BuildFailed { tail, .. } if !tail.is_empty() => {
                format!("{}. Last output:\n{}", self, tail.join("\n"))
            }
            _ => self.to_string(),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
