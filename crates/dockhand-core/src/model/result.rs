use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pipeline stage that can fail a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Build,
    Login,
    Push,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Build => "build",
            Stage::Login => "login",
            Stage::Push => "push",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one pipeline run.
///
/// Built once by the orchestrator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub succeeded: bool,

    /// Every line emitted during the run, in arrival order
    pub log: Vec<String>,

    pub failed_stage: Option<Stage>,
    pub error_message: Option<String>,

    /// Registry-qualified name, once the reference has been resolved
    pub image_reference: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    /// One-line outcome suitable for a status bar or tool reply header.
    pub fn summary(&self) -> String {
        if self.succeeded {
            match &self.image_reference {
                Some(reference) => format!("Pushed {}", reference),
                None => "Pipeline succeeded".to_string(),
            }
        } else {
            let message = self.error_message.as_deref().unwrap_or("unknown error");
            match self.failed_stage {
                Some(stage) => format!("Failed at stage {}: {}", stage, message),
                None => format!("Rejected: {}", message),
            }
        }
    }

    /// Summary followed by the full log, newline-delimited.
    pub fn to_text(&self) -> String {
        let mut text = self.summary();
        text.push('\n');
        if !self.log.is_empty() {
            text.push('\n');
            text.push_str(&self.log.join("\n"));
            text.push('\n');
        }
        text
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(succeeded: bool, failed_stage: Option<Stage>) -> PipelineResult {
        let now = Utc::now();
        PipelineResult {
            run_id: Uuid::new_v4(),
            succeeded,
            log: vec!["==> [1/4] fetch".to_string(), "cloning".to_string()],
            failed_stage,
            error_message: (!succeeded).then(|| "boom".to_string()),
            image_reference: Some("alice/hello:latest".to_string()),
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_summary_success() {
        assert_eq!(result(true, None).summary(), "Pushed alice/hello:latest");
    }

    #[test]
    fn test_summary_failure() {
        assert_eq!(
            result(false, Some(Stage::Build)).summary(),
            "Failed at stage build: boom"
        );
        assert_eq!(result(false, None).summary(), "Rejected: boom");
    }

    #[test]
    fn test_to_text_contains_log() {
        let text = result(true, None).to_text();
        assert!(text.starts_with("Pushed alice/hello:latest\n\n"));
        assert!(text.contains("==> [1/4] fetch\ncloning\n"));
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        let json = serde_json::to_string(&result(false, Some(Stage::Login))).unwrap();
        assert!(json.contains("\"failed_stage\":\"login\""));
    }
}
