use crate::error::CoreError;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Container registry an image is published to.
///
/// Serialised as its display name. Deserialisation goes through [`FromStr`],
/// so aliases and any letter case are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub enum Registry {
    /// GitHub Container Registry (`ghcr.io`)
    #[serde(rename = "GitHub Container Registry (GHCR)")]
    Ghcr,

    /// Docker Hub, the engine's implicit default registry
    #[serde(rename = "Docker Hub")]
    DockerHub,
}

impl Registry {
    pub const ALL: [Registry; 2] = [Registry::Ghcr, Registry::DockerHub];

    /// Name shown to callers and accepted on input.
    pub fn display_name(&self) -> &'static str {
        match self {
            Registry::Ghcr => "GitHub Container Registry (GHCR)",
            Registry::DockerHub => "Docker Hub",
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Registry {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "github container registry (ghcr)" | "ghcr" | "ghcr.io" => Ok(Registry::Ghcr),
            "docker hub" | "dockerhub" | "docker-hub" | "docker.io" => Ok(Registry::DockerHub),
            _ => Err(CoreError::UnknownRegistry(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
