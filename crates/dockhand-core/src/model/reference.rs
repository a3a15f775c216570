use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed tag applied to every published image.
pub const DEFAULT_TAG: &str = "latest";

/// Registry-qualified image name produced by the registry adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Host passed to `login` (e.g. `ghcr.io`, `docker.io`)
    pub registry_host: String,

    /// `<username>/<imageName>`
    pub repository_path: String,

    pub tag: String,

    /// Name used for `tag` and `push`
    pub full_reference: String,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_reference)
    }
}
