//! Image name derivation
//!
//! Callers may omit the image name; it is then taken from the last path
//! segment of the repository URL.

use crate::error::{CoreError, Result};

/// Derives a registry-safe image name from a repository URL.
///
/// # Examples
/// - `https://github.com/octocat/Hello-World` -> `hello-world`
/// - `https://github.com/org/My App.git` -> `my-app`
pub fn derive_image_name(repository_url: &str) -> Result<String> {
    let last = repository_url
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    let last = last.strip_suffix(".git").unwrap_or(last);

    let mut name = String::with_capacity(last.len());
    for c in last.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
            name.push(c);
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }

    let name = name
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string();

    if name.is_empty() {
        return Err(CoreError::UnderivableImageName(repository_url.to_string()));
    }

    Ok(name)
}
