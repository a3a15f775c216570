//! レジストリアダプタ
//!
//! レジストリ種別ごとのログインホストとイメージ参照を決定します。
//! 純粋関数で I/O は行いません。

use dockhand_core::{DEFAULT_TAG, ImageReference, Registry};

/// GitHub Container Registry のホスト
pub const GHCR_HOST: &str = "ghcr.io";
/// Docker Hub のホスト（エンジンの暗黙のデフォルト）
pub const DOCKER_HUB_HOST: &str = "docker.io";

/// レジストリ・ユーザー名・イメージ名から参照を解決
///
/// # Examples
/// - `(Ghcr, "alice", "app")` -> `ghcr.io/alice/app:latest`
/// - `(DockerHub, "alice", "app")` -> `alice/app:latest`
pub fn resolve(registry: Registry, username: &str, image_name: &str) -> ImageReference {
    let repository_path = format!("{}/{}", username, image_name);
    let tag = DEFAULT_TAG.to_string();

    let (registry_host, full_reference) = match registry {
        Registry::Ghcr => (
            GHCR_HOST,
            format!("{}/{}:{}", GHCR_HOST, repository_path, tag),
        ),
        // Docker Hub はホストを省略した形式が正規
        Registry::DockerHub => (DOCKER_HUB_HOST, format!("{}:{}", repository_path, tag)),
    };

    ImageReference {
        registry_host: registry_host.to_string(),
        repository_path,
        tag,
        full_reference,
    }
}
