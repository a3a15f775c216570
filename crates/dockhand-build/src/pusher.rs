//! イメージプッシュ処理
//!
//! レジストリへログインし、ビルド済みイメージにレジストリ用のタグを付けて
//! プッシュします。認証情報は実行ごとの専用 Docker 設定ディレクトリにのみ
//! 書き込まれ、作業コピーと一緒に破棄されます。

use crate::error::{BuildError, BuildResult};
use crate::log::RunLog;
use crate::process::{describe, run_streaming};
use dockhand_core::{ImageReference, RegistryToken, Stage};
use std::path::PathBuf;
use tokio::process::Command;

/// イメージプッシュを実行するハンドラ
///
/// ログイン → タグ付け → プッシュの各ステップを呼び出し元が順に実行する。
/// どのタグが作成されたかを呼び出し元が把握できるよう、ステップは分けてある。
pub struct ImagePusher {
    docker: String,
    config_dir: PathBuf,
    channel_capacity: usize,
}

impl ImagePusher {
    /// `config_dir` はこの実行専用の Docker 設定ディレクトリ
    pub fn new(docker: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            docker: docker.into(),
            config_dir: config_dir.into(),
            channel_capacity: 256,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// レジストリへログイン
    ///
    /// トークンは stdin 経由でのみ渡し、ログでは伏せ字にする。
    pub async fn login(
        &self,
        reference: &ImageReference,
        username: &str,
        token: &RegistryToken,
        log: &mut RunLog,
    ) -> BuildResult<()> {
        let host = reference.registry_host.as_str();
        log.add_secret(token.expose());
        std::fs::create_dir_all(&self.config_dir).map_err(|e| BuildError::LoginFailed {
            registry: host.to_string(),
            reason: format!("cannot create {}: {}", self.config_dir.display(), e),
        })?;

        let args = ["login", host, "--username", username, "--password-stdin"];
        tracing::info!("Logging in to {} as {}", host, username);

        let start = log.len();
        let status = self
            .run(&args, Some(token.expose()), Stage::Login, log)
            .await?;

        if !status.success() {
            return Err(BuildError::LoginFailed {
                registry: host.to_string(),
                reason: failure_reason(status.code(), log, start),
            });
        }
        Ok(())
    }

    /// ローカルイメージにレジストリ用のタグを付ける
    pub async fn tag(
        &self,
        local_tag: &str,
        reference: &ImageReference,
        log: &mut RunLog,
    ) -> BuildResult<()> {
        let full = reference.full_reference.as_str();
        let start = log.len();
        let status = self
            .run(&["tag", local_tag, full], None, Stage::Push, log)
            .await?;

        if !status.success() {
            return Err(BuildError::PushFailed {
                reference: full.to_string(),
                reason: format!(
                    "could not tag {}: {}",
                    local_tag,
                    failure_reason(status.code(), log, start)
                ),
            });
        }
        Ok(())
    }

    /// タグ付け済みのイメージをプッシュ
    pub async fn push(&self, reference: &ImageReference, log: &mut RunLog) -> BuildResult<()> {
        let full = reference.full_reference.as_str();
        tracing::info!("Pushing {}", full);

        let start = log.len();
        let status = self.run(&["push", full], None, Stage::Push, log).await?;

        if !status.success() {
            return Err(BuildError::PushFailed {
                reference: full.to_string(),
                reason: failure_reason(status.code(), log, start),
            });
        }

        tracing::info!("Pushed {}", full);
        Ok(())
    }

    async fn run(
        &self,
        args: &[&str],
        stdin: Option<&str>,
        stage: Stage,
        log: &mut RunLog,
    ) -> BuildResult<std::process::ExitStatus> {
        tracing::debug!("Running: {}", describe(&self.docker, args));

        let mut cmd = Command::new(&self.docker);
        cmd.args(args).env("DOCKER_CONFIG", &self.config_dir);

        run_streaming(cmd, stdin, log, self.channel_capacity)
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.docker.clone(),
                stage,
                source,
            })
    }
}

/// 終了コードと直近の出力行から失敗理由を組み立てる
fn failure_reason(code: Option<i32>, log: &RunLog, start: usize) -> String {
    let exit = match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    match log.since(start).last() {
        Some(last) => format!("{} ({})", last, exit),
        None => exit,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use dockhand_core::Registry;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    async fn publish(
        pusher: &ImagePusher,
        local_tag: &str,
        reference: &ImageReference,
        token: &RegistryToken,
        log: &mut RunLog,
    ) -> BuildResult<()> {
        pusher.login(reference, "alice", token, log).await?;
        pusher.tag(local_tag, reference, log).await?;
        pusher.push(reference, log).await
    }

    /// サブコマンドごとに振る舞いを切り替える docker スタブ
    fn stub_docker(dir: &Path, login_exit: i32, push_exit: i32) -> PathBuf {
        let path = dir.join("docker");
        let script = format!(
            r#"#!/bin/sh
case "$1" in
  login)
    read -r password
    echo "login $2 user=$4 config=$DOCKER_CONFIG"
    echo "WARNING! Your password $password will be stored unencrypted"
    exit {login_exit}
    ;;
  tag)
    echo "tag $2 -> $3"
    ;;
  push)
    echo "The push refers to repository [$2]"
    echo "latest: digest: sha256:0123 size: 528"
    exit {push_exit}
    ;;
esac
"#
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_publish_login_tag_push() {
        let root = tempfile::tempdir().unwrap();
        let docker = stub_docker(root.path(), 0, 0);
        let config_dir = root.path().join("docker-config");
        let pusher = ImagePusher::new(docker.to_string_lossy(), &config_dir);

        let reference = resolve(Registry::Ghcr, "alice", "app");
        let token = RegistryToken::new("ghp_secret_token");
        let mut log = RunLog::default();

        publish(&pusher, "dockhand-local/app:run1", &reference, &token, &mut log)
            .await
            .unwrap();

        assert!(config_dir.is_dir());
        let text = log.lines().join("\n");
        assert!(text.contains("login ghcr.io user=alice"));
        assert!(text.contains(&config_dir.to_string_lossy().into_owned()));
        assert!(text.contains("tag dockhand-local/app:run1 -> ghcr.io/alice/app:latest"));
        assert!(text.contains("The push refers to repository [ghcr.io/alice/app:latest]"));
        // ログインが標準入力のトークンを出力しても伏せ字になる
        assert!(text.contains("Your password ******** will be stored"));
        assert!(!text.contains("ghp_secret_token"));
    }

    #[tokio::test]
    async fn test_login_failure_stops_before_push() {
        let root = tempfile::tempdir().unwrap();
        let docker = stub_docker(root.path(), 1, 0);
        let pusher = ImagePusher::new(docker.to_string_lossy(), root.path().join("cfg"));

        let reference = resolve(Registry::DockerHub, "alice", "app");
        let token = RegistryToken::new("dckr_pat_x");
        let mut log = RunLog::default();

        let err = publish(&pusher, "local:1", &reference, &token, &mut log)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Login);
        match &err {
            BuildError::LoginFailed { registry, reason } => {
                assert_eq!(registry, "docker.io");
                assert!(reason.ends_with("(exit code 1)"));
                assert!(!reason.contains("dckr_pat_x"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!log.lines().iter().any(|l| l.starts_with("tag ")));
        assert!(!log.lines().iter().any(|l| l.contains("push refers")));
    }

    #[tokio::test]
    async fn test_push_failure_reports_push_stage() {
        let root = tempfile::tempdir().unwrap();
        let docker = stub_docker(root.path(), 0, 1);
        let pusher = ImagePusher::new(docker.to_string_lossy(), root.path().join("cfg"));

        let reference = resolve(Registry::DockerHub, "alice", "app");
        let token = RegistryToken::new("tok");
        let mut log = RunLog::default();

        let err = publish(&pusher, "local:1", &reference, &token, &mut log)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Push);
        assert!(matches!(err, BuildError::PushFailed { ref reference, .. } if reference == "alice/app:latest"));
    }

    #[test]
    fn test_failure_reason_uses_last_line() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut log = RunLog::default();
        rt.block_on(async {
            log.push("before").await;
            log.push("denied: requested access to the resource is denied")
                .await;
        });

        assert_eq!(
            failure_reason(Some(1), &log, 1),
            "denied: requested access to the resource is denied (exit code 1)"
        );
        assert_eq!(failure_reason(None, &log, 2), "terminated by signal");
    }
}
