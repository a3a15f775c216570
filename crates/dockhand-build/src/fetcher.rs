//! ソース取得処理
//!
//! 公開リポジトリのデフォルトブランチを shallow clone し、実行ごとに
//! 独立したスクラッチディレクトリへ展開します。

use crate::error::{BuildError, BuildResult};
use crate::log::RunLog;
use crate::process::{describe, run_streaming};
use dockhand_core::Stage;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;

/// 1 回の実行が排他的に所有する作業コピー
///
/// Drop 時にスクラッチディレクトリごと削除されます。
#[derive(Debug)]
pub struct WorkingCopy {
    scratch: TempDir,
    source: PathBuf,
}

impl WorkingCopy {
    /// スクラッチディレクトリを作成（clone 先はまだ空）
    pub fn create(scratch_root: &Path, run_label: &str) -> BuildResult<Self> {
        std::fs::create_dir_all(scratch_root)?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("dockhand-{}-", run_label))
            .tempdir_in(scratch_root)?;
        let source = scratch.path().join("source");
        Ok(Self { scratch, source })
    }

    /// 取得したリポジトリツリーのルート
    pub fn path(&self) -> &Path {
        &self.source
    }

    /// この実行専用のスクラッチディレクトリ
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

/// リポジトリを取得するハンドラ
pub struct SourceFetcher {
    git: String,
    channel_capacity: usize,
}

impl SourceFetcher {
    pub fn new(git: impl Into<String>, channel_capacity: usize) -> Self {
        Self {
            git: git.into(),
            channel_capacity,
        }
    }

    /// リポジトリを shallow clone する
    ///
    /// 認証は一切行わず、リトライもしません。
    pub async fn fetch(
        &self,
        repository_url: &str,
        working_copy: &WorkingCopy,
        log: &mut RunLog,
    ) -> BuildResult<()> {
        let dest = working_copy.path().to_string_lossy().into_owned();
        let args = [
            "clone",
            "--depth",
            "1",
            "--single-branch",
            "--",
            repository_url,
            dest.as_str(),
        ];
        tracing::info!("Fetching {}", repository_url);
        tracing::debug!("Running: {}", describe(&self.git, &args));

        let mut cmd = Command::new(&self.git);
        cmd.args(args)
            // 認証プロンプトで停止しないようにする
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_ASKPASS", "true");

        let status = run_streaming(cmd, None, log, self.channel_capacity)
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.git.clone(),
                stage: Stage::Fetch,
                source,
            })?;

        if !status.success() {
            return Err(BuildError::FetchFailed {
                reason: match status.code() {
                    Some(code) => format!(
                        "{} clone exited with code {} (is the repository public and reachable?)",
                        self.git, code
                    ),
                    None => format!("{} clone was terminated by a signal", self.git),
                },
            });
        }

        if !working_copy.path().is_dir() {
            return Err(BuildError::FetchFailed {
                reason: "clone finished but produced no working tree".to_string(),
            });
        }

        tracing::info!("Fetched into {}", working_copy.path().display());
        Ok(())
    }
}
