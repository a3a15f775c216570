//! イメージビルド処理
//!
//! 作業コピーのビルド記述ファイルからローカルイメージをビルドします。
//! ビルド出力は完了を待たずに 1 行ずつ実行ログへ転送されます。

use crate::error::{BuildError, BuildResult};
use crate::fetcher::WorkingCopy;
use crate::log::RunLog;
use crate::process::{describe, run_streaming};
use dockhand_core::Stage;
use std::process::Stdio;
use tokio::process::Command;

/// ビルド結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// ローカルタグ（レジストリ修飾前）
    pub tag: String,
    /// ビルド中に出力された行
    pub lines: Vec<String>,
}

/// イメージビルドを実行するハンドラ
pub struct ImageBuilder {
    docker: String,
    descriptor: String,
    channel_capacity: usize,
    error_tail_lines: usize,
}

impl ImageBuilder {
    pub fn new(docker: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            docker: docker.into(),
            descriptor: descriptor.into(),
            channel_capacity: 256,
            error_tail_lines: 20,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_error_tail_lines(mut self, lines: usize) -> Self {
        self.error_tail_lines = lines;
        self
    }

    /// イメージをビルド
    ///
    /// ビルド記述ファイルが存在しない場合はビルドを起動せずにエラーを返す。
    pub async fn build(
        &self,
        working_copy: &WorkingCopy,
        tag: &str,
        log: &mut RunLog,
    ) -> BuildResult<BuildOutcome> {
        let context = working_copy.path();
        let descriptor = context.join(&self.descriptor);
        if !descriptor.is_file() {
            return Err(BuildError::DescriptorMissing(descriptor));
        }

        let descriptor_arg = descriptor.to_string_lossy().into_owned();
        let context_arg = context.to_string_lossy().into_owned();
        let args = [
            "build",
            "--file",
            descriptor_arg.as_str(),
            "--tag",
            tag,
            context_arg.as_str(),
        ];
        tracing::info!("Building image: {}", tag);
        tracing::debug!("Running: {}", describe(&self.docker, &args));

        let mut cmd = Command::new(&self.docker);
        cmd.args(args);

        let start = log.len();
        let status = run_streaming(cmd, None, log, self.channel_capacity)
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.docker.clone(),
                stage: Stage::Build,
                source,
            })?;

        if !status.success() {
            return Err(BuildError::BuildFailed {
                exit_code: status.code(),
                tail: log.tail_since(start, self.error_tail_lines),
            });
        }

        tracing::info!("Successfully built: {}", tag);
        Ok(BuildOutcome {
            tag: tag.to_string(),
            lines: log.since(start).to_vec(),
        })
    }

    /// ローカルのイメージタグを削除（ベストエフォート）
    ///
    /// 失敗は警告ログのみで、呼び出し元には伝えない。
    pub async fn remove_images(&self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }

        let mut cmd = Command::new(&self.docker);
        cmd.arg("image")
            .arg("rm")
            .args(tags)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        match cmd.output().await {
            Ok(output) if output.status.success() => {
                tracing::debug!("Removed local images: {}", tags.join(", "));
            }
            Ok(output) => {
                tracing::warn!(
                    "Failed to remove local images {}: {}",
                    tags.join(", "),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                tracing::warn!("Failed to run {} image rm: {}", self.docker, e);
            }
        }
    }
}
