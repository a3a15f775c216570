//! パイプラインオーケストレーター
//!
//! fetch → build → resolve → publish を順番に実行します。各ステージの開始時に
//! 実行ログへマーカー行を追加し、最初の失敗で即座に停止します。
//! どの経路でも呼び出し元には [`PipelineResult`] が返ります。

use crate::builder::ImageBuilder;
use crate::error::BuildResult;
use crate::fetcher::{SourceFetcher, WorkingCopy};
use crate::log::{LogSink, RunLog};
use crate::pusher::ImagePusher;
use crate::resolver::resolve;
use chrono::Utc;
use dockhand_config::Settings;
use dockhand_core::{BuildRequest, PipelineResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

const STAGE_COUNT: usize = 4;
const LOCAL_REPOSITORY: &str = "dockhand-local";

/// 1 回の実行中に作られたもの
#[derive(Default)]
struct RunArtifacts {
    image_reference: Option<String>,
    /// 後片付けで削除するローカルタグ（実際に作成できたものだけ）
    local_tags: Vec<String>,
    /// レジストリ参照のタグ付けから後片付けまで保持する
    publish_guard: Option<OwnedMutexGuard<()>>,
}

/// ビルド＆プッシュパイプライン
pub struct Pipeline {
    settings: Settings,
    /// 同じレジストリ参照への tag → push → 削除を直列化するロック
    publish_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            publish_locks: Mutex::new(HashMap::new()),
        }
    }

    /// パイプラインを実行
    pub async fn run(&self, request: &BuildRequest) -> PipelineResult {
        self.run_with_sink(request, None).await
    }

    /// ログ行を `sink` へ逐次通知しながらパイプラインを実行
    ///
    /// 検証エラーの場合は外部プロセスを一切起動せず、空のログと
    /// `failed_stage: None` の結果を返す。
    pub async fn run_with_sink(
        &self,
        request: &BuildRequest,
        sink: Option<Arc<dyn LogSink>>,
    ) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let mut log = RunLog::new(sink);
        log.add_secret(request.registry_token.expose());

        if let Err(e) = request.validate() {
            let message = log.redact(&e.to_string());
            tracing::warn!("Rejected build request: {}", message);
            return PipelineResult {
                run_id,
                succeeded: false,
                log: Vec::new(),
                failed_stage: None,
                error_message: Some(message),
                image_reference: None,
                started_at,
                finished_at: Utc::now(),
            };
        }

        tracing::info!(
            "Starting run {} for {} ({})",
            run_id,
            request.repository_url,
            request.registry
        );

        let mut artifacts = RunArtifacts::default();
        let outcome = self
            .execute(request, run_id, &mut log, &mut artifacts)
            .await;

        if self.settings.remove_local_images && !artifacts.local_tags.is_empty() {
            ImageBuilder::new(&self.settings.docker, &self.settings.descriptor)
                .remove_images(&artifacts.local_tags)
                .await;
        }
        drop(artifacts.publish_guard.take());

        let (failed_stage, error_message) = match outcome {
            Ok(()) => {
                let reference = artifacts.image_reference.as_deref().unwrap_or_default();
                log.push(format!("==> done: pushed {}", reference)).await;
                tracing::info!("Run {} succeeded: {}", run_id, reference);
                (None, None)
            }
            Err(e) => {
                let stage = e.stage();
                let headline = log.redact(&e.to_string());
                tracing::error!("Run {} failed at stage {}: {}", run_id, stage, headline);
                log.push(format!("==> failed at stage {}: {}", stage, headline))
                    .await;
                (Some(stage), Some(log.redact(&e.user_message())))
            }
        };

        PipelineResult {
            run_id,
            succeeded: failed_stage.is_none(),
            log: log.into_lines(),
            failed_stage,
            error_message,
            image_reference: artifacts.image_reference,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute(
        &self,
        request: &BuildRequest,
        run_id: Uuid,
        log: &mut RunLog,
        artifacts: &mut RunArtifacts,
    ) -> BuildResult<()> {
        let settings = &self.settings;
        let run_label = run_id.simple().to_string();

        // fetch
        stage_marker(log, 1, "fetch", &request.repository_url).await;
        let working_copy = WorkingCopy::create(&settings.scratch_root(), &run_label)?;
        SourceFetcher::new(&settings.git, settings.channel_capacity)
            .fetch(&request.repository_url, &working_copy, log)
            .await?;

        // build
        let local_tag = format!("{}/{}:{}", LOCAL_REPOSITORY, request.image_name, run_label);
        stage_marker(
            log,
            2,
            "build",
            &format!("{} -> {}", settings.descriptor, local_tag),
        )
        .await;
        let builder = ImageBuilder::new(&settings.docker, &settings.descriptor)
            .with_channel_capacity(settings.channel_capacity)
            .with_error_tail_lines(settings.error_tail_lines);
        let built = builder.build(&working_copy, &local_tag, log).await?;
        artifacts.local_tags.push(built.tag.clone());

        // resolve
        stage_marker(
            log,
            3,
            "resolve",
            &format!(
                "{} {}/{}",
                request.registry, request.username, request.image_name
            ),
        )
        .await;
        let reference = resolve(request.registry, &request.username, &request.image_name);
        log.push(format!("Resolved {}", reference.full_reference))
            .await;
        artifacts.image_reference = Some(reference.full_reference.clone());

        // publish
        stage_marker(
            log,
            4,
            "publish",
            &format!("{} as {}", reference.registry_host, request.username),
        )
        .await;
        let pusher = ImagePusher::new(
            &settings.docker,
            working_copy.scratch_dir().join("docker-config"),
        )
        .with_channel_capacity(settings.channel_capacity);

        pusher
            .login(&reference, &request.username, &request.registry_token, log)
            .await?;

        artifacts.publish_guard = Some(self.publish_lock(&reference.full_reference, log).await);
        pusher.tag(&built.tag, &reference, log).await?;
        artifacts.local_tags.push(reference.full_reference.clone());
        pusher.push(&reference, log).await?;

        Ok(())
    }

    /// レジストリ参照ごとのロックを取得
    ///
    /// ローカルエンジン上のレジストリタグは全実行で共有されるため、
    /// 同じ参照を扱う別の実行が終わるまで待つ。
    async fn publish_lock(&self, reference: &str, log: &mut RunLog) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.publish_locks.lock().await;
            locks.entry(reference.to_string()).or_default().clone()
        };

        match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                log.push(format!("Waiting for another run publishing {}", reference))
                    .await;
                lock.lock_owned().await
            }
        }
    }
}

async fn stage_marker(log: &mut RunLog, index: usize, stage: &str, detail: &str) {
    tracing::info!("Stage {}/{}: {}", index, STAGE_COUNT, stage);
    log.push(format!("==> [{}/{}] {}: {}", index, STAGE_COUNT, stage, detail))
        .await;
}
