use async_trait::async_trait;
use colored::Colorize;
use dockhand_build::{LogSink, Pipeline};
use dockhand_config::Settings;
use dockhand_core::{BuildRequest, Registry, derive_image_name};
use std::sync::Arc;

pub struct BuildArgs {
    pub repository_url: String,
    pub username: String,
    pub image: Option<String>,
    pub registry: Registry,
    pub token: String,
    pub json: bool,
}

/// ログ行をそのまま標準出力へ流すシンク（ステージマーカーのみ強調）
struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    async fn line(&self, line: &str) {
        if line.starts_with("==> failed") {
            println!("{}", line.red().bold());
        } else if line.starts_with("==> done") {
            println!("{}", line.green().bold());
        } else if line.starts_with("==> ") {
            println!("{}", line.cyan().bold());
        } else {
            println!("{}", line);
        }
    }
}

pub async fn handle(settings: Settings, args: BuildArgs) -> anyhow::Result<()> {
    let image_name = match args.image {
        Some(name) => name,
        None => derive_image_name(&args.repository_url)?,
    };
    let request = BuildRequest::new(
        args.repository_url,
        args.token,
        image_name,
        args.username,
        args.registry,
    );
    let pipeline = Pipeline::new(settings);

    if args.json {
        let result = pipeline.run(&request).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.succeeded {
            anyhow::bail!(result.summary());
        }
        return Ok(());
    }

    println!(
        "{} {} → {}",
        "ビルド開始:".blue(),
        request.repository_url.cyan(),
        request.registry
    );

    let sink: Arc<dyn LogSink> = Arc::new(ConsoleSink);
    let result = pipeline.run_with_sink(&request, Some(sink)).await;

    println!();
    if !result.succeeded {
        anyhow::bail!(result.summary());
    }

    println!("{}", format!("✓ {}", result.summary()).green());
    println!(
        "  所要時間: {:.1}s",
        result.duration().num_milliseconds() as f64 / 1000.0
    );
    Ok(())
}
