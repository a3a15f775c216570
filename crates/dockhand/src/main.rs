mod commands;

use clap::{Parser, Subcommand};
use dockhand_config::Settings;
use dockhand_core::Registry;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "公開リポジトリからイメージをビルドし、GHCR / Docker Hub へプッシュする", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// リポジトリを取得してビルドし、レジストリへプッシュ
    Build {
        /// 公開リポジトリの URL
        repository_url: String,
        /// レジストリのユーザー名（名前空間）
        #[arg(short, long)]
        username: String,
        /// イメージ名（省略時はリポジトリ名から生成）
        #[arg(short, long)]
        image: Option<String>,
        /// プッシュ先レジストリ (ghcr, dockerhub)
        #[arg(short, long, default_value = "ghcr")]
        registry: Registry,
        /// レジストリのアクセストークン
        #[arg(long, env = "DOCKHAND_REGISTRY_TOKEN", hide_env_values = true)]
        token: String,
        /// 設定ファイルのパス
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// 結果を JSON で出力（ログのライブ表示なし）
        #[arg(long)]
        json: bool,
    },
    /// MCP (Model Context Protocol) サーバーを起動
    Mcp {
        /// 設定ファイルのパス
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdoutはJSON-RPC通信に使うので、ログはファイルに出力
    if let Commands::Mcp { config } = &cli.command {
        use std::fs::OpenOptions;
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(std::env::temp_dir().join("dockhand-mcp.log"))
            .ok();

        if let Some(file) = log_file {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::DEBUG.into()),
                )
                .with_ansi(false)
                .init();
        }

        let settings = load_settings(config.as_deref())?;
        return dockhand_mcp::run_server(settings).await;
    }

    // 通常のCLIコマンドはstderrにログ出力
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match cli.command {
        Commands::Build {
            repository_url,
            username,
            image,
            registry,
            token,
            config,
            json,
        } => {
            let settings = load_settings(config.as_deref())?;
            commands::build::handle(
                settings,
                commands::build::BuildArgs {
                    repository_url,
                    username,
                    image,
                    registry,
                    token,
                    json,
                },
            )
            .await?;
        }
        Commands::Version => {
            println!("dockhand {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Mcp { .. } => {
            unreachable!("Mcp is handled before logging setup");
        }
    }

    Ok(())
}
