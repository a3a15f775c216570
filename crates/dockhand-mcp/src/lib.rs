//! Dockhand MCP Server
//!
//! 公式 rmcp SDK を使用した MCP サーバー実装。
//! stdio トランスポートで動作し、ビルド＆プッシュパイプラインを
//! `run_pipeline` ツールとして提供する。

use anyhow::Result;
use dockhand_build::Pipeline;
use dockhand_config::Settings;
use dockhand_core::{BuildRequest, Registry, derive_image_name};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

// ============================================================================
// パラメータ定義
// ============================================================================

/// パイプライン実行パラメータ
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BuildParam {
    /// 公開リポジトリの URL（例: https://github.com/octocat/Hello-World）
    #[serde(rename = "repositoryURL", alias = "repository_url")]
    pub repository_url: String,
    /// レジストリのアクセストークン（ログには出力されない）
    #[serde(rename = "registryToken", alias = "registry_token")]
    pub registry_token: String,
    /// イメージ名（未指定時はリポジトリ名から生成）
    #[serde(default, rename = "imageName", alias = "image_name")]
    pub image_name: Option<String>,
    /// レジストリのユーザー名（名前空間）
    pub username: String,
    /// プッシュ先レジストリ
    pub registry: Registry,
}

impl BuildParam {
    /// ツール引数から BuildRequest を組み立てる
    fn into_request(self) -> Result<BuildRequest, String> {
        let image_name = match self.image_name.filter(|name| !name.trim().is_empty()) {
            Some(name) => name,
            None => derive_image_name(&self.repository_url).map_err(|e| e.to_string())?,
        };
        Ok(BuildRequest::new(
            self.repository_url,
            self.registry_token,
            image_name,
            self.username,
            self.registry,
        ))
    }
}

// ============================================================================
// MCP サーバー
// ============================================================================

/// Dockhand MCP サーバー
#[derive(Clone)]
pub struct DockhandServer {
    tool_router: ToolRouter<Self>,
    pipeline: Arc<Pipeline>,
}

#[tool_router]
impl DockhandServer {
    pub fn new(settings: Settings) -> Self {
        Self {
            tool_router: Self::tool_router(),
            pipeline: Arc::new(Pipeline::new(settings)),
        }
    }

    /// パイプラインを実行
    #[tool(
        description = "Clones a public repository, builds its Dockerfile and pushes the image to GitHub Container Registry (GHCR) or Docker Hub. Returns a one-line summary followed by the full build log. The registry token is never echoed back."
    )]
    async fn run_pipeline(&self, params: Parameters<BuildParam>) -> Result<String, String> {
        let request = match params.0.into_request() {
            Ok(request) => request,
            Err(e) => return Err(format!("Rejected: {}", e)),
        };

        let result = self.pipeline.run(&request).await;
        tracing::info!("run_pipeline: {}", result.summary());

        if result.succeeded {
            Ok(result.to_text())
        } else {
            Err(result.to_text())
        }
    }
}

impl ServerHandler for DockhandServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::default().with_instructions(
            "Dockhand MCP サーバー。公開リポジトリからコンテナイメージをビルドし、GHCR または Docker Hub へプッシュします。"
                .to_string(),
        )
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_context = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_context).await
    }
}

/// MCP サーバーを起動（stdio トランスポート）
pub async fn run_server(settings: Settings) -> Result<()> {
    let server = DockhandServer::new(settings);
    let transport = (tokio::io::stdin(), tokio::io::stdout());

    let service = server.serve(transport).await.map_err(|e| {
        error!("MCP server initialization failed: {}", e);
        anyhow::anyhow!("MCP server initialization failed: {}", e)
    })?;

    // サーバーが終了するまで待機
    service.waiting().await.map_err(|e| {
        error!("MCP server error: {}", e);
        anyhow::anyhow!("MCP server error: {}", e)
    })?;

    Ok(())
}
