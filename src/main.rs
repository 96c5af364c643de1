//! Project Idea Generator - Rust Backend
//!
//! 使用 axum 框架构建的后端服务：接收主题和难度，调用 LLM 结构化输出生成项目创意。

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod llm;
mod models;
mod services;
mod state;
mod utils;

use api::create_api_routes;
use config::AppConfig;
use llm::{GenerationOptions, LlmClient};
use services::IdeaGenerator;
use state::{create_shared_state, spawn_board_sweeper};
use utils::RequestLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idea_forge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Project Idea Generator backend...");

    // 加载配置：缺少 API 密钥时在监听端口之前退出
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    let addr = config.socket_addr()?;

    // 创建生成器（进程内唯一，显式注入）
    let client = LlmClient::new(&config.api_key, &config.base_url, config.timeout())
        .context("failed to create LLM client")?;
    let options = GenerationOptions {
        temperature: Some(config.temperature),
        top_p: Some(config.top_p),
        max_tokens: Some(config.max_tokens),
    };
    let mut generator = IdeaGenerator::new(client, &config.model, options);
    if let Some(dir) = &config.request_log_dir {
        let logger = RequestLogger::new(dir);
        info!("Request log: {}", logger.log_path().display());
        generator = generator.with_request_logger(Arc::new(logger));
    }
    info!(
        "Generation model: {} (base_url={}, temperature={}, top_p={})",
        config.model, config.base_url, config.temperature, config.top_p
    );

    // 创建共享状态，后台定期回收空闲看板
    let state = create_shared_state(generator, config.board_ttl(), config.max_boards);
    spawn_board_sweeper(Arc::clone(&state), Duration::from_secs(60));
    info!(
        "Board registry: ttl={}s, max_boards={}",
        config.board_ttl_secs, config.max_boards
    );

    // 配置 CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 构建路由
    let app = create_api_routes(Arc::clone(&state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    info!("Server listening on: {}", addr);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
