//! # Browserkit-Oxide 服务入口
//!
//! `browserkit-server` 二进制入口，为被测应用启动 Web 服务器和浏览器驱动，并在基础 URI 上打开主会话。
//!
//! ## 主要功能
//! - 从环境变量加载配置并初始化日志
//! - 启动开发 Web 服务器（配置了外部应用地址时跳过）
//! - 启动本地驱动或连接远程 WebDriver 端点
//! - 收到 SIGINT/SIGTERM 后依次关闭会话、驱动和 Web 服务器
//!
//! ## 架构
//! 服务由以下核心组件构成：
//! - **进程层**: 驱动进程和 Web 服务器进程的启动、就绪检测与停止
//! - **WebDriver 层**: 远程会话与元素的抽象接口
//! - **客户端**: 导航、表单、Cookie 和等待条件
//! - **测试套件上下文**: 统一管理上述资源的生命周期
//!
//! ## 环境变量
//! - `BROWSERKIT_*`: 见 `Config::from_env`
//! - `RUST_LOG`: 日志级别（未设置时使用 `BROWSERKIT_LOG_LEVEL`）

use browserkit_oxide::{config::Config, webdriver::WebDriverConnector, ClientOptions, SuiteContext};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing - RUST_LOG wins over the configured level
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .or_else(|| config.log_level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Browserkit-Oxide Server v{}", browserkit_oxide::VERSION);
    info!("Configuration loaded: browser={}, base_uri={}", config.browser, config.base_uri());

    let mut context = SuiteContext::new(config.clone(), Arc::new(WebDriverConnector::new()));

    let client = match context.create_client(ClientOptions::from_config(&config)).await {
        Ok(client) => client,
        Err(e) => {
            error!("Startup failed: {}", e);
            context.teardown().await?;
            return Err(e.into());
        }
    };
    let crawler = client.get(&config.base_uri()).await?;
    info!("Primary session ready at {}", crawler.uri());

    wait_for_shutdown().await;

    info!("Shutting down...");
    if let Err(e) = context.teardown().await {
        error!("Failed to tear down: {}", e);
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM signal"),
                    _ = sigint.recv() => info!("Received SIGINT signal"),
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(windows)]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
