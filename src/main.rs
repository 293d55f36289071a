//! Provides a RESTful backend for the operations dashboard.
//!
//! API will be:
//!
//! - `GET /servers`: return the fleet, filtered by `status`/`search`, paged by `offset`/`limit`.
//! - `POST /servers`: connect a new node.
//! - `GET /traffic`: return the recent traffic series.
//! - `GET /summary`: return status counts and alert totals.
//! - `GET /storage`, `GET /topology`: return the static inventory.
//! - `POST /analyze`: analyze a log excerpt with the configured model.
//! - `GET /views/:view`: render one dashboard page.
//!
//! Run with
//!
//! ```not_rust
//! API_KEY=... cargo run
//! ```

use anyhow::Context;
use nexus_ops::config::model::{load_bootstrap_config, Bootstrap};
use nexus_ops::core::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexus_ops=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    //1. 加载配置 失败时使用默认配置
    let config = load_bootstrap_config().unwrap_or_else(|e| {
        tracing::warn!("{e}, using default config");
        Bootstrap::default()
    });
    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server addr {}", config.server.addr))?;

    let (tx, mut rx) = mpsc::channel(32);
    let state = Arc::new(AppState::new(config, tx.clone()));
    if !state.analyzer.has_credential() {
        tracing::warn!("no API key configured, log analysis will be rejected");
    }

    //2. 启动事件处理任务 负责推进模拟器并记录事件
    let mut logger = Logger::new(state.clone());
    let watcher = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = rx.recv() => logger.log(event),
                else => { break }
            };
        }
        tracing::debug!("event loop finished");
    });

    //3. 启动定时器
    let mut scheduler = Scheduler::new(TICK_PERIOD);
    scheduler.start(tx);

    //4. 启动HTTP服务 直到收到退出信号
    let served = listen(addr, state, shutdown_signal()).await;

    scheduler.stop().await;
    watcher.abort();
    served
}
