use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use tokio::net::TcpListener;
use tokio::task::{block_in_place, spawn_blocking};
use tokio::time::{Duration, sleep};

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::embed::load_embedder;
use crate::search::SearchEngine;
use crate::server;

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    /// 监听地址，不填则使用配置中的 host 和 port
    #[arg(long)]
    pub addr: Option<String>,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH")]
    pub prometheus_auth: Option<String>,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let config = opts.load_config()?;
        let addr = self.addr.clone().unwrap_or_else(|| config.server.addr());

        let embedder = block_in_place(|| load_embedder(&config.embedding_model))?;
        let engine = SearchEngine::load(&config, embedder).await?;

        // 创建应用状态
        let state = server::AppState::new(engine);

        // 创建应用
        let app = server::create_app(state.clone());

        if let Some(url) = self.prometheus_push.clone() {
            let instance = self.prometheus_instance.clone().unwrap_or_else(|| addr.clone());
            let auth = self
                .prometheus_auth
                .as_deref()
                .map(|s| {
                    s.split_once(':')
                        .map(|(username, password)| (username.to_string(), password.to_string()))
                        .context("prometheus 认证信息格式应为 username:password")
                })
                .transpose()?;
            tokio::spawn(push_metrics_loop(url, instance, auth));
        }

        // 启动服务器
        info!("服务器启动：http://{addr}");
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("正在关闭服务器");
            })
            .await?;

        state.engine.close().await;
        Ok(())
    }
}

async fn push_metrics_loop(url: String, instance: String, auth: Option<(String, String)>) {
    loop {
        let metric_families = prometheus::gather();
        let url = url.clone();
        let instance = instance.clone();
        let auth = auth.clone();
        let r = spawn_blocking(move || {
            prometheus::push_metrics(
                "memesearch",
                labels! {
                    "instance".to_string() => instance,
                },
                &url,
                metric_families,
                auth.map(|(username, password)| BasicAuthentication { username, password }),
            )
        })
        .await;
        match r {
            Ok(Err(e)) => error!("推送指标失败: {e}"),
            Err(e) => error!("推送指标失败: {e}"),
            Ok(Ok(())) => {}
        }
        sleep(Duration::from_secs(30)).await;
    }
}
