use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use syncer::app::Application;
use syncer::shutdown::{wait_for_signal, ShutdownManager};
use syncer_core::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("syncer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("周期性数据同步任务控制器")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次查找默认位置"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    let mut config = AppConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format.clone();
    }

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    )?;

    info!("启动数据同步服务");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let shutdown_timeout = Duration::from_secs(config.controller.shutdown_timeout_seconds + 5);
    let app = Application::new(config).await?;

    let shutdown_manager = ShutdownManager::new();
    let mut app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::select! {
        _ = wait_for_signal() => {}
        result = &mut app_handle => {
            // 服务在收到信号前退出，通常是端口绑定失败
            return match result {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("应用任务异常终止: {e}")),
            };
        }
    }

    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown().await;

    match tokio::time::timeout(shutdown_timeout, app_handle).await {
        Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
        Ok(Ok(Err(e))) => error!("应用运行失败: {e:#}"),
        Ok(Err(e)) => error!("应用关闭时发生错误: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("数据同步服务已退出");
    Ok(())
}

/// 初始化日志系统，`RUST_LOG` 优先于配置的级别
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}
