use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zdraw_config::{AppConfig, ConfigError};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut layer_override: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--layer" => {
                let Some(layer) = args.next() else {
                    eprintln!("`--layer` 需要提供图层名");
                    std::process::exit(1);
                };
                layer_override = Some(layer);
            }
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    // 日志等级来自配置，加载失败要等订阅器就绪后再报告。
    let (mut config, load_error) = load_configuration(config_override);
    if let Some(layer) = layer_override {
        config.construction.layer = layer;
    }
    init_logging(&config);
    if let Some(err) = load_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }
    info!(layer = %config.construction.layer, "启动 zdraw 交互构造");

    if let Err(err) = zdraw_frontend::run_cli(&config) {
        error!(error = %err, "命令行会话异常结束");
        std::process::exit(1);
    }
}

/// 加载配置；失败时回退到默认配置，并把错误交给调用方在日志初始化后输出。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

/// 日志写入标准错误，避免与标准输出上的提示混在一起。
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
