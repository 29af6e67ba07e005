pub mod cli;
pub mod errors;
pub mod prompter;

use std::io;

use errors::FrontendError;
use tracing::info;
use zdraw_config::AppConfig;

/// 在标准输入输出上启动交互式命令行会话。
pub fn run_cli(config: &AppConfig) -> Result<(), FrontendError> {
    info!("启动命令行前端");
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = stdout.lock();
    cli::run_session(config, &mut input, &mut output)?;
    Ok(())
}
