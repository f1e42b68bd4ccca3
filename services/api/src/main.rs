//! SoftClin 管理 API 二进制入口：仅负责加载配置并启动应用。

mod api;
mod app;
mod auth;
mod cli;
mod config;
mod logging;
mod records;
mod state;

use tracing::error;

#[tokio::main]
/// 启动 SoftClin 管理 API。
async fn main() -> anyhow::Result<()> {
    // `.env` 可选；进程环境变量优先。
    let _ = dotenvy::dotenv();

    let args = std::env::args().skip(1).collect::<Vec<String>>();
    match cli::dispatch(&args)? {
        cli::CliDispatch::Run => {}
        cli::CliDispatch::Exit => return Ok(()),
    }

    let _log_runtime = logging::init("softclin-api")?;
    let config = config::Config::from_env().inspect_err(|err| {
        error!("refusing to start: {err}");
    })?;
    config.log_summary();
    app::run(config).await
}
