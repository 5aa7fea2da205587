use pos_server::{AppContext, Config, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;

    // 3. 日志 (生产环境 JSON + 文件)
    init_logger_with_file(
        &config.log_level,
        config.is_production(),
        Some(&config.log_dir()),
    )?;

    tracing::info!(environment = %config.environment, "POS server starting...");

    // 4. 初始化应用状态 (数据库、事件、维护闸门)
    let ctx = AppContext::initialize(config).await?;

    tracing::info!(business_day = %ctx.business_day(), "POS core ready");

    // 传输层（HTTP/SSE）作为外部协作方挂接 ctx；这里只等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting");
    Ok(())
}
